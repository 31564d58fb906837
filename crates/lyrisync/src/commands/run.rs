//! `lyrisync run`: the long-running sync service.

use lyrisync_api::ListenerHandle;
use lyrisync_config::Settings;
use lyrisync_core::{SyncEngine, VmixTool};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;

pub async fn handle(args: &RunArgs, settings: &Settings) -> Result<(), CliError> {
    let config = settings.to_engine_config()?;
    let mut addr = settings.control_addr()?;
    if let Some(ip) = args.bind {
        addr.set_ip(ip);
    }
    if let Some(port) = args.port {
        addr.set_port(port);
    }

    // Bind before spawning anything so a busy port fails fast.
    let listener = lyrisync_control::bind(addr).await?;

    let tool = VmixTool::from_config(&config)
        .map_err(|e| CliError::invalid_setting("production_url", e.to_string()))?;
    let engine = SyncEngine::new(config.policy.clone(), tool);
    let shutdown = CancellationToken::new();

    let presentation = if args.no_presentation {
        info!("presentation listener disabled");
        None
    } else {
        Some(ListenerHandle::spawn(
            config.presentation_ws_url.clone(),
            config.reconnect.clone(),
            engine.intake(),
            engine.cancellation_token().child_token(),
        ))
    };

    engine
        .start(
            presentation.as_ref().map(ListenerHandle::subscribe_state),
            config.poll_interval,
        )
        .await;

    info!(
        production = %config.production_url,
        presentation = %config.presentation_ws_url,
        control = %addr,
        "lyrisync running"
    );

    let mut server = tokio::spawn(lyrisync_control::serve(
        listener,
        engine.clone(),
        shutdown.clone(),
    ));

    let finished = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "could not listen for Ctrl-C");
            }
            info!("shutdown requested");
            None
        }
        joined = &mut server => Some(joined),
    };

    shutdown.cancel();
    engine.shutdown().await;
    if let Some(listener) = presentation {
        listener.join().await;
    }

    let joined = match finished {
        Some(joined) => joined,
        None => server.await,
    };
    joined.map_err(|e| CliError::Server {
        message: e.to_string(),
    })??;

    info!("lyrisync stopped");
    Ok(())
}
