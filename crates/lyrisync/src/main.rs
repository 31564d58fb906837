mod cli;
mod commands;
mod error;

use std::path::Path;

use clap::{CommandFactory, Parser};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, GlobalOpts, RunArgs};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let command = cli.command.unwrap_or_else(|| Command::Run(RunArgs::default()));

    // The service logs at info by default; one-shot commands stay quiet.
    let base = u8::from(matches!(command, Command::Run(_)));
    let _guard = init_tracing(&cli.global, base.saturating_add(cli.global.verbose))?;

    let config_path = cli
        .global
        .config
        .clone()
        .unwrap_or_else(lyrisync_config::config_path);

    match command {
        Command::Run(args) => {
            tracing::debug!(path = %config_path.display(), "loading settings");
            let settings = lyrisync_config::load_settings_from(&config_path)?;
            commands::run::handle(&args, &settings).await
        }

        Command::Config(args) => commands::config_cmd::handle(&args.command, &config_path),

        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "lyrisync", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// `RUST_LOG` wins; otherwise `verbosity` picks warn/info/debug/trace.
/// With `--log-file`, logs go through a non-blocking file writer whose
/// guard must outlive the process.
fn init_tracing(global: &GlobalOpts, verbosity: u8) -> Result<Option<WorkerGuard>, CliError> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some(path) = &global.log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| CliError::LogFile {
            path: path.clone(),
            reason: "not a file path".into(),
        })?
        .to_string_lossy()
        .into_owned();

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| CliError::LogFile {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    Ok(Some(guard))
}
