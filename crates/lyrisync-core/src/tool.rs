// ── Production tool seam ──
//
// The engine only knows `ProductionTool`. `VmixTool` routes each
// `Command` to the matching vMix function; tests plug in scripted tools.

use std::future::Future;

use lyrisync_api::VmixClient;
use lyrisync_api::transport::TransportConfig;
use tracing::debug;

use crate::command::{Command, CommandOutcome, ProductionSnapshot};
use crate::config::EngineConfig;
use crate::error::DispatchError;

/// Executes one command against the production tool.
///
/// Implementations make exactly one attempt, bounded by their own
/// timeout, and report failure as a typed [`DispatchError`].
pub trait ProductionTool: Send + Sync + 'static {
    fn dispatch(
        &self,
        command: &Command,
    ) -> impl Future<Output = Result<CommandOutcome, DispatchError>> + Send;
}

/// vMix over its HTTP function API.
#[derive(Debug, Clone)]
pub struct VmixTool {
    client: VmixClient,
    title_input: String,
    title_field: String,
}

impl VmixTool {
    pub fn new(client: VmixClient, title_input: String, title_field: String) -> Self {
        Self {
            client,
            title_input,
            title_field,
        }
    }

    /// Build the client from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self, DispatchError> {
        let transport = TransportConfig::with_timeout(config.request_timeout);
        let client = VmixClient::new(config.production_url.clone(), &transport)?;
        Ok(Self::new(
            client,
            config.title_input.clone(),
            config.title_field.clone(),
        ))
    }
}

impl ProductionTool for VmixTool {
    async fn dispatch(&self, command: &Command) -> Result<CommandOutcome, DispatchError> {
        debug!(command = command.name(), "dispatching to vMix");

        match command {
            Command::SetText(text) => {
                self.client
                    .set_text(&self.title_input, &self.title_field, text)
                    .await?;
            }
            Command::OverlayIn(_)
            | Command::OverlayOut(_)
            | Command::OverlayOn(_)
            | Command::OverlayOff(_) => {
                if let Some((channel, action)) = command.overlay() {
                    self.client.overlay(channel, action).await?;
                }
            }
            Command::StartRecording => self.client.start_recording().await?,
            Command::StopRecording => self.client.stop_recording().await?,
            Command::QueryStatus => {
                let status = self.client.status().await?;
                return Ok(CommandOutcome::Status(ProductionSnapshot::from_vmix(
                    &status,
                    &self.title_input,
                    &self.title_field,
                )));
            }
        }
        Ok(CommandOutcome::Done)
    }
}
