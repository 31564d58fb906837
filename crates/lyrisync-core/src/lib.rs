// lyrisync-core: Sync engine between the presentation listener and the production tool.

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod policy;
pub mod state;
pub mod tool;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandOutcome, ProductionSnapshot};
pub use config::{EngineConfig, Policy};
pub use engine::SyncEngine;
pub use error::{CoreError, DispatchError, ErrorKind};
pub use format::wrap;
pub use policy::{Trigger, plan};
pub use state::{EngineState, ProductionHealth, RecordedError};
pub use tool::{ProductionTool, VmixTool};

// Wire-level types consumers need alongside the engine.
pub use lyrisync_api::{ListenerState, LyricEvent, OverlayAction, OverlayChannel, ReconnectConfig};
