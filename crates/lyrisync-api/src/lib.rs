// lyrisync-api: Async clients for the vMix HTTP API and the OpenLP live WebSocket

pub mod error;
pub mod openlp;
pub mod transport;
pub mod vmix;

pub use error::Error;
pub use openlp::{ListenerHandle, ListenerState, LyricEvent, ReconnectConfig};
pub use vmix::{OverlayAction, OverlayChannel, VmixClient, VmixStatus};
