pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod peer;
pub mod resolver;
pub mod session;
pub mod signaling;
mod utils;

pub use commands::{CallOrchestrator, CallRole, CallUpdate};
pub use config::EngineConfig;
pub use error::{CallError, EngineError, ErrorKind, ResolveError, SignalingError, TransportError};
pub use peer::{EngineEvent, EngineEvents, PeerEngine, RemoteAnswer};
pub use resolver::{IceConfig, IceConfigResolver, IceServer, TransportResolver};
pub use session::Session;
pub use signaling::{InboundSignal, OutboundSignal, SignalingChannel};
