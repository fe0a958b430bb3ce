pub mod connection;
pub mod engine;
pub mod ice;
pub(crate) mod state;
pub(crate) mod tracks;
pub mod types;

pub use connection::{PeerTransport, RtcTransportFactory, TransportEvent, TransportFactory};
pub use engine::{EngineEvent, EngineEvents, PeerEngine, RemoteAnswer};
pub use ice::probe_ice_server;
pub use types::{
    ConnectionState, IceCandidate, LocalStream, LocalTrack, MediaKind, RemoteStream, RemoteTrack,
    SdpKind, SessionDescription, SignalingState, TransportMode,
};
