use crate::peer::types::SignalingState;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Category carried by the `error` engine event
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConfigUnavailable,
    CredentialFetchFailed,
    InvalidSignalingState,
    NoSession,
    TrackAttachmentFailed,
    ReconnectExhausted,
    NegotiationFailed,
    CandidateRejected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no traversal servers configured")]
    ConfigUnavailable,

    #[error("relay credential fetch failed: {0}")]
    CredentialFetchFailed(String),

    #[error("{operation} is not valid in signaling state {state:?}")]
    InvalidSignalingState {
        operation: &'static str,
        state: SignalingState,
    },

    #[error("no active session")]
    NoSession,

    #[error("failed to attach local media: {0}")]
    TrackAttachmentFailed(String),

    #[error("gave up after {0} reconnect attempts")]
    ReconnectExhausted(u32),

    #[error("negotiation failed: {0}")]
    NegotiationFailed(#[source] TransportError),

    #[error("ICE candidate rejected: {0}")]
    CandidateRejected(#[source] TransportError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigUnavailable => ErrorKind::ConfigUnavailable,
            Self::CredentialFetchFailed(_) => ErrorKind::CredentialFetchFailed,
            Self::InvalidSignalingState { .. } => ErrorKind::InvalidSignalingState,
            Self::NoSession => ErrorKind::NoSession,
            Self::TrackAttachmentFailed(_) => ErrorKind::TrackAttachmentFailed,
            Self::ReconnectExhausted(_) => ErrorKind::ReconnectExhausted,
            Self::NegotiationFailed(_) => ErrorKind::NegotiationFailed,
            Self::CandidateRejected(_) => ErrorKind::CandidateRejected,
        }
    }
}

impl From<ResolveError> for EngineError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::ConfigUnavailable => Self::ConfigUnavailable,
            other => Self::CredentialFetchFailed(other.to_string()),
        }
    }
}

/// Failures of the transport configuration resolver
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no traversal servers configured")]
    ConfigUnavailable,

    #[error("no credential endpoint configured")]
    NoCredentialEndpoint,

    #[error("credential request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("credential endpoint returned {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed credential payload: {0}")]
    Malformed(String),
}

/// Failures reported by a `PeerTransport`
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Rtc(#[from] webrtc::Error),

    #[error("unknown sender {0}")]
    UnknownSender(u64),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("signaling channel closed")]
    Closed,

    #[error("failed to encode signaling message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("malformed signaling message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Failures of the call orchestrator
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Signaling(#[from] SignalingError),
}
