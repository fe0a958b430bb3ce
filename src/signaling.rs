use crate::error::SignalingError;
use crate::peer::types::{IceCandidate, SessionDescription};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// ========== OUTBOUND ==========

/// Messages this client sends through the signaling server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum OutboundSignal {
    #[serde(rename = "room:join")]
    RoomJoin { room: String, email: String },

    #[serde(rename = "user:call")]
    UserCall {
        to: String,
        offer: SessionDescription,
        room: String,
    },

    #[serde(rename = "call:accepted")]
    CallAccepted {
        to: String,
        answer: SessionDescription,
        room: String,
    },

    #[serde(rename = "peer:ice-candidate")]
    IceCandidate {
        to: String,
        candidate: IceCandidate,
        room: String,
    },

    #[serde(rename = "call:ended")]
    CallEnded { to: String },

    #[serde(rename = "peer:nego:needed")]
    NegoNeeded { to: String, offer: SessionDescription },

    #[serde(rename = "peer:nego:done")]
    NegoDone { to: String, answer: SessionDescription },
}

/// ========== INBOUND ==========

/// Messages delivered to this client by the signaling server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum InboundSignal {
    #[serde(rename = "user:joined")]
    UserJoined {
        id: String,
        room: String,
        #[serde(default)]
        email: String,
    },

    #[serde(rename = "incoming:call")]
    IncomingCall {
        from: String,
        offer: SessionDescription,
    },

    #[serde(rename = "call:accepted")]
    CallAccepted {
        from: String,
        answer: SessionDescription,
    },

    #[serde(rename = "peer:ice-candidate")]
    IceCandidate { from: String, candidate: IceCandidate },

    #[serde(rename = "call:ended")]
    CallEnded { from: String },

    #[serde(rename = "peer:nego:needed")]
    NegoNeeded {
        from: String,
        offer: SessionDescription,
    },

    #[serde(rename = "peer:nego:final")]
    NegoFinal {
        from: String,
        answer: SessionDescription,
    },
}

impl InboundSignal {
    pub fn decode(text: &str) -> Result<Self, SignalingError> {
        serde_json::from_str(text).map_err(SignalingError::Decode)
    }
}

impl OutboundSignal {
    pub fn encode(&self) -> Result<String, SignalingError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// ========== CHANNEL ==========

/// Outbound half of the signaling connection
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    async fn send(&self, signal: OutboundSignal) -> Result<(), SignalingError>;
}

/// Hands signals to whatever task owns the socket
#[async_trait]
impl SignalingChannel for mpsc::UnboundedSender<OutboundSignal> {
    async fn send(&self, signal: OutboundSignal) -> Result<(), SignalingError> {
        mpsc::UnboundedSender::send(self, signal).map_err(|_| SignalingError::Closed)
    }
}
