use crate::error::EngineError;
use crate::peer::types::{ConnectionState, SignalingState, TransportMode};
use crate::utils::random_id;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One step of the offer/answer handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    LocalOffer,
    RemoteOffer,
    LocalAnswer,
    RemoteAnswer,
}

impl HandshakeStep {
    fn operation(self) -> &'static str {
        match self {
            Self::LocalOffer => "create_offer",
            Self::RemoteOffer | Self::LocalAnswer => "create_answer",
            Self::RemoteAnswer => "set_remote_description",
        }
    }
}

/// The current call attempt
#[derive(Serialize, Debug, Clone)]
pub struct Session {
    pub id: String,
    pub room_id: String,
    pub remote_peer_id: Option<String>,
    pub transport_mode: TransportMode,
    /// Consecutive failed reconnects; carried over when the session is rebuilt
    pub reconnect_attempts: u32,
    pub signaling_state: SignalingState,
    pub connection_state: ConnectionState,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(room_id: impl Into<String>, transport_mode: TransportMode) -> Self {
        Self {
            id: random_id(),
            room_id: room_id.into(),
            remote_peer_id: None,
            transport_mode,
            reconnect_attempts: 0,
            signaling_state: SignalingState::Stable,
            connection_state: ConnectionState::New,
            created_at: Utc::now(),
        }
    }

    /// Fresh session for a reconnect: same room, peer and attempt counter.
    pub fn rebuilt(&self, transport_mode: TransportMode) -> Self {
        Self {
            remote_peer_id: self.remote_peer_id.clone(),
            reconnect_attempts: self.reconnect_attempts,
            ..Self::new(self.room_id.clone(), transport_mode)
        }
    }

    /// Records the remote peer. Only the first identity sticks; returns
    /// `false` when a different one was already set.
    pub fn set_remote_peer(&mut self, peer_id: &str) -> bool {
        match &self.remote_peer_id {
            Some(existing) => existing == peer_id,
            None => {
                self.remote_peer_id = Some(peer_id.to_string());
                true
            }
        }
    }

    /// State the handshake moves to after `step`, or why it may not.
    pub fn next_signaling_state(&self, step: HandshakeStep) -> Result<SignalingState, EngineError> {
        use SignalingState::*;
        let next = match (step, self.signaling_state) {
            (HandshakeStep::LocalOffer, Stable) => HaveLocalOffer,
            (HandshakeStep::RemoteOffer, Stable | HaveRemoteOffer) => HaveRemoteOffer,
            (HandshakeStep::LocalAnswer, HaveRemoteOffer) => Stable,
            (HandshakeStep::RemoteAnswer, HaveLocalOffer) => Stable,
            (_, state) => {
                return Err(EngineError::InvalidSignalingState {
                    operation: step.operation(),
                    state,
                })
            }
        };
        Ok(next)
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }
}
