//! Glue between the signaling server, the engine and the UI.

mod call_api;
mod candidate_api;
mod util_api;

use crate::error::{CallError, ErrorKind};
use crate::peer::engine::{EngineEvent, EngineEvents, PeerEngine};
use crate::peer::types::{ConnectionState, LocalStream, RemoteStream};
use crate::signaling::{InboundSignal, OutboundSignal, SignalingChannel};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use util_api::check_ice_servers;

/// Which side of the offer/answer exchange this client plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRole {
    Caller,
    Answerer,
}

/// What the UI gets to see
#[derive(Debug, Clone)]
pub enum CallUpdate {
    PeerJoined { id: String, email: String },
    RemoteStream(RemoteStream),
    Connected,
    ConnectionState(ConnectionState),
    Error { kind: ErrorKind, message: String },
    CallEnded,
}

pub struct CallOrchestrator {
    engine: PeerEngine,
    signaling: Arc<dyn SignalingChannel>,
    room: String,
    email: String,
    local: Option<LocalStream>,
    role: Option<CallRole>,
    remote_peer: Option<String>,
    updates: mpsc::UnboundedSender<CallUpdate>,
}

impl CallOrchestrator {
    pub fn new(
        engine: PeerEngine,
        signaling: Arc<dyn SignalingChannel>,
        room: impl Into<String>,
        email: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<CallUpdate>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            engine,
            signaling,
            room: room.into(),
            email: email.into(),
            local: None,
            role: None,
            remote_peer: None,
            updates,
        };
        (orchestrator, rx)
    }

    /// Media sent on every call from now on.
    pub fn set_local_stream(&mut self, stream: LocalStream) {
        self.local = Some(stream);
    }

    pub fn role(&self) -> Option<CallRole> {
        self.role
    }

    pub fn remote_peer(&self) -> Option<&str> {
        self.remote_peer.as_deref()
    }

    pub fn engine(&self) -> &PeerEngine {
        &self.engine
    }

    fn update(&self, update: CallUpdate) {
        if self.updates.send(update).is_err() {
            debug!("call update dropped, UI gone");
        }
    }

    fn reset(&mut self) {
        self.role = None;
        self.remote_peer = None;
    }

    async fn send(&self, signal: OutboundSignal) -> Result<(), CallError> {
        self.signaling.send(signal).await?;
        Ok(())
    }

    pub async fn join_room(&self) -> Result<(), CallError> {
        info!(room = %self.room, "joining room");
        self.send(OutboundSignal::RoomJoin {
            room: self.room.clone(),
            email: self.email.clone(),
        })
        .await
    }

    pub async fn handle_signal(&mut self, signal: InboundSignal) -> Result<(), CallError> {
        match signal {
            InboundSignal::UserJoined { id, room, email } => {
                if room != self.room {
                    debug!(%room, "join for another room, ignoring");
                    return Ok(());
                }
                info!(peer = %id, %email, "user joined");
                self.update(CallUpdate::PeerJoined {
                    id: id.clone(),
                    email,
                });
                if self.role.is_none() {
                    self.start_call(&id).await?;
                }
                Ok(())
            }
            InboundSignal::IncomingCall { from, offer } => self.accept_call(&from, offer).await,
            InboundSignal::CallAccepted { answer, .. } | InboundSignal::NegoFinal { answer, .. } => {
                self.apply_answer(answer).await
            }
            InboundSignal::NegoNeeded { from, offer } => self.renegotiate(&from, offer).await,
            InboundSignal::IceCandidate { candidate, .. } => {
                self.on_remote_candidate(candidate).await;
                Ok(())
            }
            InboundSignal::CallEnded { from } => {
                info!(peer = %from, "remote ended the call");
                self.engine.cleanup().await;
                self.reset();
                self.update(CallUpdate::CallEnded);
                Ok(())
            }
        }
    }

    pub async fn handle_engine_event(&mut self, event: EngineEvent) -> Result<(), CallError> {
        match event {
            EngineEvent::LocalCandidate { to, candidate } => {
                self.on_local_candidate(to, candidate).await
            }
            EngineEvent::ReconnectRequested { remote_peer_id, mode } => {
                self.on_reconnect(remote_peer_id, mode).await
            }
            EngineEvent::RemoteStream(stream) => {
                self.update(CallUpdate::RemoteStream(stream));
                Ok(())
            }
            EngineEvent::IceConnected => {
                self.update(CallUpdate::Connected);
                Ok(())
            }
            EngineEvent::ConnectionState(state) => {
                self.update(CallUpdate::ConnectionState(state));
                Ok(())
            }
            EngineEvent::Error { kind, message } => {
                if kind == ErrorKind::ReconnectExhausted {
                    self.reset();
                }
                self.update(CallUpdate::Error { kind, message });
                Ok(())
            }
        }
    }

    /// Drives the call until the signaling stream ends.
    pub async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<InboundSignal>,
        mut events: EngineEvents,
    ) {
        loop {
            tokio::select! {
                signal = inbound.recv() => {
                    let Some(signal) = signal else {
                        info!("signaling closed");
                        break;
                    };
                    if let Err(e) = self.handle_signal(signal).await {
                        warn!("signal handling failed: {e}");
                    }
                }
                Some(event) = events.recv() => {
                    if let Err(e) = self.handle_engine_event(event).await {
                        warn!("engine event handling failed: {e}");
                    }
                }
            }
        }
        self.engine.cleanup().await;
    }
}
