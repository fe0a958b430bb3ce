use super::{CallOrchestrator, CallRole, CallUpdate};
use crate::error::CallError;
use crate::peer::engine::RemoteAnswer;
use crate::peer::types::{SessionDescription, TransportMode};
use crate::signaling::OutboundSignal;
use tracing::{debug, info};

impl CallOrchestrator {
    /// Fresh session towards `peer_id` with the local media attached.
    async fn prepare_session(&mut self, peer_id: &str) -> Result<(), CallError> {
        self.engine.initialize(&self.room).await?;
        self.engine.set_remote_peer(peer_id)?;
        if let Some(stream) = self.local.clone() {
            self.engine.add_tracks(stream).await?;
        }
        self.remote_peer = Some(peer_id.to_string());
        Ok(())
    }

    /// Caller side: offers to `peer_id`.
    pub async fn start_call(&mut self, peer_id: &str) -> Result<(), CallError> {
        info!(peer = peer_id, "calling");
        self.prepare_session(peer_id).await?;
        self.role = Some(CallRole::Caller);

        let offer = self.engine.create_offer().await?;
        self.send(OutboundSignal::UserCall {
            to: peer_id.to_string(),
            offer,
            room: self.room.clone(),
        })
        .await
    }

    /// Answerer side. Every call offer gets a fresh session, including one
    /// re-sent by a caller that rebuilt its connection; in-call changes go
    /// through [`Self::renegotiate`].
    pub(super) async fn accept_call(
        &mut self,
        from: &str,
        offer: SessionDescription,
    ) -> Result<(), CallError> {
        if self.remote_peer.as_deref() == Some(from) {
            info!(peer = from, "caller rebuilt its connection, starting over");
        } else {
            info!(peer = from, "incoming call");
        }
        self.prepare_session(from).await?;
        self.role = Some(CallRole::Answerer);

        let answer = self.engine.create_answer(offer).await?;
        self.send(OutboundSignal::CallAccepted {
            to: from.to_string(),
            answer,
            room: self.room.clone(),
        })
        .await
    }

    pub(super) async fn apply_answer(&mut self, answer: SessionDescription) -> Result<(), CallError> {
        if self.engine.set_remote_description(answer).await? == RemoteAnswer::Dropped {
            debug!("remote answer dropped");
        }
        Ok(())
    }

    /// Remote side wants to renegotiate the live session.
    pub(super) async fn renegotiate(
        &mut self,
        from: &str,
        offer: SessionDescription,
    ) -> Result<(), CallError> {
        let answer = self.engine.create_answer(offer).await?;
        self.send(OutboundSignal::NegoDone {
            to: from.to_string(),
            answer,
        })
        .await
    }

    /// Asks the remote side to renegotiate, e.g. after the local media changed.
    pub async fn request_renegotiation(&mut self) -> Result<(), CallError> {
        let Some(to) = self.remote_peer.clone() else {
            return Ok(());
        };
        if let Some(stream) = self.local.clone() {
            self.engine.add_tracks(stream).await?;
        }
        let offer = self.engine.create_offer().await?;
        self.send(OutboundSignal::NegoNeeded { to, offer }).await
    }

    /// The engine rebuilt the connection. Only the caller offers again so both
    /// sides never offer at once.
    pub(super) async fn on_reconnect(
        &mut self,
        remote_peer_id: Option<String>,
        mode: TransportMode,
    ) -> Result<(), CallError> {
        if self.role != Some(CallRole::Caller) {
            debug!(%mode, "connection rebuilt, waiting for the caller to offer");
            return Ok(());
        }
        let Some(to) = remote_peer_id.or_else(|| self.remote_peer.clone()) else {
            debug!("connection rebuilt without a remote peer");
            return Ok(());
        };

        info!(peer = %to, %mode, "re-offering after reconnect");
        let offer = self.engine.create_offer().await?;
        self.send(OutboundSignal::UserCall {
            to,
            offer,
            room: self.room.clone(),
        })
        .await
    }

    /// Hangs up: tells the remote side and releases the session.
    pub async fn end_call(&mut self) -> Result<(), CallError> {
        let sent = match self.remote_peer.clone() {
            Some(to) => self.send(OutboundSignal::CallEnded { to }).await,
            None => Ok(()),
        };
        self.engine.cleanup().await;
        self.reset();
        self.update(CallUpdate::CallEnded);
        sent
    }
}
