use super::CallOrchestrator;
use crate::error::CallError;
use crate::peer::types::IceCandidate;
use crate::signaling::OutboundSignal;

impl CallOrchestrator {
    /// Candidate gathered locally, relayed to the peer it is addressed to.
    pub(super) async fn on_local_candidate(
        &self,
        to: String,
        candidate: IceCandidate,
    ) -> Result<(), CallError> {
        self.send(OutboundSignal::IceCandidate {
            to,
            candidate,
            room: self.room.clone(),
        })
        .await
    }

    /// Candidate from the peer; the engine buffers it if it arrives early.
    pub(super) async fn on_remote_candidate(&self, candidate: IceCandidate) {
        self.engine.add_ice_candidate(candidate).await;
    }
}
