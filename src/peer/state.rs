use crate::peer::connection::PeerTransport;
use crate::peer::ice::CandidateBuffer;
use crate::peer::tracks::{SenderSet, StreamCoalescer};
use crate::peer::types::{ConnectionState, IceCandidate, LocalStream};
use crate::session::Session;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// ========== SESSION SLOT ==========

/// The live session plus everything hanging off it
pub(crate) struct SessionSlot {
    pub session: Session,
    /// Identity checked by every deferred callback before it acts
    pub generation: u64,
    /// `None` while the connection is being built
    pub transport: Option<Arc<dyn PeerTransport>>,
    pub senders: SenderSet,
    pub candidates: CandidateBuffer,
    pub coalescer: StreamCoalescer,
    pub gathered: Vec<IceCandidate>,
    /// A remote answer is being applied
    pub applying_answer: bool,
    pub announced_connected: bool,
    pub recovering: bool,
    /// Last ICE agent state
    pub ice_state: ConnectionState,
    /// Last overall peer connection state
    pub peer_state: ConnectionState,
    pub pump: Option<JoinHandle<()>>,
    pub grace: Option<JoinHandle<()>>,
}

impl SessionSlot {
    pub fn new(session: Session, generation: u64) -> Self {
        Self {
            session,
            generation,
            transport: None,
            senders: SenderSet::default(),
            candidates: CandidateBuffer::default(),
            coalescer: StreamCoalescer::default(),
            gathered: Vec::new(),
            applying_answer: false,
            announced_connected: false,
            recovering: false,
            ice_state: ConnectionState::New,
            peer_state: ConnectionState::New,
            pump: None,
            grace: None,
        }
    }

    pub fn stop_grace(&mut self) {
        if let Some(h) = self.grace.take() {
            h.abort();
        }
    }

    /// Records one side's report and returns the state derived from both.
    pub fn observe(&mut self, source: StateSource, state: ConnectionState) -> ConnectionState {
        match source {
            StateSource::Ice => self.ice_state = state,
            StateSource::Peer => self.peer_state = state,
        }
        combined_state(self.ice_state, self.peer_state)
    }

    /// Cancels every timer and subscription; returns the transport still to be closed.
    pub fn teardown(mut self) -> Option<Arc<dyn PeerTransport>> {
        if let Some(h) = self.pump.take() {
            h.abort();
        }
        self.stop_grace();
        self.coalescer.clear();
        self.candidates.clear();
        self.senders.clear();
        self.transport.take()
    }
}

/// Which of the two connection signals a state report came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StateSource {
    Ice,
    Peer,
}

/// The worse of the two reports wins, so a late `Checking` from one side
/// cannot pull a connected session back.
fn combined_state(ice: ConnectionState, peer: ConnectionState) -> ConnectionState {
    fn severity(state: ConnectionState) -> u8 {
        match state {
            ConnectionState::New => 0,
            ConnectionState::Checking => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Disconnected => 3,
            ConnectionState::Closed => 4,
            ConnectionState::Failed => 5,
        }
    }
    if severity(ice) >= severity(peer) {
        ice
    } else {
        peer
    }
}

/// ========== ENGINE STATE ==========

#[derive(Default)]
pub(crate) struct EngineState {
    pub slot: Option<SessionSlot>,
    /// Lent by the owner; re-attached to rebuilt sessions, never stopped here
    pub local_stream: Option<LocalStream>,
    /// The free direct-to-relay switch was spent for this call
    pub fallback_used: bool,
    pub recovery: Option<(u64, JoinHandle<()>)>,
    /// Bumped by every initialize/cleanup
    pub epoch: u64,
    next_generation: u64,
    next_recovery: u64,
}

impl EngineState {
    pub fn slot_mut(&mut self, generation: u64) -> Option<&mut SessionSlot> {
        self.slot.as_mut().filter(|s| s.generation == generation)
    }

    pub fn current_generation(&self) -> Option<u64> {
        self.slot.as_ref().map(|s| s.generation)
    }

    /// Makes `session` the live one. The previous slot must already be gone.
    pub fn install(&mut self, session: Session) -> u64 {
        self.next_generation += 1;
        self.slot = Some(SessionSlot::new(session, self.next_generation));
        self.next_generation
    }

    pub fn next_recovery_id(&mut self) -> u64 {
        self.next_recovery += 1;
        self.next_recovery
    }

    /// Forgets the recovery task without aborting it (called from the task itself).
    pub fn release_recovery(&mut self, id: u64) {
        if matches!(self.recovery, Some((current, _)) if current == id) {
            self.recovery = None;
        }
    }

    /// Ends the call: invalidates every deferred callback and releases the local stream.
    pub fn reset_call(&mut self) -> Option<Arc<dyn PeerTransport>> {
        self.epoch += 1;
        if let Some((_, h)) = self.recovery.take() {
            h.abort();
        }
        self.local_stream = None;
        self.fallback_used = false;
        self.slot.take().and_then(SessionSlot::teardown)
    }
}
