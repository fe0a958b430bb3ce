use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorKind};
use crate::logger::analyze_candidates;
use crate::peer::connection::{
    PeerTransport, RtcTransportFactory, TransportEvent, TransportFactory,
};
use crate::peer::state::{EngineState, StateSource};
use crate::peer::tracks::{SenderOp, TrackOutcome};
use crate::peer::types::{
    ConnectionState, IceCandidate, LocalStream, RemoteStream, RemoteTrack, SessionDescription,
    SignalingState, TransportMode,
};
use crate::resolver::{IceConfig, IceConfigResolver, TransportResolver};
use crate::session::{HandshakeStep, Session};
use crate::utils::backoff_delay;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Notifications delivered to the engine owner
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A remote stream is ready to render
    RemoteStream(RemoteStream),
    /// The session reached Connected for the first time
    IceConnected,
    ConnectionState(ConnectionState),
    /// Local candidate to relay to the remote peer
    LocalCandidate { to: String, candidate: IceCandidate },
    /// The connection was rebuilt; the caller side has to offer again
    ReconnectRequested {
        remote_peer_id: Option<String>,
        mode: TransportMode,
    },
    Error { kind: ErrorKind, message: String },
}

impl EngineEvent {
    fn error(err: &EngineError) -> Self {
        Self::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

pub type EngineEvents = mpsc::UnboundedReceiver<EngineEvent>;

/// What happened to a remote answer handed to `set_remote_description`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAnswer {
    Applied,
    /// Another answer was still being applied, or the session went away meanwhile
    Dropped,
}

enum RecoveryStep {
    Fallback,
    Retry(u32),
    Exhausted(u32),
}

struct Inner {
    config: EngineConfig,
    resolver: Arc<dyn IceConfigResolver>,
    factory: Arc<dyn TransportFactory>,
    events: mpsc::UnboundedSender<EngineEvent>,
    state: Mutex<EngineState>,
}

/// Handle to the call engine. Clones share one engine.
#[derive(Clone)]
pub struct PeerEngine {
    inner: Arc<Inner>,
}

/// Handle held by timers and pumps so they never keep the engine alive
#[derive(Clone)]
struct WeakEngine(Weak<Inner>);

impl WeakEngine {
    fn upgrade(&self) -> Option<PeerEngine> {
        self.0.upgrade().map(|inner| PeerEngine { inner })
    }
}

impl PeerEngine {
    pub fn new(
        config: EngineConfig,
        resolver: Arc<dyn IceConfigResolver>,
        factory: Arc<dyn TransportFactory>,
    ) -> (Self, EngineEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let engine = Self {
            inner: Arc::new(Inner {
                config,
                resolver,
                factory,
                events,
                state: Mutex::new(EngineState::default()),
            }),
        };
        (engine, rx)
    }

    /// Engine backed by real peer connections and the HTTP credential endpoint.
    pub fn with_config(config: EngineConfig) -> Result<(Self, EngineEvents), EngineError> {
        let resolver = TransportResolver::new(&config)?;
        Ok(Self::new(
            config,
            Arc::new(resolver),
            Arc::new(RtcTransportFactory::new()),
        ))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn downgrade(&self) -> WeakEngine {
        WeakEngine(Arc::downgrade(&self.inner))
    }

    fn emit(&self, event: EngineEvent) {
        if self.inner.events.send(event).is_err() {
            debug!("engine event dropped, no listener");
        }
    }

    fn report(&self, err: &EngineError) {
        warn!(kind = %err.kind(), "{err}");
        self.emit(EngineEvent::error(err));
    }

    /// ========== LIFECYCLE ==========

    /// Starts a fresh direct-mode session for `room_id`, replacing any previous one.
    pub async fn initialize(&self, room_id: &str) -> Result<(), EngineError> {
        let session = Session::new(room_id, TransportMode::Direct);
        let session_id = session.id.clone();
        let (generation, previous) = {
            let mut st = self.state();
            let previous = st.reset_call();
            (st.install(session), previous)
        };
        close_transport(previous).await;
        info!(session = %session_id, room = room_id, "initializing session");

        let config = match self.inner.resolver.resolve_direct() {
            Ok(config) => config,
            Err(e) => {
                let err = EngineError::from(e);
                {
                    let mut st = self.state();
                    if st.current_generation() == Some(generation) {
                        st.reset_call();
                    }
                }
                error!("no usable traversal configuration: {err}");
                self.emit(EngineEvent::error(&err));
                return Err(err);
            }
        };

        match self.build_transport(generation, config).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(EngineError::NoSession),
            Err(err) => {
                let transport = {
                    let mut st = self.state();
                    if st.current_generation() == Some(generation) {
                        st.reset_call()
                    } else {
                        None
                    }
                };
                close_transport(transport).await;
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Releases the session. Safe to call at any time, any number of times.
    pub async fn cleanup(&self) {
        let transport = self.state().reset_call();
        let had_session = transport.is_some();
        close_transport(transport).await;
        if had_session {
            info!("session cleaned up");
        }
    }

    /// Creates the connection for session `generation`. `Ok(false)` when the
    /// session was superseded while the connection was being built.
    async fn build_transport(
        &self,
        generation: u64,
        config: IceConfig,
    ) -> Result<bool, EngineError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = self
            .inner
            .factory
            .create(&config, tx)
            .await
            .map_err(EngineError::NegotiationFailed)?;

        let installed = {
            let mut st = self.state();
            let local = st.local_stream.clone();
            match st.slot_mut(generation) {
                Some(slot) => {
                    slot.session.transport_mode = config.mode;
                    slot.transport = Some(transport.clone());
                    let weak = self.downgrade();
                    slot.pump = Some(tokio::spawn(async move {
                        while let Some(event) = rx.recv().await {
                            let Some(engine) = weak.upgrade() else { break };
                            engine.on_transport_event(generation, event);
                        }
                    }));
                    Some(local)
                }
                None => None,
            }
        };
        let Some(local) = installed else {
            debug!("session replaced while connecting, discarding connection");
            close_transport(Some(transport)).await;
            return Ok(false);
        };
        debug!(mode = %config.mode, servers = config.servers.len(), "peer connection ready");

        if let Some(stream) = local {
            self.attach_stream(generation, &transport, &stream).await?;
        }
        Ok(true)
    }

    /// ========== IDENTITY & MEDIA ==========

    /// Records who the session talks to. Only the first identity sticks.
    pub fn set_remote_peer(&self, peer_id: &str) -> Result<(), EngineError> {
        let mut st = self.state();
        let Some(slot) = st.slot.as_mut() else {
            drop(st);
            let err = EngineError::NoSession;
            self.report(&err);
            return Err(err);
        };
        if !slot.session.set_remote_peer(peer_id) {
            warn!(
                session = %slot.session.id,
                peer = peer_id,
                current = ?slot.session.remote_peer_id,
                "remote peer already set, ignoring"
            );
        }
        Ok(())
    }

    /// Sends `stream` on the session, replacing earlier tracks of the same kind.
    /// The stream is only borrowed: the engine never stops its tracks.
    pub async fn add_tracks(&self, stream: LocalStream) -> Result<(), EngineError> {
        if stream.is_empty() {
            let err = EngineError::TrackAttachmentFailed(format!("stream {} has no tracks", stream.id));
            self.report(&err);
            return Err(err);
        }

        let (generation, transport) = {
            let mut st = self.state();
            let Some(generation) = st.current_generation() else {
                drop(st);
                self.report(&EngineError::NoSession);
                return Ok(());
            };
            st.local_stream = Some(stream.clone());
            let transport = st.slot.as_ref().and_then(|s| s.transport.clone());
            (generation, transport)
        };

        // Not connected yet: attached once the connection exists
        let Some(transport) = transport else {
            return Ok(());
        };
        if let Err(err) = self.attach_stream(generation, &transport, &stream).await {
            self.report(&err);
            return Err(err);
        }
        Ok(())
    }

    async fn attach_stream(
        &self,
        generation: u64,
        transport: &Arc<dyn PeerTransport>,
        stream: &LocalStream,
    ) -> Result<(), EngineError> {
        let ops = {
            let mut st = self.state();
            match st.slot_mut(generation) {
                Some(slot) => slot.senders.plan(stream),
                None => return Ok(()),
            }
        };

        for op in ops {
            match op {
                SenderOp::Add(track) => {
                    let id = transport.add_track(&track).await.map_err(|e| {
                        EngineError::TrackAttachmentFailed(format!("{} track {}: {e}", track.kind(), track.id()))
                    })?;
                    {
                        let mut st = self.state();
                        if let Some(slot) = st.slot_mut(generation) {
                            slot.senders.insert(track.kind(), id);
                        }
                    }
                    debug!(kind = %track.kind(), track = track.id(), "track attached");
                }
                SenderOp::Replace(id, track) => {
                    transport.replace_track(id, Some(&track)).await.map_err(|e| {
                        EngineError::TrackAttachmentFailed(format!("{} track {}: {e}", track.kind(), track.id()))
                    })?;
                    debug!(kind = %track.kind(), track = track.id(), "track replaced");
                }
                SenderOp::Detach(id) => {
                    if let Err(e) = transport.replace_track(id, None).await {
                        warn!(sender = id, "failed to detach sender: {e}");
                    }
                }
            }
        }
        Ok(())
    }

    /// ========== HANDSHAKE ==========

    /// Live transport of the current session, provided `step` is legal now.
    fn transport_for(&self, step: HandshakeStep) -> Result<(u64, Arc<dyn PeerTransport>), EngineError> {
        let st = self.state();
        let slot = st.slot.as_ref().ok_or(EngineError::NoSession)?;
        slot.session.next_signaling_state(step)?;
        let transport = slot.transport.clone().ok_or(EngineError::NoSession)?;
        Ok((slot.generation, transport))
    }

    fn set_signaling_state(&self, generation: u64, state: SignalingState) -> bool {
        match self.state().slot_mut(generation) {
            Some(slot) => {
                slot.session.signaling_state = state;
                true
            }
            None => false,
        }
    }

    /// Caller side: produces the local offer and moves to HaveLocalOffer.
    pub async fn create_offer(&self) -> Result<SessionDescription, EngineError> {
        let (generation, transport) = self.transport_for(HandshakeStep::LocalOffer).inspect_err(|err| self.report(err))?;

        match transport.create_offer(true).await {
            Ok(offer) => {
                if !self.set_signaling_state(generation, SignalingState::HaveLocalOffer) {
                    return Err(EngineError::NoSession);
                }
                debug!("local offer created");
                Ok(offer)
            }
            Err(e) => Err(self.negotiation_failed(generation, e)),
        }
    }

    /// Answerer side: applies the remote offer, replays buffered candidates and
    /// produces the answer.
    pub async fn create_answer(&self, offer: SessionDescription) -> Result<SessionDescription, EngineError> {
        let (generation, transport) = self.transport_for(HandshakeStep::RemoteOffer).inspect_err(|err| self.report(err))?;

        if let Err(e) = transport.set_remote_description(offer).await {
            return Err(self.negotiation_failed(generation, e));
        }
        if !self.set_signaling_state(generation, SignalingState::HaveRemoteOffer) {
            return Err(EngineError::NoSession);
        }
        self.replay_candidates(generation, &transport).await;

        match transport.create_answer().await {
            Ok(answer) => {
                if !self.set_signaling_state(generation, SignalingState::Stable) {
                    return Err(EngineError::NoSession);
                }
                debug!("local answer created");
                Ok(answer)
            }
            Err(e) => Err(self.negotiation_failed(generation, e)),
        }
    }

    /// Caller side: applies the remote answer. Only legal while an offer is
    /// outstanding; a desynchronized handshake is reported and recovered from.
    pub async fn set_remote_description(&self, answer: SessionDescription) -> Result<RemoteAnswer, EngineError> {
        let (generation, transport) = {
            let mut st = self.state();
            let Some(slot) = st.slot.as_mut() else {
                drop(st);
                let err = EngineError::NoSession;
                self.report(&err);
                return Err(err);
            };
            if slot.applying_answer {
                debug!("remote answer already being applied, dropping duplicate");
                return Ok(RemoteAnswer::Dropped);
            }
            let generation = slot.generation;
            if let Err(err) = slot.session.next_signaling_state(HandshakeStep::RemoteAnswer) {
                drop(st);
                self.report(&err);
                self.trigger_recovery(generation, "remote answer in wrong signaling state");
                return Err(err);
            }
            let Some(transport) = slot.transport.clone() else {
                drop(st);
                let err = EngineError::NoSession;
                self.report(&err);
                return Err(err);
            };
            slot.applying_answer = true;
            (generation, transport)
        };

        let result = transport.set_remote_description(answer).await;
        {
            let mut st = self.state();
            let Some(slot) = st.slot_mut(generation) else {
                debug!("session replaced while applying answer");
                return Ok(RemoteAnswer::Dropped);
            };
            slot.applying_answer = false;
            if result.is_ok() {
                slot.session.signaling_state = SignalingState::Stable;
            }
        }

        match result {
            Ok(()) => {
                debug!("remote answer applied");
                self.replay_candidates(generation, &transport).await;
                Ok(RemoteAnswer::Applied)
            }
            Err(e) => Err(self.negotiation_failed(generation, e)),
        }
    }

    fn negotiation_failed(&self, generation: u64, e: crate::error::TransportError) -> EngineError {
        let err = EngineError::NegotiationFailed(e);
        self.report(&err);
        self.trigger_recovery(generation, "negotiation failed");
        err
    }

    /// ========== CANDIDATES ==========

    /// Applies a remote candidate, or buffers it until the remote description is set.
    pub async fn add_ice_candidate(&self, candidate: IceCandidate) {
        let (transport, candidate) = {
            let mut st = self.state();
            let Some(slot) = st.slot.as_mut() else {
                drop(st);
                self.report(&EngineError::NoSession);
                return;
            };
            let Some(candidate) = slot.candidates.admit(candidate) else {
                debug!(pending = slot.candidates.len(), "remote candidate buffered");
                return;
            };
            match slot.transport.clone() {
                Some(transport) => (transport, candidate),
                None => return,
            }
        };

        if let Err(e) = transport.add_ice_candidate(candidate).await {
            self.report(&EngineError::CandidateRejected(e));
        }
    }

    async fn replay_candidates(&self, generation: u64, transport: &Arc<dyn PeerTransport>) {
        loop {
            let batch = {
                let mut st = self.state();
                match st.slot_mut(generation) {
                    Some(slot) => slot.candidates.drain(),
                    None => return,
                }
            };
            if batch.is_empty() {
                return;
            }
            debug!(count = batch.len(), "replaying buffered candidates");
            for candidate in batch {
                if let Err(e) = transport.add_ice_candidate(candidate).await {
                    self.report(&EngineError::CandidateRejected(e));
                }
            }
        }
    }

    /// ========== TRANSPORT EVENTS ==========

    fn on_transport_event(&self, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::LocalCandidate(candidate) => self.on_local_candidate(generation, candidate),
            TransportEvent::GatheringComplete => {
                if let Some(slot) = self.state().slot_mut(generation) {
                    analyze_candidates("LOCAL", &slot.gathered);
                }
            }
            TransportEvent::Track(track) => self.on_remote_track(generation, track),
            TransportEvent::IceConnectionState(state) => {
                self.on_connection_state(generation, StateSource::Ice, state)
            }
            TransportEvent::ConnectionState(state) => {
                self.on_connection_state(generation, StateSource::Peer, state)
            }
        }
    }

    fn on_local_candidate(&self, generation: u64, candidate: IceCandidate) {
        let to = {
            let mut st = self.state();
            let Some(slot) = st.slot_mut(generation) else { return };
            slot.gathered.push(candidate.clone());
            slot.session.remote_peer_id.clone()
        };
        match to {
            Some(to) => self.emit(EngineEvent::LocalCandidate { to, candidate }),
            None => warn!(candidate = %candidate.candidate, "no remote peer yet, dropping local candidate"),
        }
    }

    fn on_remote_track(&self, generation: u64, track: RemoteTrack) {
        let stream_id = track.stream_id.clone();
        debug!(kind = %track.kind, track = %track.id, stream = %stream_id, "remote track");

        let outcome = match self.state().slot_mut(generation) {
            Some(slot) => slot.coalescer.on_track(track),
            None => return,
        };
        match outcome {
            TrackOutcome::Emit(stream) => self.emit(EngineEvent::RemoteStream(stream)),
            TrackOutcome::Joined => debug!(stream = %stream_id, "track joined delivered stream"),
            TrackOutcome::Wait => {
                let weak = self.downgrade();
                let window = self.inner.config.track_debounce;
                let sid = stream_id.clone();
                let timer = tokio::spawn(async move {
                    sleep(window).await;
                    if let Some(engine) = weak.upgrade() {
                        engine.flush_stream(generation, &sid);
                    }
                });
                match self.state().slot_mut(generation) {
                    Some(slot) => slot.coalescer.set_timer(&stream_id, timer),
                    None => timer.abort(),
                }
            }
        }
    }

    fn flush_stream(&self, generation: u64, stream_id: &str) {
        let stream = match self.state().slot_mut(generation) {
            Some(slot) => slot.coalescer.flush(stream_id),
            None => None,
        };
        if let Some(stream) = stream {
            self.emit(EngineEvent::RemoteStream(stream));
        }
    }

    fn on_connection_state(&self, generation: u64, source: StateSource, reported: ConnectionState) {
        let mut events = Vec::new();
        let mut failed = false;
        {
            let mut st = self.state();
            let Some(slot) = st.slot_mut(generation) else { return };
            let previous = slot.session.connection_state;
            let state = slot.observe(source, reported);
            slot.session.connection_state = state;
            if previous != state {
                info!(
                    session = %slot.session.id,
                    room = %slot.session.room_id,
                    mode = %slot.session.transport_mode,
                    ?source,
                    ?previous,
                    ?state,
                    "connection state changed"
                );
                events.push(EngineEvent::ConnectionState(state));
            }

            match state {
                ConnectionState::Connected => {
                    slot.stop_grace();
                    slot.session.reconnect_attempts = 0;
                    if !slot.announced_connected {
                        slot.announced_connected = true;
                        events.push(EngineEvent::IceConnected);
                    }
                }
                ConnectionState::Disconnected => {
                    if slot.grace.is_none() {
                        let weak = self.downgrade();
                        let grace = self.inner.config.grace_period;
                        debug!(?grace, "connection lost, waiting before recovery");
                        slot.grace = Some(tokio::spawn(async move {
                            sleep(grace).await;
                            if let Some(engine) = weak.upgrade() {
                                engine.on_grace_elapsed(generation);
                            }
                        }));
                    }
                }
                ConnectionState::Failed => {
                    slot.stop_grace();
                    failed = true;
                }
                ConnectionState::Closed => slot.stop_grace(),
                ConnectionState::New | ConnectionState::Checking => {}
            }
        }

        for event in events {
            self.emit(event);
        }
        if failed {
            self.trigger_recovery(generation, "connection failed");
        }
    }

    fn on_grace_elapsed(&self, generation: u64) {
        let still_down = {
            let mut st = self.state();
            let Some(slot) = st.slot_mut(generation) else { return };
            slot.grace = None;
            slot.session.connection_state == ConnectionState::Disconnected
        };
        if still_down {
            self.trigger_recovery(generation, "connection did not come back");
        }
    }

    /// ========== RECOVERY ==========

    /// Starts recovering session `generation` unless it is stale or already recovering.
    fn trigger_recovery(&self, generation: u64, reason: &str) {
        let mut st = self.state();
        let epoch = st.epoch;
        let Some(slot) = st.slot_mut(generation) else { return };
        if slot.recovering {
            debug!(session = %slot.session.id, reason, "recovery already in progress");
            return;
        }
        slot.recovering = true;
        warn!(
            session = %slot.session.id,
            room = %slot.session.room_id,
            peer = slot.session.remote_peer_id.as_deref().unwrap_or("-"),
            mode = %slot.session.transport_mode,
            reason,
            "starting connection recovery"
        );
        let id = st.next_recovery_id();
        let weak = self.downgrade();
        let task = tokio::spawn(async move {
            if let Some(engine) = weak.upgrade() {
                engine.run_recovery(epoch, id).await;
            }
        });
        st.recovery = Some((id, task));
    }

    fn next_recovery_step(&self, epoch: u64) -> Option<RecoveryStep> {
        let max = self.inner.config.max_reconnect_attempts;
        let mut st = self.state();
        if st.epoch != epoch {
            return None;
        }
        let fallback_free = !st.fallback_used;
        let slot = st.slot.as_mut()?;
        let session = &mut slot.session;

        let step = if fallback_free && session.transport_mode == TransportMode::Direct {
            RecoveryStep::Fallback
        } else if session.reconnect_attempts >= max {
            RecoveryStep::Exhausted(session.reconnect_attempts)
        } else {
            session.reconnect_attempts += 1;
            RecoveryStep::Retry(session.reconnect_attempts)
        };
        if matches!(step, RecoveryStep::Fallback) {
            st.fallback_used = true;
        }
        Some(step)
    }

    async fn run_recovery(&self, epoch: u64, id: u64) {
        loop {
            let Some(step) = self.next_recovery_step(epoch) else { return };
            match step {
                RecoveryStep::Fallback => {
                    info!(session = %self.session_id(), "direct connection failed, switching to relay");
                }
                RecoveryStep::Retry(attempt) => {
                    let delay = backoff_delay(
                        attempt,
                        self.inner.config.backoff_base,
                        self.inner.config.backoff_cap,
                    );
                    info!(session = %self.session_id(), attempt, ?delay, "reconnecting after backoff");
                    sleep(delay).await;
                }
                RecoveryStep::Exhausted(attempts) => {
                    self.give_up(epoch, id, attempts).await;
                    return;
                }
            }

            match self.rebuild(epoch).await {
                Ok(Some(event)) => {
                    self.state().release_recovery(id);
                    self.emit(event);
                    return;
                }
                Ok(None) => return,
                Err(err) => self.report(&err),
            }
        }
    }

    /// Replaces the current session with a relay-mode one. `Ok(None)` when the
    /// call ended meanwhile.
    async fn rebuild(&self, epoch: u64) -> Result<Option<EngineEvent>, EngineError> {
        let (generation, previous) = {
            let mut st = self.state();
            if st.epoch != epoch {
                return Ok(None);
            }
            let Some(old) = st.slot.take() else { return Ok(None) };
            let session = old.session.rebuilt(TransportMode::Relayed);
            let previous = old.teardown();
            (st.install(session), previous)
        };
        close_transport(previous).await;

        let config = match self.inner.resolver.resolve_relay().await {
            Ok(config) => config,
            Err(e) => {
                self.report(&EngineError::from(e));
                warn!("relay unavailable, retrying with direct configuration");
                self.inner.resolver.resolve_direct()?
            }
        };

        if !self.build_transport(generation, config).await? {
            return Ok(None);
        }

        let st = self.state();
        let Some(slot) = st.slot.as_ref().filter(|s| s.generation == generation) else {
            return Ok(None);
        };
        info!(
            session = %slot.session.id,
            room = %slot.session.room_id,
            peer = slot.session.remote_peer_id.as_deref().unwrap_or("-"),
            mode = %slot.session.transport_mode,
            attempt = slot.session.reconnect_attempts,
            "session rebuilt"
        );
        Ok(Some(EngineEvent::ReconnectRequested {
            remote_peer_id: slot.session.remote_peer_id.clone(),
            mode: slot.session.transport_mode,
        }))
    }

    async fn give_up(&self, epoch: u64, id: u64, attempts: u32) {
        let err = EngineError::ReconnectExhausted(attempts);
        error!(session = %self.session_id(), attempt = attempts, "{err}");
        let transport = {
            let mut st = self.state();
            if st.epoch != epoch {
                return;
            }
            st.release_recovery(id);
            st.reset_call()
        };
        self.emit(EngineEvent::error(&err));
        close_transport(transport).await;
    }

    /// ========== INSPECTION ==========

    fn session_id(&self) -> String {
        self.state()
            .slot
            .as_ref()
            .map_or_else(|| "-".to_string(), |s| s.session.id.clone())
    }

    pub fn snapshot(&self) -> Option<Session> {
        self.state().slot.as_ref().map(|s| s.session.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.state()
            .slot
            .as_ref()
            .is_some_and(|s| s.session.is_connected())
    }
}

async fn close_transport(transport: Option<Arc<dyn PeerTransport>>) {
    if let Some(transport) = transport {
        if let Err(e) = transport.close().await {
            debug!("error while closing peer connection: {e}");
        }
    }
}
