#![allow(dead_code)]

use async_trait::async_trait;
use peercall::peer::connection::{SenderId, TransportEvents};
use peercall::peer::{
    ConnectionState, IceCandidate, LocalTrack, MediaKind, PeerTransport, RemoteTrack, SdpKind,
    SessionDescription, TransportEvent, TransportFactory, TransportMode,
};
use peercall::{
    EngineConfig, EngineEvent, EngineEvents, IceConfig, IceConfigResolver, IceServer, PeerEngine,
    ResolveError, TransportError,
};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Everything a scripted transport was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateOffer { ice_restart: bool },
    CreateAnswer,
    SetRemote(SdpKind),
    AddCandidate(String),
    AddTrack(MediaKind),
    ReplaceTrack(SenderId, Option<String>),
    Close,
}

pub struct MockTransport {
    pub index: usize,
    pub mode: TransportMode,
    events: TransportEvents,
    calls: Mutex<Vec<Call>>,
    pub fail_negotiation: AtomicBool,
    closed: AtomicBool,
    next_sender: AtomicU64,
}

impl MockTransport {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn candidates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::AddCandidate(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    pub fn state(&self, state: ConnectionState) {
        self.emit(TransportEvent::ConnectionState(state));
    }

    pub fn ice_state(&self, state: ConnectionState) {
        self.emit(TransportEvent::IceConnectionState(state));
    }

    pub fn track(&self, id: &str, stream: &str, kind: MediaKind) {
        self.emit(TransportEvent::Track(RemoteTrack::new(id, stream, kind)));
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self) -> Result<(), TransportError> {
        if self.fail_negotiation.load(Ordering::SeqCst) {
            return Err(TransportError::Other("scripted failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription, TransportError> {
        self.record(Call::CreateOffer { ice_restart });
        self.check()?;
        Ok(SessionDescription::offer(format!("offer-{}", self.index)))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        self.record(Call::CreateAnswer);
        self.check()?;
        Ok(SessionDescription::answer(format!("answer-{}", self.index)))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), TransportError> {
        self.record(Call::SetRemote(desc.kind));
        // lets a concurrent caller observe the in-flight application
        tokio::task::yield_now().await;
        self.check()
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        self.record(Call::AddCandidate(candidate.candidate));
        Ok(())
    }

    async fn add_track(&self, track: &LocalTrack) -> Result<SenderId, TransportError> {
        self.record(Call::AddTrack(track.kind()));
        Ok(self.next_sender.fetch_add(1, Ordering::SeqCst))
    }

    async fn replace_track(
        &self,
        sender: SenderId,
        track: Option<&LocalTrack>,
    ) -> Result<(), TransportError> {
        self.record(Call::ReplaceTrack(sender, track.map(|t| t.id().to_string())));
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.record(Call::Close);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockFactory {
    created: Mutex<Vec<Arc<MockTransport>>>,
    pub fail_create: AtomicBool,
}

impl MockFactory {
    pub fn count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn get(&self, index: usize) -> Arc<MockTransport> {
        self.created.lock().unwrap()[index].clone()
    }

    pub fn last(&self) -> Arc<MockTransport> {
        self.created
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no transport created")
    }
}

#[async_trait]
impl TransportFactory for MockFactory {
    async fn create(
        &self,
        config: &IceConfig,
        events: TransportEvents,
    ) -> Result<Arc<dyn PeerTransport>, TransportError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(TransportError::Other("scripted create failure".into()));
        }
        let mut created = self.created.lock().unwrap();
        let transport = Arc::new(MockTransport {
            index: created.len(),
            mode: config.mode,
            events,
            calls: Mutex::new(Vec::new()),
            fail_negotiation: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            next_sender: AtomicU64::new(1),
        });
        created.push(transport.clone());
        Ok(transport)
    }
}

#[derive(Default)]
pub struct MockResolver {
    pub relay_fails: AtomicBool,
    pub relay_calls: AtomicUsize,
}

#[async_trait]
impl IceConfigResolver for MockResolver {
    fn resolve_direct(&self) -> Result<IceConfig, ResolveError> {
        Ok(IceConfig {
            mode: TransportMode::Direct,
            servers: vec![IceServer {
                urls: vec!["stun:stun.test:3478".into()],
                username: None,
                credential: None,
            }],
        })
    }

    async fn resolve_relay(&self) -> Result<IceConfig, ResolveError> {
        self.relay_calls.fetch_add(1, Ordering::SeqCst);
        if self.relay_fails.load(Ordering::SeqCst) {
            return Err(ResolveError::Malformed("missing credential".into()));
        }
        Ok(IceConfig {
            mode: TransportMode::Relayed,
            servers: vec![IceServer {
                urls: vec!["turn:turn.test:3478".into()],
                username: Some("user".into()),
                credential: Some("secret".into()),
            }],
        })
    }
}

pub struct Harness {
    pub engine: PeerEngine,
    pub events: EngineEvents,
    pub factory: Arc<MockFactory>,
    pub resolver: Arc<MockResolver>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let factory = Arc::new(MockFactory::default());
        let resolver = Arc::new(MockResolver::default());
        let (engine, events) = PeerEngine::new(config, resolver.clone(), factory.clone());
        Self {
            engine,
            events,
            factory,
            resolver,
        }
    }

    /// Events delivered so far
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = self.events.try_recv() {
            out.push(ev);
        }
        out
    }
}

/// Lets spawned pumps and timers run; advances paused time by 1ms.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn candidate(n: usize) -> IceCandidate {
    IceCandidate::new(format!("candidate:{n} 1 udp 2122260223 10.0.0.{n} 5000 typ host"))
}

pub fn errors(events: &[EngineEvent]) -> Vec<peercall::ErrorKind> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Error { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}
