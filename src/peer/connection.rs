use crate::error::TransportError;
use crate::logger::{dump_candidate, dump_selected_pair};
use crate::peer::types::{
    ConnectionState, IceCandidate, LocalTrack, MediaKind, RemoteTrack, SessionDescription,
    TransportMode,
};
use crate::resolver::IceConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::ice_transport_policy::RTCIceTransportPolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

/// Opaque handle of an outbound sender inside one transport
pub type SenderId = u64;

/// Notifications pushed by a transport to its session
#[derive(Debug, Clone)]
pub enum TransportEvent {
    LocalCandidate(IceCandidate),
    GatheringComplete,
    Track(RemoteTrack),
    IceConnectionState(ConnectionState),
    ConnectionState(ConnectionState),
}

pub type TransportEvents = mpsc::UnboundedSender<TransportEvent>;

/// One point-to-point media connection
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Creates an offer and applies it locally.
    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription, TransportError>;

    /// Creates an answer to the applied remote offer and applies it locally.
    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), TransportError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    async fn add_track(&self, track: &LocalTrack) -> Result<SenderId, TransportError>;

    /// Swaps the track of an existing sender; `None` detaches it.
    async fn replace_track(
        &self,
        sender: SenderId,
        track: Option<&LocalTrack>,
    ) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        config: &IceConfig,
        events: TransportEvents,
    ) -> Result<Arc<dyn PeerTransport>, TransportError>;
}

/// ========== WEBRTC IMPLEMENTATION ==========

#[derive(Default)]
pub struct RtcTransportFactory;

impl RtcTransportFactory {
    pub fn new() -> Self {
        Self
    }
}

fn build_api() -> Result<API, TransportError> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;
    let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;
    Ok(APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build())
}

/// Builds the peer connection configuration for a resolved server set
pub fn rtc_config(config: &IceConfig) -> RTCConfiguration {
    let ice_servers = config
        .servers
        .iter()
        .map(|s| RTCIceServer {
            urls: s.urls.clone(),
            username: s.username.clone().unwrap_or_default(),
            credential: s.credential.clone().unwrap_or_default(),
        })
        .collect();

    let ice_transport_policy = match config.mode {
        TransportMode::Direct => RTCIceTransportPolicy::All,
        TransportMode::Relayed => RTCIceTransportPolicy::Relay,
    };

    RTCConfiguration {
        ice_servers,
        ice_transport_policy,
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}

fn map_ice_state(st: RTCIceConnectionState) -> ConnectionState {
    match st {
        RTCIceConnectionState::Checking => ConnectionState::Checking,
        RTCIceConnectionState::Connected | RTCIceConnectionState::Completed => {
            ConnectionState::Connected
        }
        RTCIceConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCIceConnectionState::Failed => ConnectionState::Failed,
        RTCIceConnectionState::Closed => ConnectionState::Closed,
        _ => ConnectionState::New,
    }
}

fn map_peer_state(st: RTCPeerConnectionState) -> ConnectionState {
    match st {
        RTCPeerConnectionState::Connecting => ConnectionState::Checking,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
        _ => ConnectionState::New,
    }
}

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn create(
        &self,
        config: &IceConfig,
        events: TransportEvents,
    ) -> Result<Arc<dyn PeerTransport>, TransportError> {
        let api = build_api()?;
        let pc = Arc::new(api.new_peer_connection(rtc_config(config)).await?);
        debug!(mode = %config.mode, "peer connection created");

        let tx = events.clone();
        pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
            match cand {
                Some(c) => match c.to_json() {
                    Ok(init) => {
                        let cand = IceCandidate::from(init);
                        dump_candidate("LOCAL", &cand);
                        let _ = tx.send(TransportEvent::LocalCandidate(cand));
                    }
                    Err(e) => warn!("failed to serialize local candidate: {e}"),
                },
                // None marks the end of gathering
                None => {
                    let _ = tx.send(TransportEvent::GatheringComplete);
                }
            }
            Box::pin(async {})
        }));

        let tx = events.clone();
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                match RemoteTrack::from_rtc(track) {
                    Some(t) => {
                        let _ = tx.send(TransportEvent::Track(t));
                    }
                    None => debug!("ignoring track of unknown kind"),
                }
                Box::pin(async {})
            },
        ));

        let tx = events.clone();
        pc.on_ice_connection_state_change(Box::new(move |st: RTCIceConnectionState| {
            debug!("ICE connection state changed to: {:?}", st);
            let _ = tx.send(TransportEvent::IceConnectionState(map_ice_state(st)));
            Box::pin(async {})
        }));

        let tx = events;
        let pc_stats = Arc::downgrade(&pc);
        pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
            debug!("Peer connection state changed to: {:?}", st);
            if st == RTCPeerConnectionState::Failed {
                if let Some(pc) = pc_stats.upgrade() {
                    tokio::spawn(async move {
                        dump_selected_pair(&pc, "BEFORE-FAIL").await;
                    });
                }
            }
            let _ = tx.send(TransportEvent::ConnectionState(map_peer_state(st)));
            Box::pin(async {})
        }));

        Ok(Arc::new(RtcPeer {
            pc,
            senders: Mutex::new(HashMap::new()),
            next_sender: AtomicU64::new(1),
        }))
    }
}

struct RtcPeer {
    pc: Arc<RTCPeerConnection>,
    senders: Mutex<HashMap<SenderId, Arc<RTCRtpSender>>>,
    next_sender: AtomicU64,
}

impl RtcPeer {
    fn sender(&self, id: SenderId) -> Result<Arc<RTCRtpSender>, TransportError> {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(TransportError::UnknownSender(id))
    }

    /// Makes sure an audio and a video m-line are offered even when nothing is sent yet.
    async fn ensure_transceivers(&self) -> Result<(), TransportError> {
        let existing = self.pc.get_transceivers().await;
        for kind in [MediaKind::Audio, MediaKind::Video] {
            if !existing.iter().any(|t| t.kind() == kind.codec_type()) {
                self.pc
                    .add_transceiver_from_kind(kind.codec_type(), None)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for RtcPeer {
    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription, TransportError> {
        self.ensure_transceivers().await?;
        // a restart needs a running ICE agent; a fresh connection gathers anew anyway
        let restart = ice_restart && self.pc.current_remote_description().await.is_some();
        let offer = self
            .pc
            .create_offer(Some(RTCOfferOptions {
                ice_restart: restart,
                ..Default::default()
            }))
            .await?;
        let desc = SessionDescription::try_from(&offer)?;
        self.pc.set_local_description(offer).await?;
        Ok(desc)
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        let answer = self.pc.create_answer(None).await?;
        let desc = SessionDescription::try_from(&answer)?;
        self.pc.set_local_description(answer).await?;
        Ok(desc)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), TransportError> {
        self.pc.set_remote_description(desc.to_rtc()?).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        dump_candidate("REMOTE", &candidate);
        self.pc.add_ice_candidate(candidate.into()).await?;
        Ok(())
    }

    async fn add_track(&self, track: &LocalTrack) -> Result<SenderId, TransportError> {
        let sender = self.pc.add_track(track.rtc()).await?;

        // RTCP has to be drained for the interceptors to work
        let rtcp = sender.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtcp.read(&mut buf).await.is_ok() {}
        });

        let id = self.next_sender.fetch_add(1, Ordering::Relaxed);
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sender);
        Ok(id)
    }

    async fn replace_track(
        &self,
        sender: SenderId,
        track: Option<&LocalTrack>,
    ) -> Result<(), TransportError> {
        let s = self.sender(sender)?;
        s.replace_track(track.map(LocalTrack::rtc)).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.pc.close().await?;
        Ok(())
    }
}
