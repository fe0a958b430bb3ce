use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// ========== SIGNALING PAYLOADS ==========

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
    Pranswer,
}

/// Session description as it travels over signaling: `{type, sdp}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }

    pub fn to_rtc(&self) -> Result<RTCSessionDescription, TransportError> {
        let desc = match self.kind {
            SdpKind::Offer => RTCSessionDescription::offer(self.sdp.clone())?,
            SdpKind::Answer => RTCSessionDescription::answer(self.sdp.clone())?,
            SdpKind::Pranswer => RTCSessionDescription::pranswer(self.sdp.clone())?,
        };
        Ok(desc)
    }
}

impl TryFrom<&RTCSessionDescription> for SessionDescription {
    type Error = TransportError;

    fn try_from(desc: &RTCSessionDescription) -> Result<Self, Self::Error> {
        let kind = match desc.sdp_type {
            RTCSdpType::Offer => SdpKind::Offer,
            RTCSdpType::Answer => SdpKind::Answer,
            RTCSdpType::Pranswer => SdpKind::Pranswer,
            other => {
                return Err(TransportError::Other(format!(
                    "unsupported sdp type {other}"
                )))
            }
        };
        Ok(Self {
            kind,
            sdp: desc.sdp.clone(),
        })
    }
}

/// ICE candidate in the browser's `RTCIceCandidateInit` shape
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
    #[serde(default)]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: Some("0".into()),
            sdp_mline_index: Some(0),
            username_fragment: None,
        }
    }

    /// `host`, `srflx`, `prflx` or `relay`, as announced after `typ`
    pub fn candidate_type(&self) -> Option<&str> {
        let mut parts = self.candidate.split_whitespace();
        while let Some(part) = parts.next() {
            if part == "typ" {
                return parts.next();
            }
        }
        None
    }
}

impl From<RTCIceCandidateInit> for IceCandidate {
    fn from(init: RTCIceCandidateInit) -> Self {
        Self {
            candidate: init.candidate,
            sdp_mid: init.sdp_mid,
            sdp_mline_index: init.sdp_mline_index,
            username_fragment: init.username_fragment,
        }
    }
}

impl From<IceCandidate> for RTCIceCandidateInit {
    fn from(c: IceCandidate) -> Self {
        RTCIceCandidateInit {
            candidate: c.candidate,
            sdp_mid: c.sdp_mid,
            sdp_mline_index: c.sdp_mline_index,
            username_fragment: c.username_fragment,
        }
    }
}

/// ========== SESSION STATE ==========

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn from_codec_type(t: RTPCodecType) -> Option<Self> {
        match t {
            RTPCodecType::Audio => Some(Self::Audio),
            RTPCodecType::Video => Some(Self::Video),
            _ => None,
        }
    }

    pub fn codec_type(self) -> RTPCodecType {
        match self {
            Self::Audio => RTPCodecType::Audio,
            Self::Video => RTPCodecType::Video,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Audio => "audio",
            Self::Video => "video",
        })
    }
}

/// Offer/answer handshake position of a session
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalingState {
    #[default]
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    New,
    Checking,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Traversal assistance only
    Direct,
    /// All media through a relay
    Relayed,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Direct => "direct",
            Self::Relayed => "relayed",
        })
    }
}

/// ========== MEDIA ==========

/// One outbound track lent to the engine by its owner
#[derive(Clone)]
pub struct LocalTrack {
    kind: MediaKind,
    track: Arc<dyn TrackLocal + Send + Sync>,
}

impl LocalTrack {
    /// `None` for tracks that are neither audio nor video.
    pub fn new(track: Arc<dyn TrackLocal + Send + Sync>) -> Option<Self> {
        let kind = MediaKind::from_codec_type(track.kind())?;
        Some(Self { kind, track })
    }

    /// Sample-fed track with the default codec for `kind` (Opus / VP8).
    pub fn sample(kind: MediaKind, id: &str, stream_id: &str) -> Self {
        let codec = match kind {
            MediaKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            MediaKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
        };
        let track = Arc::new(TrackLocalStaticSample::new(
            codec,
            id.to_owned(),
            stream_id.to_owned(),
        ));
        Self { kind, track }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        self.track.id()
    }

    pub fn stream_id(&self) -> &str {
        self.track.stream_id()
    }

    pub fn rtc(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.track.clone()
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("kind", &self.kind)
            .field("id", &self.id())
            .finish()
    }
}

/// Local media stream (camera + microphone)
#[derive(Debug, Clone)]
pub struct LocalStream {
    pub id: String,
    pub tracks: Vec<LocalTrack>,
}

impl LocalStream {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tracks: Vec::new(),
        }
    }

    /// Stream with one Opus and one VP8 sample track.
    pub fn audio_video(id: &str) -> Self {
        Self::new(id)
            .with_track(LocalTrack::sample(MediaKind::Audio, &format!("{id}-audio"), id))
            .with_track(LocalTrack::sample(MediaKind::Video, &format!("{id}-video"), id))
    }

    pub fn with_track(mut self, track: LocalTrack) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Inbound track announced by the transport
#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: MediaKind,
    rtc: Option<Arc<TrackRemote>>,
}

impl RemoteTrack {
    pub fn new(id: impl Into<String>, stream_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            stream_id: stream_id.into(),
            kind,
            rtc: None,
        }
    }

    pub fn from_rtc(track: Arc<TrackRemote>) -> Option<Self> {
        let kind = MediaKind::from_codec_type(track.kind())?;
        Some(Self {
            id: track.id(),
            stream_id: track.stream_id(),
            kind,
            rtc: Some(track),
        })
    }

    /// Underlying RTP track, for reading media.
    pub fn rtc(&self) -> Option<&Arc<TrackRemote>> {
        self.rtc.as_ref()
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Inbound stream handed to the consumer.
///
/// Clones share the track list, so a track that joins after the stream was
/// delivered is visible to whoever already holds it.
#[derive(Debug, Clone)]
pub struct RemoteStream {
    id: String,
    tracks: Arc<RwLock<Vec<RemoteTrack>>>,
}

impl RemoteStream {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tracks: Arc::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> Vec<RemoteTrack> {
        self.tracks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has(&self, kind: MediaKind) -> bool {
        self.tracks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|t| t.kind == kind)
    }

    pub(crate) fn push(&self, track: RemoteTrack) {
        self.tracks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(track);
    }

    pub fn same_as(&self, other: &RemoteStream) -> bool {
        Arc::ptr_eq(&self.tracks, &other.tracks)
    }
}
