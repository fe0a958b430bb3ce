use crate::peer::connection::rtc_config;
use crate::peer::types::{IceCandidate, TransportMode};
use crate::resolver::{IceConfig, IceServer};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;

/// Remote candidates received before the remote description was applied.
///
/// Candidates come out in arrival order. The buffer only turns "ready" once a
/// drain finds it empty, so candidates arriving during a replay are queued
/// behind the ones being replayed instead of overtaking them.
#[derive(Debug, Default)]
pub(crate) struct CandidateBuffer {
    pending: Vec<IceCandidate>,
    ready: bool,
}

impl CandidateBuffer {
    /// Hands the candidate back when it can be applied right away, queues it otherwise.
    pub fn admit(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.ready {
            Some(candidate)
        } else {
            self.pending.push(candidate);
            None
        }
    }

    /// Next batch to replay; an empty batch means the buffer is now ready.
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        if self.pending.is_empty() {
            self.ready = true;
        }
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.ready = false;
    }
}

enum ProbeSignal {
    Matched,
    Complete,
}

/// Checks one STUN/TURN server by gathering on a throwaway connection.
///
/// A STUN server passes when a server-reflexive candidate shows up, a TURN
/// server when a relay candidate does.
pub async fn probe_ice_server(server: &IceServer, wait: Duration) -> bool {
    let relay = server.username.is_some() && server.credential.is_some();
    let expected = if relay { "relay" } else { "srflx" };
    let config = IceConfig {
        mode: if relay {
            TransportMode::Relayed
        } else {
            TransportMode::Direct
        },
        servers: vec![server.clone()],
    };

    let api = APIBuilder::new().build();
    let pc = match api.new_peer_connection(rtc_config(&config)).await {
        Ok(pc) => pc,
        Err(e) => {
            warn!("probe: failed to create peer connection: {e}");
            return false;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cand_tx = tx.clone();
    pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
        if let Some(init) = cand.and_then(|c| c.to_json().ok()) {
            let cand = IceCandidate::from(init);
            debug!(candidate = %cand.candidate, "probe candidate");
            if cand.candidate_type() == Some(expected) {
                let _ = cand_tx.send(ProbeSignal::Matched);
            }
        }
        Box::pin(async {})
    }));
    pc.on_ice_gathering_state_change(Box::new(move |state| {
        if state == RTCIceGathererState::Complete {
            let _ = tx.send(ProbeSignal::Complete);
        }
        Box::pin(async {})
    }));

    // gathering only starts once there is something to negotiate
    if let Err(e) = pc.create_data_channel("probe", None).await {
        warn!("probe: failed to create data channel: {e}");
        let _ = pc.close().await;
        return false;
    }
    let started = match pc.create_offer(None).await {
        Ok(offer) => pc.set_local_description(offer).await,
        Err(e) => Err(e),
    };
    if let Err(e) = started {
        warn!("probe: failed to start gathering: {e}");
        let _ = pc.close().await;
        return false;
    }

    let result = matches!(
        timeout(wait, rx.recv()).await,
        Ok(Some(ProbeSignal::Matched))
    );
    info!(urls = ?server.urls, expected, result, "ICE server probe finished");
    let _ = pc.close().await;
    result
}
