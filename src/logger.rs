use crate::config::{DEFAULT_LOG_FILTER, LOG_ENV};
use crate::peer::types::IceCandidate;
use tracing::{debug, info, trace, warn};
use tracing_subscriber::EnvFilter;
use webrtc::peer_connection::RTCPeerConnection;

/// Installs the fmt subscriber; filter from `PEERCALL_LOG`, else the build-profile default.
/// Safe to call more than once.
pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Trace one ICE candidate as it appears (trickle ICE)
pub fn dump_candidate(label: &str, cand: &IceCandidate) {
    trace!(
        label,
        candidate = %cand.candidate,
        kind = cand.candidate_type().unwrap_or("?"),
        sdp_mid = ?cand.sdp_mid,
        sdp_mline_index = ?cand.sdp_mline_index,
        "trickle candidate"
    );
}

/// Count gathered candidates per type and warn when no relay path exists
pub fn analyze_candidates<'a>(label: &str, candidates: impl IntoIterator<Item = &'a IceCandidate>) {
    let (mut host, mut srflx, mut relay) = (0, 0, 0);
    for c in candidates {
        match c.candidate_type() {
            Some("host") => host += 1,
            Some("srflx") | Some("prflx") => srflx += 1,
            Some("relay") => relay += 1,
            _ => {}
        }
    }
    debug!(label, host, srflx, relay, "candidate summary");
    if host + srflx + relay > 0 && srflx + relay == 0 {
        warn!(label, "only host candidates gathered, traversal through NAT may fail");
    }
}

/// Quick getStats snapshot of the nominated pair
pub async fn dump_selected_pair(pc: &RTCPeerConnection, moment: &str) {
    let stats = pc.get_stats().await;
    for (_, v) in stats.reports {
        if let webrtc::stats::StatsReportType::CandidatePair(pair) = v {
            if pair.nominated {
                info!(
                    moment,
                    local = %pair.local_candidate_id,
                    remote = %pair.remote_candidate_id,
                    bytes_sent = pair.bytes_sent,
                    bytes_received = pair.bytes_received,
                    state = ?pair.state,
                    "selected candidate pair"
                );
            }
        }
    }
}
