use crate::peer::connection::SenderId;
use crate::peer::types::{LocalStream, LocalTrack, MediaKind, RemoteStream, RemoteTrack};
use std::collections::HashMap;
use tokio::task::JoinHandle;

/// ========== OUTBOUND ==========

/// What has to happen to the transport for a new local stream
#[derive(Debug)]
pub(crate) enum SenderOp {
    Add(LocalTrack),
    Replace(SenderId, LocalTrack),
    Detach(SenderId),
}

/// Outbound senders, at most one per media kind
#[derive(Debug, Default)]
pub(crate) struct SenderSet {
    senders: HashMap<MediaKind, SenderId>,
}

impl SenderSet {
    /// Operations that make the senders mirror `stream`. Extra tracks of an
    /// already covered kind are ignored.
    pub fn plan(&self, stream: &LocalStream) -> Vec<SenderOp> {
        let mut ops = Vec::new();
        let mut covered = Vec::new();
        for track in &stream.tracks {
            let kind = track.kind();
            if covered.contains(&kind) {
                continue;
            }
            covered.push(kind);
            match self.senders.get(&kind) {
                Some(&id) => ops.push(SenderOp::Replace(id, track.clone())),
                None => ops.push(SenderOp::Add(track.clone())),
            }
        }
        for (kind, &id) in &self.senders {
            if !covered.contains(kind) {
                ops.push(SenderOp::Detach(id));
            }
        }
        ops
    }

    pub fn insert(&mut self, kind: MediaKind, id: SenderId) {
        self.senders.insert(kind, id);
    }

    pub fn clear(&mut self) {
        self.senders.clear();
    }
}

/// ========== INBOUND ==========

#[derive(Debug)]
pub(crate) enum TrackOutcome {
    /// Stream still incomplete; (re)start its debounce timer
    Wait,
    /// Stream complete, hand it out now
    Emit(RemoteStream),
    /// Track joined a stream that was already handed out
    Joined,
}

struct PendingStream {
    stream: RemoteStream,
    emitted: bool,
    timer: Option<JoinHandle<()>>,
}

impl PendingStream {
    fn new(id: &str) -> Self {
        Self {
            stream: RemoteStream::new(id),
            emitted: false,
            timer: None,
        }
    }

    fn stop_timer(&mut self) {
        if let Some(t) = self.timer.take() {
            t.abort();
        }
    }
}

/// Groups inbound tracks by stream so each stream is handed out once
#[derive(Default)]
pub(crate) struct StreamCoalescer {
    streams: HashMap<String, PendingStream>,
}

impl StreamCoalescer {
    pub fn on_track(&mut self, track: RemoteTrack) -> TrackOutcome {
        let entry = self
            .streams
            .entry(track.stream_id.clone())
            .or_insert_with(|| PendingStream::new(&track.stream_id));

        if entry.emitted {
            if !entry.stream.has(track.kind) {
                entry.stream.push(track);
                return TrackOutcome::Joined;
            }
            // same kind again after delivery: the remote side replaced its stream
            entry.stop_timer();
            *entry = PendingStream::new(&track.stream_id);
        }

        entry.stream.push(track);
        if entry.stream.has(MediaKind::Audio) && entry.stream.has(MediaKind::Video) {
            entry.emitted = true;
            entry.stop_timer();
            TrackOutcome::Emit(entry.stream.clone())
        } else {
            TrackOutcome::Wait
        }
    }

    /// Stores the debounce timer of a stream, cancelling the previous one.
    pub fn set_timer(&mut self, stream_id: &str, timer: JoinHandle<()>) {
        match self.streams.get_mut(stream_id) {
            Some(entry) => {
                entry.stop_timer();
                entry.timer = Some(timer);
            }
            None => timer.abort(),
        }
    }

    /// Debounce window elapsed: the stream, unless it was already handed out.
    pub fn flush(&mut self, stream_id: &str) -> Option<RemoteStream> {
        let entry = self.streams.get_mut(stream_id)?;
        entry.timer = None;
        if entry.emitted {
            return None;
        }
        entry.emitted = true;
        Some(entry.stream.clone())
    }

    pub fn clear(&mut self) {
        for (_, mut entry) in self.streams.drain() {
            entry.stop_timer();
        }
    }
}

impl Drop for StreamCoalescer {
    fn drop(&mut self) {
        self.clear();
    }
}
