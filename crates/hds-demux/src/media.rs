//! Resolved per-rendition runtime state: the sample queue, the fragment read
//! cursor, and the download slot/worker that feed it (§3's `Media` record).

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;

use bytes::Bytes;
use hds_manifest::Bootstrap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::slot::DownloadSlot;
use crate::types::{Program, StreamHandle};

/// Bound on a media's decoded-but-undelivered sample queue (§3): when
/// `sample_index` catches up to `nb_samples` both reset, so this is also the
/// most a single fragment decode can hand the caller before the next fetch.
pub(crate) const SAMPLE_BUFFER_CAPACITY: usize = 1024;

/// One decoded access unit waiting to be handed out as a [`crate::Packet`].
#[derive(Debug, Clone)]
pub(crate) struct Sample {
    pub(crate) stream_id: u32,
    pub(crate) dts: i64,
    pub(crate) pts: i64,
    pub(crate) data: Bytes,
    pub(crate) keyframe: bool,
}

/// One bitrate rendition resolved from the manifest, plus the live state
/// `read_packet` drives it with.
pub(crate) struct Media {
    /// Index among the manifest's `<media>` entries; also this media's
    /// program id and the basis for its stream ids (`2i` / `2i+1`).
    pub(crate) index: usize,
    /// The `bitrate` attribute, kbit/s.
    pub(crate) bitrate: u32,
    /// The `url` attribute, relative to the session's base URL.
    pub(crate) url: String,
    /// This media's resolved bootstrap. Shared (never owned) since several
    /// medias commonly reference the same `<bootstrapInfo>`.
    pub(crate) bootstrap: Arc<Bootstrap>,
    /// Optional rendition-selection policy input (§9); the manifest format
    /// itself never sets this.
    pub(crate) quality: Option<String>,
    /// The video stream materialized for this rendition, if `onMetaData`
    /// resolved a known video codec.
    pub(crate) video_stream: Option<StreamHandle>,
    /// The audio stream materialized for this rendition, if `onMetaData`
    /// resolved a known audio codec.
    pub(crate) audio_stream: Option<StreamHandle>,
    /// This media's program (named `"<bitrate> kbit/s"`), containing
    /// whichever of `video_stream`/`audio_stream` exist.
    pub(crate) program: Program,
    /// How many fragments have been requested so far; the next `read_packet`
    /// resolves `(segment, fragment)` for this count via the locator.
    pub(crate) nb_fragments_read: AtomicU32,
    /// Whether a live rendition has anchored its read cursor to the current
    /// live head yet (§4.7: only done once, on the first read).
    pub(crate) ever_read: AtomicBool,
    /// Decoded samples awaiting delivery, FIFO order.
    pub(crate) samples: Mutex<VecDeque<Sample>>,
    /// This media's download slot, shared with its background worker.
    pub(crate) slot: Arc<DownloadSlot>,
    /// The `nb_fragments_read` value the slot currently holds a queued or
    /// in-flight request for, if any. Lets `read_packet` overlap the next
    /// fragment's download with decoding the current one (§2's "concurrent
    /// prefetching engine"): a request queued one fetch ahead is either
    /// waited on directly next time, or aborted and replaced if a seek or
    /// live re-anchor moved the read cursor somewhere else in the meantime.
    pub(crate) prefetch: Mutex<Option<u32>>,
    /// Host-controlled "discard all packets for this stream" flag, mirroring
    /// the external framework's stream state. Streams start discarded (§4.5:
    /// "no packets routed here unless enabled").
    pub(crate) discard_video: AtomicBool,
    /// See [`Media::discard_video`].
    pub(crate) discard_audio: AtomicBool,
    /// The background download worker driving [`Media::slot`], joined at close.
    pub(crate) worker: JoinHandle<()>,
}

impl Media {
    /// Whether every stream this media owns is currently discarded (or it
    /// never had a stream of that kind to begin with). `read_packet`'s
    /// media-selection scan skips such medias (§4.7).
    pub(crate) fn all_discarded(&self) -> bool {
        use std::sync::atomic::Ordering;

        let video_discarded = self.video_stream.is_none() || self.discard_video.load(Ordering::Acquire);
        let audio_discarded = self.audio_stream.is_none() || self.discard_audio.load(Ordering::Acquire);
        video_discarded && audio_discarded
    }
}
