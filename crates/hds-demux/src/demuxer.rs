//! The demuxer front-end (§4.7): `open`, `probe`, `read_packet`, `seek`, `close`.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use hds_manifest::{Bootstrap, StreamType, parse_f4f_box, parse_manifest};
use tokio::sync::Mutex;

use crate::error::DemuxError;
use crate::flv;
use crate::locator::{fragment_for_timestamp, fragments_read_for_fragment, segment_fragment_for_index};
use crate::media::Media;
use crate::resolver;
use crate::slot::DownloadSlot;
use crate::types::{Packet, Program, SeekFlags, StreamHandle};
use crate::url::{compose_fragment_url, compose_url, query_suffix};
use crate::worker;

/// The substring a manifest URL's path must contain, case-insensitively, for
/// [`Demuxer::probe`] to claim it (§4.7, §6).
const MANIFEST_MARKER: &str = "manifest.f4m";

/// An open HDS session: the parsed manifest, its resolved bootstraps, and
/// one worker-backed [`Media`] per rendition.
pub struct Demuxer {
    client: reqwest::Client,
    base_url: String,
    query_suffix: String,
    stream_type: StreamType,
    duration: i64,
    #[allow(dead_code)]
    bootstraps: Vec<Arc<Bootstrap>>,
    medias: Vec<Media>,
    last_media_index: usize,
    seek_timestamp: Option<i64>,
}

/// What to do with a media's download slot before decoding its next
/// fragment, given what `nb_fragments_read` (if any) the slot already has a
/// request queued or in flight for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrefetchAction {
    /// The slot already holds a request for exactly the fragment we need.
    UseInFlight,
    /// The slot holds a request for some other fragment, made stale by a
    /// seek or live re-anchor; abort it before queuing the right one.
    AbortStaleThenQueue,
    /// Nothing is queued; queue the fragment we need.
    Queue,
}

fn prefetch_action(queued: Option<u32>, needed: u32) -> PrefetchAction {
    match queued {
        Some(q) if q == needed => PrefetchAction::UseInFlight,
        Some(_) => PrefetchAction::AbortStaleThenQueue,
        None => PrefetchAction::Queue,
    }
}

fn base_url_of(manifest_url: &str) -> String {
    let lower = manifest_url.to_ascii_lowercase();
    match lower.find(MANIFEST_MARKER) {
        Some(idx) => manifest_url[..idx].to_string(),
        None => manifest_url.to_string(),
    }
}

impl Demuxer {
    /// Returns a match score if `url`'s path contains `manifest.f4m`
    /// case-insensitively, `None` otherwise (§4.7, §6).
    pub fn probe(url: &str) -> Option<u8> {
        url.to_ascii_lowercase().contains(MANIFEST_MARKER).then_some(u8::MAX)
    }

    /// Downloads and parses `manifest_url`, resolves every bootstrap and
    /// media it references, and starts one download worker per media.
    pub async fn open(client: reqwest::Client, manifest_url: &str) -> Result<Self, DemuxError> {
        let base_url = base_url_of(manifest_url);
        let suffix = query_suffix(manifest_url).to_string();

        let (body, manifest_cookies) = resolver::download_manifest(&client, manifest_url).await?;
        let mut cookie_jar = manifest_cookies;
        let manifest = parse_manifest(&body)?;

        let bootstraps =
            resolver::resolve_bootstraps(&client, &base_url, &suffix, &manifest.bootstraps, &mut cookie_jar).await?;
        if bootstraps.is_empty() {
            return Err(DemuxError::BootstrapIncomplete);
        }

        let mut medias = Vec::with_capacity(manifest.media.len());
        for (index, media_ref) in manifest.media.iter().enumerate() {
            let bootstrap_index = resolver::resolve_bootstrap_index(media_ref, &bootstraps);
            let bootstrap = bootstraps[bootstrap_index].clone();

            let metadata = resolver::resolve_metadata(media_ref);
            let (video_stream, audio_stream, program) = resolver::build_streams(index, media_ref.bitrate, &metadata);

            let (slot, rx) = DownloadSlot::new();
            let worker = tokio::spawn(worker::run(client.clone(), slot.clone(), rx));

            medias.push(Media {
                index,
                bitrate: media_ref.bitrate,
                url: media_ref.url.as_str().to_string(),
                bootstrap,
                quality: None,
                video_stream,
                audio_stream,
                program,
                nb_fragments_read: Default::default(),
                ever_read: Default::default(),
                samples: Mutex::new(Default::default()),
                slot,
                prefetch: Mutex::new(None),
                discard_video: std::sync::atomic::AtomicBool::new(true),
                discard_audio: std::sync::atomic::AtomicBool::new(true),
                worker,
            });
        }

        Ok(Self {
            client,
            base_url,
            query_suffix: suffix,
            stream_type: manifest.stream_type,
            duration: manifest.duration,
            bootstraps,
            medias,
            last_media_index: 0,
            seek_timestamp: None,
        })
    }

    /// The manifest's `<duration>`, in the host's time base (milliseconds).
    pub fn duration(&self) -> i64 {
        self.duration
    }

    /// Every resolved media's program, in manifest order.
    pub fn programs(&self) -> Vec<&Program> {
        self.medias.iter().map(|media| &media.program).collect()
    }

    /// All stream handles this session created, in manifest order.
    pub fn streams(&self) -> Vec<StreamHandle> {
        self.medias
            .iter()
            .flat_map(|media| [media.video_stream, media.audio_stream])
            .flatten()
            .collect()
    }

    /// Marks `stream_id`'s packets as wanted (`discard = false`) or
    /// unwanted (`discard = true`). New streams start discarded (§4.5):
    /// the host must opt in before `read_packet` will route to them.
    pub fn set_discard(&mut self, stream_id: u32, discard: bool) {
        for media in &mut self.medias {
            if media.video_stream.is_some_and(|s| s.id == stream_id) {
                media.discard_video.store(discard, Ordering::Release);
            }
            if media.audio_stream.is_some_and(|s| s.id == stream_id) {
                media.discard_audio.store(discard, Ordering::Release);
            }
        }
    }

    /// Convenience for hosts with no selection policy: wants every stream.
    pub fn enable_all_streams(&mut self) {
        for media in &mut self.medias {
            media.discard_video.store(false, Ordering::Release);
            media.discard_audio.store(false, Ordering::Release);
        }
    }

    fn select_media_index(&self) -> Option<usize> {
        let n = self.medias.len();
        if n == 0 {
            return None;
        }
        (1..=n)
            .map(|offset| (self.last_media_index + offset) % n)
            .find(|&idx| !self.medias[idx].all_discarded())
    }

    /// Selects the next enabled media in round-robin order, ensures it has a
    /// decoded fragment buffered, and returns its next sample as a [`Packet`].
    pub async fn read_packet(&mut self) -> Result<Packet, DemuxError> {
        loop {
            let idx = self.select_media_index().ok_or(DemuxError::NoMediaAvailable)?;
            self.last_media_index = idx;

            self.anchor_live_read(idx).await;
            self.apply_pending_seek(idx).await;

            let needs_fragment = self.medias[idx].samples.lock().await.is_empty();
            if needs_fragment {
                self.fetch_next_fragment(idx).await?;
            }

            let mut samples = self.medias[idx].samples.lock().await;
            if let Some(sample) = samples.pop_front() {
                return Ok(Packet {
                    stream_id: sample.stream_id,
                    dts: sample.dts,
                    pts: sample.pts,
                    data: sample.data,
                    keyframe: sample.keyframe,
                });
            }
            // The fragment decoded to zero routable samples for this media
            // (e.g. an all-video fragment feeding an audio-only rendition);
            // fall through and let the next iteration pick another media.
        }
    }

    /// Live-only: the first read anchors `nb_fragments_read` to the live
    /// head (`current_media_time`) instead of starting at fragment 0 (§4.7).
    async fn anchor_live_read(&self, idx: usize) {
        if self.stream_type != StreamType::Live {
            return;
        }
        let media = &self.medias[idx];
        if media.ever_read.swap(true, Ordering::AcqRel) {
            return;
        }
        let current_media_time = media.bootstrap.abst.current_media_time;
        if let Ok(fragment) = fragment_for_timestamp(&media.bootstrap.abst, media.quality.as_deref(), current_media_time) {
            media
                .nb_fragments_read
                .store(fragments_read_for_fragment(fragment), Ordering::Release);
        }
    }

    /// Consumes a pending `seek_timestamp` against the currently selected
    /// media, per §4.7's recorded-stream seek path.
    async fn apply_pending_seek(&mut self, idx: usize) {
        let Some(seek_timestamp) = self.seek_timestamp.take() else {
            return;
        };
        let media = &self.medias[idx];
        if let Ok(fragment) = fragment_for_timestamp(&media.bootstrap.abst, media.quality.as_deref(), seek_timestamp.max(0) as u64) {
            media
                .nb_fragments_read
                .store(fragments_read_for_fragment(fragment), Ordering::Release);
        }
        media.samples.lock().await.clear();
    }

    async fn fetch_next_fragment(&self, idx: usize) -> Result<(), DemuxError> {
        let media = &self.medias[idx];
        let is_live = self.stream_type == StreamType::Live;
        let nb_fragments_read = media.nb_fragments_read.load(Ordering::Acquire);
        let (segment, fragment) =
            segment_fragment_for_index(&media.bootstrap.abst, media.quality.as_deref(), is_live, nb_fragments_read)?;

        // The slot may already hold a request queued one fetch ahead by the
        // previous call's prefetch below. If it's for the fragment we need,
        // just wait on it; if a seek or live re-anchor moved the cursor
        // somewhere else since it was queued, abort it first (§8 scenario
        // 4's redirect path) and queue the one we actually need.
        let queued = *media.prefetch.lock().await;
        match prefetch_action(queued, nb_fragments_read) {
            PrefetchAction::UseInFlight => {}
            PrefetchAction::AbortStaleThenQueue => {
                media.slot.abort_and_wait().await;
                let url = compose_fragment_url(&self.base_url, &media.url, segment, fragment, &self.query_suffix);
                media.slot.queue(url).await;
            }
            PrefetchAction::Queue => {
                let url = compose_fragment_url(&self.base_url, &media.url, segment, fragment, &self.query_suffix);
                media.slot.queue(url).await;
            }
        }
        *media.prefetch.lock().await = None;

        let body = media
            .slot
            .wait_for_result()
            .await
            .ok_or_else(|| DemuxError::NetworkFailure("fragment download failed after retries".to_string()))?;

        let f4f = parse_f4f_box(&body)?;
        let mdat = f4f.mdat.ok_or(DemuxError::Truncated("fragment has no mdat box"))?;

        let video_stream_id = media
            .video_stream
            .filter(|_| !media.discard_video.load(Ordering::Acquire))
            .map(|s| s.id);
        let audio_stream_id = media
            .audio_stream
            .filter(|_| !media.discard_audio.load(Ordering::Acquire))
            .map(|s| s.id);
        let samples = flv::decode_fragment(&mdat.data, video_stream_id, audio_stream_id)?;

        *media.samples.lock().await = samples.into();
        media.nb_fragments_read.fetch_add(1, Ordering::AcqRel);

        // Prefetch the fragment after this one so its download overlaps
        // decoding and delivering the samples we just got, instead of the
        // next read_packet call starting its fetch from a cold slot (§2's
        // "concurrent prefetching engine"). A locator failure here (end of
        // stream, no matching table) just means there's nothing to
        // prefetch; the next read_packet will see the same failure.
        let next_nb_fragments_read = nb_fragments_read + 1;
        if let Ok((next_segment, next_fragment)) =
            segment_fragment_for_index(&media.bootstrap.abst, media.quality.as_deref(), is_live, next_nb_fragments_read)
        {
            let next_url = compose_fragment_url(&self.base_url, &media.url, next_segment, next_fragment, &self.query_suffix);
            media.slot.queue(next_url).await;
            *media.prefetch.lock().await = Some(next_nb_fragments_read);
        }

        Ok(())
    }

    /// Rejects byte-offset seeks and out-of-range timestamps (§4.7). For a
    /// live stream, resets every media's read cursor so the next
    /// `read_packet` re-anchors to the live head; for recorded streams,
    /// records `timestamp` for the next `read_packet` to consume.
    pub fn seek(&mut self, timestamp: i64, flags: SeekFlags) -> Result<(), DemuxError> {
        if flags.contains(SeekFlags::BYTE) {
            return Err(DemuxError::NotImplemented("byte-offset seek"));
        }
        if timestamp > self.duration {
            return Err(DemuxError::SeekOutOfRange);
        }

        if self.stream_type == StreamType::Live {
            for media in &self.medias {
                media.nb_fragments_read.store(0, Ordering::Release);
                media.ever_read.store(false, Ordering::Release);
            }
            self.seek_timestamp = None;
        } else {
            self.seek_timestamp = Some(timestamp);
        }

        Ok(())
    }

    /// Stops every worker, joins it, and drops the session's resolved state.
    pub async fn close(mut self) {
        for media in self.medias.drain(..) {
            media.slot.stop().await;
            let _ = media.worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_matches_manifest_path_case_insensitively() {
        assert!(Demuxer::probe("http://example.com/x/Manifest.F4M?hdcore=3.1").is_some());
        assert!(Demuxer::probe("http://example.com/x/video.mp4").is_none());
    }

    #[test]
    fn base_url_truncates_at_manifest_filename() {
        assert_eq!(base_url_of("http://h/x/manifest.f4m?hdcore=3.1"), "http://h/x/");
        assert_eq!(
            compose_url(&base_url_of("http://h/x/manifest.f4m?hdcore=3.1"), "rel/", "?hdcore=3.1"),
            "http://h/x/rel/?hdcore=3.1"
        );
    }

    #[test]
    fn prefetch_action_reuses_matching_in_flight_request() {
        assert_eq!(prefetch_action(Some(3), 3), PrefetchAction::UseInFlight);
    }

    #[test]
    fn prefetch_action_aborts_stale_request_for_a_different_fragment() {
        assert_eq!(prefetch_action(Some(1), 3), PrefetchAction::AbortStaleThenQueue);
    }

    #[test]
    fn prefetch_action_queues_fresh_when_nothing_was_in_flight() {
        assert_eq!(prefetch_action(None, 0), PrefetchAction::Queue);
    }
}
