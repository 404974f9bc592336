//! Bootstrap resolution (§4.5): turning manifest-level refs into resolved
//! bootstraps, and a media-ref's inline metadata/bootstrap-id reference into
//! the stream/program shell `open` hands to the host.

use std::sync::Arc;

use bytes::Bytes;
use hds_manifest::{Bootstrap, BootstrapRef, MediaRef, StreamMetadata, parse_f4f_box, parse_metadata};

use crate::error::DemuxError;
use crate::types::{Program, StreamHandle, StreamKind};
use crate::url::compose_url;

/// Streams are declared in milliseconds throughout (§4.5, §6).
const TIME_BASE_DEN: u32 = 1_000;

async fn download(client: &reqwest::Client, url: &str, cookies: &str) -> Result<(Bytes, String), DemuxError> {
    let mut request = client.get(url);
    if !cookies.is_empty() {
        request = request.header(reqwest::header::COOKIE, cookies);
    }
    let response = request.send().await?.error_for_status()?;

    let set_cookies = response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    let body = response.bytes().await?;
    Ok((body, set_cookies))
}

/// Downloads and parses the F4M manifest itself, returning its body's bytes
/// alongside the cookies the response carried (the top-level jar used only
/// for bootstrap downloads during `open`, per §5).
pub(crate) async fn download_manifest(client: &reqwest::Client, url: &str) -> Result<(Bytes, String), DemuxError> {
    download(client, url, "").await
}

/// Resolves every `<bootstrapInfo>` into a parsed bootstrap box, in manifest order.
///
/// A ref with an inline Base64 payload is parsed directly; otherwise its box
/// is downloaded from `base_url + bootstrap.url + query_suffix` (§4.8
/// forwards the manifest's own query string only when the bootstrap URL
/// carries none of its own). `cookie_jar` is replaced by each response's
/// cookies only when they are non-empty (§3).
pub(crate) async fn resolve_bootstraps(
    client: &reqwest::Client,
    base_url: &str,
    query_suffix: &str,
    refs: &[BootstrapRef],
    cookie_jar: &mut String,
) -> Result<Vec<Arc<Bootstrap>>, DemuxError> {
    let mut bootstraps = Vec::with_capacity(refs.len());

    for bootstrap_ref in refs {
        let f4f = if let Some(inline) = &bootstrap_ref.inline_box {
            parse_f4f_box(inline)?
        } else {
            let url = compose_url(base_url, bootstrap_ref.url.as_str(), query_suffix);
            let (body, cookies) = download(client, &url, cookie_jar).await?;
            if !cookies.is_empty() {
                *cookie_jar = cookies;
            }
            parse_f4f_box(&body)?
        };

        let abst = f4f
            .abst
            .ok_or_else(|| DemuxError::Manifest(hds_manifest::ManifestError::InvalidManifest("bootstrap box has no abst".to_string())))?;

        bootstraps.push(Arc::new(Bootstrap {
            id: bootstrap_ref.id.clone(),
            url: bootstrap_ref.url.clone(),
            profile: bootstrap_ref.profile.clone(),
            quality: None,
            abst,
        }));
    }

    Ok(bootstraps)
}

/// Matches `media_ref`'s `bootstrapInfoId` against `bootstraps` case-insensitively.
///
/// Falls back to index 0 when no bootstrap matches (§9's corrected behavior
/// for the source's "assign on non-match" bug: we match by id and only fall
/// back when nothing matches, rather than retaining the last non-match).
pub(crate) fn resolve_bootstrap_index(media_ref: &MediaRef, bootstraps: &[Arc<Bootstrap>]) -> usize {
    bootstraps
        .iter()
        .position(|bootstrap| bootstrap.id.as_str().eq_ignore_ascii_case(media_ref.bootstrap_info_id.as_str()))
        .unwrap_or(0)
}

/// Parses `media_ref`'s inline `onMetaData`, if present.
///
/// A parse failure is logged and treated as absent metadata (§7: metadata
/// errors don't abort `open`), leaving every field at its `channels = 1`
/// default and creating no streams for this media.
pub(crate) fn resolve_metadata(media_ref: &MediaRef) -> StreamMetadata {
    let Some(inline) = &media_ref.inline_metadata else {
        return StreamMetadata::default();
    };

    match parse_metadata(inline) {
        Ok(metadata) => metadata,
        Err(err) => {
            tracing::warn!(error = %err, "failed to parse inline onMetaData, falling back to defaults");
            StreamMetadata::default()
        }
    }
}

/// Materializes the stream/program shell for one media (§4.5): stream ids
/// `2i` (video) / `2i + 1` (audio), a millisecond time base, and a program
/// named `"<bitrate> kbit/s"` containing whichever streams exist.
pub(crate) fn build_streams(
    index: usize,
    bitrate: u32,
    metadata: &StreamMetadata,
) -> (Option<StreamHandle>, Option<StreamHandle>, Program) {
    let video_stream = metadata.video_codec.map(|codec| StreamHandle {
        id: 2 * index as u32,
        kind: StreamKind::Video { codec },
        time_base_den: TIME_BASE_DEN,
    });

    let audio_stream = metadata.audio_codec.map(|codec| StreamHandle {
        id: 2 * index as u32 + 1,
        kind: StreamKind::Audio {
            codec,
            sample_rate: metadata.audio_sample_rate.max(0) as u32,
            channels: metadata.channels.clamp(1, 2) as u8,
        },
        time_base_den: TIME_BASE_DEN,
    });

    let mut streams = Vec::new();
    if let Some(handle) = &video_stream {
        streams.push(handle.id);
    }
    if let Some(handle) = &audio_stream {
        streams.push(handle.id);
    }

    let program = Program {
        index,
        name: format!("{bitrate} kbit/s"),
        streams,
    };

    (video_stream, audio_stream, program)
}

#[cfg(test)]
mod tests {
    use hds_manifest::MediaRef;

    use super::*;

    fn bootstrap(id: &'static str) -> Arc<Bootstrap> {
        Arc::new(Bootstrap {
            id: id.into(),
            url: "".into(),
            profile: "".into(),
            quality: None,
            abst: Default::default(),
        })
    }

    #[test]
    fn bootstrap_match_is_case_insensitive() {
        let bootstraps = vec![bootstrap("Boot1"), bootstrap("Boot2")];
        let mut media_ref = MediaRef::default();
        media_ref.bootstrap_info_id = "boot2".into();
        assert_eq!(resolve_bootstrap_index(&media_ref, &bootstraps), 1);
    }

    #[test]
    fn unmatched_bootstrap_falls_back_to_zero() {
        let bootstraps = vec![bootstrap("boot1"), bootstrap("boot2")];
        let mut media_ref = MediaRef::default();
        media_ref.bootstrap_info_id = "unknown".into();
        assert_eq!(resolve_bootstrap_index(&media_ref, &bootstraps), 0);
    }

    #[test]
    fn unknown_video_codec_creates_no_video_stream() {
        let metadata = StreamMetadata::default();
        let (video, audio, program) = build_streams(0, 450, &metadata);
        assert!(video.is_none());
        assert!(audio.is_none());
        assert_eq!(program.name, "450 kbit/s");
        assert!(program.streams.is_empty());
    }

    #[test]
    fn stream_ids_follow_2i_2i_plus_1_convention() {
        let mut metadata = StreamMetadata::default();
        metadata.video_codec = Some(hds_manifest::VideoCodec::H264);
        metadata.audio_codec = Some(hds_manifest::AudioCodec::Aac);
        let (video, audio, program) = build_streams(3, 1200, &metadata);
        assert_eq!(video.unwrap().id, 6);
        assert_eq!(audio.unwrap().id, 7);
        assert_eq!(program.streams, vec![6, 7]);
    }
}
