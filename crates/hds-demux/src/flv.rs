//! Minimal legacy-FLV tag framing over a fragment's `mdat` payload.
//!
//! §1 treats "the FLV tag decoder itself" as an external collaborator; this
//! module is deliberately shallow — it reads just enough of the standard
//! 11-byte tag header (type, size, timestamp, stream id) to route a tag's
//! raw body to the right elementary stream with a timestamp. It does not
//! interpret codec-specific payload layouts (AAC/AVC packet types, Enhanced
//! RTMP multitrack framing, etc.) — the packet's `data` is the tag body
//! unmodified, per the data model in §1.

use bytes::Bytes;

use crate::error::DemuxError;
use crate::media::{SAMPLE_BUFFER_CAPACITY, Sample};

const TAG_HEADER_LEN: usize = 11;
const PREV_TAG_SIZE_LEN: usize = 4;

const TAG_TYPE_AUDIO: u8 = 8;
const TAG_TYPE_VIDEO: u8 = 9;
const TAG_TYPE_SCRIPT: u8 = 18;

/// FLV video `FrameType` nibble values that mark a decodable-without-reference frame.
const VIDEO_FRAME_TYPE_KEY: u8 = 1;
const VIDEO_FRAME_TYPE_GENERATED_KEY: u8 = 4;

/// Decodes the FLV tag stream in `data`, yielding one [`Sample`] per audio
/// or video tag.
///
/// `video_stream_id`/`audio_stream_id` being `None` drops that tag kind's
/// samples entirely (§8 scenario 5: an unresolved codec means no stream was
/// created, so its fragments' samples are discarded rather than buffered
/// with nowhere to go). Script (`onMetaData`) tags embedded in the stream
/// are skipped; the stream's metadata was already resolved once at `open`.
///
/// At most [`SAMPLE_BUFFER_CAPACITY`] samples are returned; any remainder is
/// dropped and logged (§3's bounded sample buffer).
pub(crate) fn decode_fragment(
    data: &[u8],
    video_stream_id: Option<u32>,
    audio_stream_id: Option<u32>,
) -> Result<Vec<Sample>, DemuxError> {
    let mut buf = data;
    let mut samples = Vec::new();

    while buf.len() >= TAG_HEADER_LEN {
        let tag_type = buf[0];
        let data_size = u32::from_be_bytes([0, buf[1], buf[2], buf[3]]) as usize;
        let timestamp_lo = u32::from_be_bytes([0, buf[4], buf[5], buf[6]]);
        let timestamp_ext = buf[7];
        // The FLV tag header packs an extended timestamp byte above the
        // 24-bit low part to reach a 32-bit millisecond timestamp.
        let timestamp = ((timestamp_ext as i64) << 24) | timestamp_lo as i64;

        if buf.len() < TAG_HEADER_LEN + data_size {
            return Err(DemuxError::Truncated("flv tag body"));
        }
        let payload = &buf[TAG_HEADER_LEN..TAG_HEADER_LEN + data_size];

        match tag_type {
            TAG_TYPE_VIDEO => {
                if let Some(stream_id) = video_stream_id {
                    if let Some(&first_byte) = payload.first() {
                        let frame_type = first_byte >> 4;
                        let keyframe = frame_type == VIDEO_FRAME_TYPE_KEY || frame_type == VIDEO_FRAME_TYPE_GENERATED_KEY;
                        samples.push(Sample {
                            stream_id,
                            dts: timestamp,
                            pts: timestamp,
                            data: Bytes::copy_from_slice(payload),
                            keyframe,
                        });
                    }
                }
            }
            TAG_TYPE_AUDIO => {
                if let Some(stream_id) = audio_stream_id {
                    samples.push(Sample {
                        stream_id,
                        dts: timestamp,
                        pts: timestamp,
                        data: Bytes::copy_from_slice(payload),
                        keyframe: true,
                    });
                }
            }
            TAG_TYPE_SCRIPT => {}
            _ => {}
        }

        let consumed = TAG_HEADER_LEN + data_size;
        buf = &buf[consumed..];
        if buf.len() >= PREV_TAG_SIZE_LEN {
            buf = &buf[PREV_TAG_SIZE_LEN..];
        } else {
            break;
        }
    }

    if samples.len() > SAMPLE_BUFFER_CAPACITY {
        let dropped = samples.len() - SAMPLE_BUFFER_CAPACITY;
        tracing::warn!(dropped, "fragment decoded more samples than the sample buffer holds");
        samples.truncate(SAMPLE_BUFFER_CAPACITY);
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;

    fn write_tag(buf: &mut Vec<u8>, tag_type: u8, timestamp: u32, payload: &[u8]) {
        buf.put_u8(tag_type);
        buf.put_uint(payload.len() as u64, 3);
        buf.put_uint(timestamp as u64 & 0xff_ffff, 3);
        buf.put_u8((timestamp >> 24) as u8);
        buf.put_uint(0, 3); // stream id, always 0
        buf.extend_from_slice(payload);
        buf.put_u32((TAG_HEADER_LEN + payload.len()) as u32); // previous tag size
    }

    #[test]
    fn routes_audio_and_video_tags_to_their_streams() {
        let mut data = Vec::new();
        write_tag(&mut data, TAG_TYPE_VIDEO, 100, &[0x17, 0, 0, 0, 0xaa]); // keyframe avc
        write_tag(&mut data, TAG_TYPE_AUDIO, 105, &[0xaf, 1, 0xbb]);

        let samples = decode_fragment(&data, Some(0), Some(1)).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].stream_id, 0);
        assert_eq!(samples[0].dts, 100);
        assert!(samples[0].keyframe);
        assert_eq!(samples[1].stream_id, 1);
        assert_eq!(samples[1].dts, 105);
    }

    #[test]
    fn drops_video_samples_when_no_video_stream_exists() {
        let mut data = Vec::new();
        write_tag(&mut data, TAG_TYPE_VIDEO, 100, &[0x17, 0, 0, 0, 0xaa]);
        write_tag(&mut data, TAG_TYPE_AUDIO, 100, &[0xaf, 1, 0xbb]);

        let samples = decode_fragment(&data, None, Some(1)).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].stream_id, 1);
    }

    #[test]
    fn interframe_is_not_a_keyframe() {
        let mut data = Vec::new();
        write_tag(&mut data, TAG_TYPE_VIDEO, 100, &[0x27, 0, 0, 0, 0xaa]); // inter frame
        let samples = decode_fragment(&data, Some(0), None).unwrap();
        assert!(!samples[0].keyframe);
    }

    #[test]
    fn truncated_payload_fails() {
        let mut data = Vec::new();
        data.put_u8(TAG_TYPE_VIDEO);
        data.put_uint(100, 3); // claims 100 bytes of payload
        data.put_uint(0, 4);
        data.put_uint(0, 3);
        let err = decode_fragment(&data, Some(0), None).unwrap_err();
        assert!(matches!(err, DemuxError::Truncated(_)));
    }
}
