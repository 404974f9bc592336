//! AMF0 `onMetaData` routing into a [`StreamMetadata`] record.

use scuffle_amf0::{Amf0Decoder, Amf0Value};

use crate::error::ManifestError;

/// Audio codec identified from `onMetaData`'s `audiocodecid` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    /// 8-bit or 16-bit native-endian PCM, chosen by `audiosamplesize`.
    Pcm,
    /// SWF ADPCM.
    AdpcmSwf,
    /// MP3, with the "needs parsing" hint set.
    Mp3,
    /// 8-bit or 16-bit little-endian PCM, chosen by `audiosamplesize`.
    PcmLe,
    /// Nellymoser, any sample rate.
    Nellymoser,
    /// A-law PCM, 8 kHz.
    PcmAlaw,
    /// mu-law PCM, 8 kHz.
    PcmMulaw,
    /// AAC.
    Aac,
    /// Speex, 16 kHz.
    Speex,
}

/// Video codec identified from `onMetaData`'s `videocodecid` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// H.264 / AVC.
    H264,
}

/// Stream properties routed out of `onMetaData`.
///
/// Preconditioned with `channels = 1`, matching the host's default before
/// an `audiochannels`/`stereo` property (if any) overrides it.
#[derive(Debug, Clone)]
pub struct StreamMetadata {
    /// `width` property, pixels.
    pub width: i32,
    /// `height` property, pixels.
    pub height: i32,
    /// `framerate` property.
    pub frame_rate: i32,
    /// `videodatarate` property, kbit/s.
    pub video_data_rate: i32,
    /// `audiosamplerate` property, Hz.
    pub audio_sample_rate: i32,
    /// `audiosamplesize` property, bits.
    pub audio_sample_size: i32,
    /// `audiochannels`/`stereo` property.
    pub channels: i32,
    /// `audiodatarate` property, kbit/s.
    pub audio_data_rate: i32,
    /// Audio codec, if `audiocodecid` resolved to a known value.
    pub audio_codec: Option<AudioCodec>,
    /// Whether the audio stream needs a bitstream parser ahead of decode (MP3).
    pub audio_needs_parsing: bool,
    /// Video codec, if `videocodecid` resolved to a known value.
    pub video_codec: Option<VideoCodec>,
}

impl Default for StreamMetadata {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            frame_rate: 0,
            video_data_rate: 0,
            audio_sample_rate: 0,
            audio_sample_size: 0,
            channels: 1,
            audio_data_rate: 0,
            audio_codec: None,
            audio_needs_parsing: false,
            video_codec: None,
        }
    }
}

/// Parses an `onMetaData` AMF0 payload (as embedded inline in a manifest, or
/// as a `scriptdata` FLV tag) into a [`StreamMetadata`] record.
///
/// Fails with [`ManifestError::MalformedMetadata`] if the document does not
/// open with a string value equal (case-insensitively) to `onMetaData`.
pub fn parse_metadata(data: &[u8]) -> Result<StreamMetadata, ManifestError> {
    let mut decoder = Amf0Decoder::new(data);

    let sentinel = decoder.decode_value()?;
    let Amf0Value::String(name) = &sentinel else {
        return Err(ManifestError::MalformedMetadata(format!("expected onMetaData string, got {sentinel:?}")));
    };
    if !name.as_str().eq_ignore_ascii_case("onMetaData") {
        return Err(ManifestError::MalformedMetadata(format!("expected onMetaData, got {name}")));
    }

    let mut metadata = StreamMetadata::default();
    if decoder.has_remaining() {
        let value = decoder.decode_value()?;
        route_value(&mut metadata, "", &value);
    }
    Ok(metadata)
}

fn route_value(metadata: &mut StreamMetadata, name: &str, value: &Amf0Value<'_>) {
    match value {
        Amf0Value::Number(n) => assign_number(metadata, name, *n),
        Amf0Value::Boolean(b) => assign_number(metadata, name, if *b { 1.0 } else { 0.0 }),
        Amf0Value::String(s) => assign_string(metadata, name, s.as_str()),
        Amf0Value::Object(entries) => {
            for (key, value) in entries.iter() {
                route_value(metadata, key.as_str(), value);
            }
        }
        Amf0Value::Array(values) => {
            for value in values.iter() {
                route_value(metadata, "", value);
            }
        }
        Amf0Value::Null => {}
    }
}

/// FLV audio `SoundFormat` nibble, shifted into the low bits (the byte layout
/// in the FLV tag header stores it in the top 4 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
enum FlvAudioCodecId {
    Pcm = 0,
    AdpcmSwf = 1,
    Mp3 = 2,
    PcmLe = 3,
    Nellymoser16kHzMono = 4,
    Nellymoser8kHzMono = 5,
    Nellymoser = 6,
    PcmAlaw = 7,
    PcmMulaw = 8,
    Aac = 10,
    Speex = 11,
}

impl FlvAudioCodecId {
    fn from_bitfield(masked: i32) -> Option<Self> {
        Some(match masked {
            0 => Self::Pcm,
            1 => Self::AdpcmSwf,
            2 => Self::Mp3,
            3 => Self::PcmLe,
            4 => Self::Nellymoser16kHzMono,
            5 => Self::Nellymoser8kHzMono,
            6 => Self::Nellymoser,
            7 => Self::PcmAlaw,
            8 => Self::PcmMulaw,
            10 => Self::Aac,
            11 => Self::Speex,
            _ => return None,
        })
    }
}

fn assign_number(metadata: &mut StreamMetadata, name: &str, value: f64) {
    if name.eq_ignore_ascii_case("width") {
        metadata.width = value as i32;
    } else if name.eq_ignore_ascii_case("height") {
        metadata.height = value as i32;
    } else if name.eq_ignore_ascii_case("framerate") {
        metadata.frame_rate = value as i32;
    } else if name.eq_ignore_ascii_case("videodatarate") {
        metadata.video_data_rate = value as i32;
    } else if name.eq_ignore_ascii_case("audiosamplerate") {
        metadata.audio_sample_rate = value as i32;
    } else if name.eq_ignore_ascii_case("audiosamplesize") {
        metadata.audio_sample_size = value as i32;
    } else if name.eq_ignore_ascii_case("audiochannels") {
        metadata.channels = value as i32;
    } else if name.eq_ignore_ascii_case("stereo") {
        metadata.channels = if value != 0.0 { 2 } else { 1 };
    } else if name.eq_ignore_ascii_case("audiodatarate") {
        metadata.audio_data_rate = value as i32;
    } else if name.eq_ignore_ascii_case("audiocodecid") {
        // FLV_AUDIO_CODECID_OFFSET = 4, FLV_AUDIO_CODECID_MASK = 0xf0: the FLV tag
        // header packs the codec id into the top nibble of a byte.
        let masked = (0xf0 & ((value as i32) << 4)) >> 4;
        if let Some(codec) = FlvAudioCodecId::from_bitfield(masked) {
            apply_audio_codec(metadata, codec);
        }
    } else if name.eq_ignore_ascii_case("videocodecid") && value as i32 == 7 {
        metadata.video_codec = Some(VideoCodec::H264);
    }
}

fn apply_audio_codec(metadata: &mut StreamMetadata, codec: FlvAudioCodecId) {
    match codec {
        FlvAudioCodecId::Pcm => {
            metadata.audio_codec = Some(AudioCodec::Pcm);
        }
        FlvAudioCodecId::AdpcmSwf => {
            metadata.audio_codec = Some(AudioCodec::AdpcmSwf);
        }
        FlvAudioCodecId::Mp3 => {
            metadata.audio_needs_parsing = true;
            metadata.audio_codec = Some(AudioCodec::Mp3);
        }
        FlvAudioCodecId::PcmLe => {
            metadata.audio_codec = Some(AudioCodec::PcmLe);
        }
        FlvAudioCodecId::Nellymoser16kHzMono => {
            if metadata.audio_sample_rate == 0 {
                metadata.audio_sample_rate = 16_000;
            }
            metadata.channels = 1;
            metadata.audio_codec = Some(AudioCodec::Nellymoser);
        }
        FlvAudioCodecId::Nellymoser8kHzMono => {
            if metadata.audio_sample_rate == 0 {
                metadata.audio_sample_rate = 8_000;
            }
            metadata.channels = 1;
            metadata.audio_codec = Some(AudioCodec::Nellymoser);
        }
        FlvAudioCodecId::Nellymoser => {
            metadata.audio_codec = Some(AudioCodec::Nellymoser);
        }
        FlvAudioCodecId::PcmAlaw => {
            metadata.audio_sample_rate = 8_000;
            metadata.audio_codec = Some(AudioCodec::PcmAlaw);
        }
        FlvAudioCodecId::PcmMulaw => {
            metadata.audio_sample_rate = 8_000;
            metadata.audio_codec = Some(AudioCodec::PcmMulaw);
        }
        FlvAudioCodecId::Aac => {
            metadata.audio_codec = Some(AudioCodec::Aac);
        }
        FlvAudioCodecId::Speex => {
            metadata.audio_sample_rate = 16_000;
            metadata.audio_codec = Some(AudioCodec::Speex);
        }
    }
}

fn assign_string(metadata: &mut StreamMetadata, name: &str, value: &str) {
    if name.eq_ignore_ascii_case("audiocodecid") {
        if value.eq_ignore_ascii_case("mp4a") {
            metadata.audio_codec = Some(AudioCodec::Aac);
        } else if value.eq_ignore_ascii_case(".mp3") {
            metadata.audio_needs_parsing = true;
            metadata.audio_codec = Some(AudioCodec::Mp3);
        } else {
            tracing::debug!(codec = value, "unhandled string audiocodecid");
        }
    } else if name.eq_ignore_ascii_case("videocodecid") {
        if value.eq_ignore_ascii_case("avc1") {
            metadata.video_codec = Some(VideoCodec::H264);
        } else {
            tracing::debug!(codec = value, "unhandled string videocodecid");
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use bytes::BufMut;

    use super::*;

    fn amf_string(buf: &mut Vec<u8>, s: &str) {
        buf.put_u8(0x02);
        buf.put_u16(s.len() as u16);
        buf.extend_from_slice(s.as_bytes());
    }

    fn amf_key(buf: &mut Vec<u8>, s: &str) {
        buf.put_u16(s.len() as u16);
        buf.extend_from_slice(s.as_bytes());
    }

    fn amf_number(buf: &mut Vec<u8>, n: f64) {
        buf.put_u8(0x00);
        buf.put_f64(n);
    }

    fn build_metadata(props: &[(&str, TestValue)]) -> Vec<u8> {
        let mut buf = Vec::new();
        amf_string(&mut buf, "onMetaData");
        buf.put_u8(0x08); // ECMA array (MixedArray)
        buf.put_u32(props.len() as u32);
        for (key, value) in props {
            amf_key(&mut buf, key);
            match value {
                TestValue::Number(n) => amf_number(&mut buf, *n),
                TestValue::Str(s) => amf_string(&mut buf, s),
            }
        }
        buf.put_u8(0x09); // optional object end marker, consumed if present
        buf
    }

    enum TestValue {
        Number(f64),
        Str(&'static str),
    }

    #[test]
    fn rejects_missing_sentinel() {
        let mut buf = Vec::new();
        amf_string(&mut buf, "notMetaData");
        let err = parse_metadata(&buf).unwrap_err();
        assert!(matches!(err, ManifestError::MalformedMetadata(_)));
    }

    #[test]
    fn truncated_blob_fails_cleanly_instead_of_panicking() {
        let mut buf = Vec::new();
        amf_string(&mut buf, "onMetaData");
        buf.put_u8(0x00); // number marker with no following 8-byte payload
        let err = parse_metadata(&buf).unwrap_err();
        assert!(matches!(err, ManifestError::Amf0(scuffle_amf0::Amf0Error::Truncated { .. })));
    }

    #[test]
    fn truncated_sentinel_string_fails_cleanly() {
        let mut buf = Vec::new();
        buf.put_u8(0x02); // string marker
        buf.put_u16(10); // claims a 10-byte string
        buf.extend_from_slice(b"short"); // only 5 bytes follow
        let err = parse_metadata(&buf).unwrap_err();
        assert!(matches!(err, ManifestError::Amf0(scuffle_amf0::Amf0Error::Truncated { .. })));
    }

    #[test]
    fn routes_known_numeric_properties() {
        let buf = build_metadata(&[
            ("width", TestValue::Number(1280.0)),
            ("height", TestValue::Number(720.0)),
            ("videocodecid", TestValue::Number(7.0)),
            ("audiocodecid", TestValue::Number(10.0)),
        ]);
        let metadata = parse_metadata(&buf).unwrap();
        assert_eq!(metadata.width, 1280);
        assert_eq!(metadata.height, 720);
        assert_eq!(metadata.video_codec, Some(VideoCodec::H264));
        assert_eq!(metadata.audio_codec, Some(AudioCodec::Aac));
    }

    #[test]
    fn unknown_video_codec_leaves_no_stream() {
        let buf = build_metadata(&[("videocodecid", TestValue::Number(5.0))]);
        let metadata = parse_metadata(&buf).unwrap();
        assert_eq!(metadata.video_codec, None);
    }

    #[test]
    fn string_codec_ids() {
        let buf = build_metadata(&[("audiocodecid", TestValue::Str("mp4a")), ("videocodecid", TestValue::Str("avc1"))]);
        let metadata = parse_metadata(&buf).unwrap();
        assert_eq!(metadata.audio_codec, Some(AudioCodec::Aac));
        assert_eq!(metadata.video_codec, Some(VideoCodec::H264));
    }

    #[test]
    fn unknown_property_is_ignored() {
        let buf = build_metadata(&[("width", TestValue::Number(42.0)), ("bogusproperty", TestValue::Number(1.0))]);
        let metadata = parse_metadata(&buf).unwrap();
        assert_eq!(metadata.width, 42);
        assert_eq!(metadata.channels, 1);
    }

    #[test]
    fn stereo_sets_two_channels() {
        let buf = build_metadata(&[("stereo", TestValue::Number(1.0))]);
        let metadata = parse_metadata(&buf).unwrap();
        assert_eq!(metadata.channels, 2);
    }

    #[test]
    fn nellymoser_defaults_sample_rate() {
        let buf = build_metadata(&[("audiocodecid", TestValue::Number(5.0))]);
        let metadata = parse_metadata(&buf).unwrap();
        assert_eq!(metadata.audio_codec, Some(AudioCodec::Nellymoser));
        assert_eq!(metadata.audio_sample_rate, 8_000);
    }
}
