//! Host-facing stream, program, and packet types.

use bytes::Bytes;
use hds_manifest::{AudioCodec, VideoCodec};

/// What kind of elementary stream a [`StreamHandle`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// A video elementary stream.
    Video {
        /// The codec signaled by the stream's `onMetaData`.
        codec: VideoCodec,
    },
    /// An audio elementary stream.
    Audio {
        /// The codec signaled by the stream's `onMetaData`, or by the FLV
        /// audio tag header when metadata is silent.
        codec: AudioCodec,
        /// Sample rate in Hz.
        sample_rate: u32,
        /// Channel count (1 = mono, 2 = stereo).
        channels: u8,
    },
}

/// One elementary stream the host can read packets from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHandle {
    /// Stable id, unique within a [`crate::Demuxer`] instance.
    pub id: u32,
    /// The stream's media kind.
    pub kind: StreamKind,
    /// Denominator of the time base used by this stream's timestamps; the
    /// numerator is always 1 (i.e. the time base is `1 / time_base_den`
    /// seconds).
    pub time_base_den: u32,
}

/// A group of streams that should be presented together, mirroring one
/// `<media>` entry's rendition.
#[derive(Debug, Clone)]
pub struct Program {
    /// Index of this program among the manifest's renditions.
    pub index: usize,
    /// The rendition's bitrate-derived name (e.g. `"1200k"`).
    pub name: String,
    /// Stream ids belonging to this program.
    pub streams: Vec<u32>,
}

/// One decodable access unit handed back by [`crate::Demuxer::read_packet`].
#[derive(Debug, Clone)]
pub struct Packet {
    /// The stream this packet belongs to.
    pub stream_id: u32,
    /// Decode timestamp, in the owning stream's time base.
    pub dts: i64,
    /// Presentation timestamp, in the owning stream's time base.
    pub pts: i64,
    /// Raw elementary stream data (the FLV tag body), unmodified.
    pub data: Bytes,
    /// Whether this packet can be decoded without reference to prior packets.
    pub keyframe: bool,
}

bitflags::bitflags! {
    /// Mirrors the host's `avformat_seek_file` flags; [`SeekFlags::BYTE`] is
    /// the only one [`crate::Demuxer::seek`] gives special treatment (§4.7
    /// rejects it outright, since this demuxer addresses fragments by
    /// timestamp, not by byte offset).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SeekFlags: u32 {
        /// Seek by byte offset rather than timestamp. Not implemented.
        const BYTE = 1 << 0;
        /// Seek to the nearest keyframe before the requested timestamp.
        const BACKWARD = 1 << 1;
        /// Accept any frame, not just keyframes, as the seek target.
        const ANY = 1 << 2;
    }
}
