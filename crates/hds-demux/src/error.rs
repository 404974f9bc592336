//! Error types for bootstrap resolution, fragment location, and download.

/// Errors produced while resolving a stream, locating a fragment, or
/// demuxing its payload.
#[derive(thiserror::Error, Debug)]
pub enum DemuxError {
    /// The manifest or bootstrap box could not be parsed.
    #[error("manifest error: {0}")]
    Manifest(#[from] hds_manifest::ManifestError),
    /// A download failed after exhausting its retry budget, or resolved to
    /// an empty buffer.
    #[error("download failed after retries: {0}")]
    NetworkFailure(String),
    /// No segment or fragment run table entry covers the requested index;
    /// for a recorded stream this means playback has reached the end.
    #[error("end of stream")]
    EndOfStream,
    /// No run table matches the requested quality at all.
    #[error("bootstrap does not cover the requested quality")]
    BootstrapIncomplete,
    /// No media in the manifest matched the requested bootstrap id or quality.
    #[error("no media found for bootstrap {0:?}")]
    NoSuchMedia(String),
    /// No enabled media could be selected for the next `read_packet` call.
    #[error("no enabled media available")]
    NoMediaAvailable,
    /// A composed URL would have exceeded the maximum request URL size.
    #[error("composed url exceeds the maximum size")]
    UrlTooLong,
    /// A seek requested a timestamp past the stream's reported duration.
    #[error("seek timestamp exceeds stream duration")]
    SeekOutOfRange,
    /// The fragment's box stream ended before a complete `mdat` was read.
    #[error("truncated fragment: {0}")]
    Truncated(&'static str),
    /// A feature described by the wire format is not implemented by this client.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    /// Underlying I/O failure (box reader, FLV tag framing).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DemuxError {
    fn from(err: reqwest::Error) -> Self {
        DemuxError::NetworkFailure(err.to_string())
    }
}
