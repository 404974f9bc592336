//! Error types for manifest, bootstrap box, and metadata parsing.

/// Errors produced while parsing an F4M manifest, an F4F box, or AMF0 metadata.
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    /// Input buffer exhausted before a structure was complete.
    #[error("truncated input: {0}")]
    Truncated(&'static str),
    /// An AMF0 value did not match the expected shape, or the `onMetaData`
    /// sentinel was missing.
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),
    /// The XML root was not `manifest`, or mandatory content was missing.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    /// A box declared a size that does not fit in the remaining buffer.
    #[error("out of memory: box declared size {declared} exceeds remaining {remaining} bytes")]
    OutOfMemory {
        /// Declared box size in bytes.
        declared: u64,
        /// Bytes actually remaining in the buffer.
        remaining: u64,
    },
    /// Base64 decoding of an inline manifest payload failed.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The underlying AMF0 decoder failed.
    #[error("amf0 error: {0}")]
    Amf0(#[from] scuffle_amf0::Amf0Error),
    /// The XML reader failed.
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
}
