//! F4M manifest parsing, F4F bootstrap/fragment box parsing, and the AMF0
//! `onMetaData` reader for Adobe HTTP Dynamic Streaming.
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(unreachable_pub)]

mod box_reader;
mod error;
mod f4m;
mod metadata;
mod model;

pub use box_reader::parse_f4f_box;
pub use error::ManifestError;
pub use f4m::parse_manifest;
pub use metadata::{AudioCodec, StreamMetadata, VideoCodec, parse_metadata};
pub use model::{
    Bootstrap, BootstrapBox, BootstrapRef, F4fBox, FragmentRunEntry, FragmentRunTable, MAX_FIELD_LEN, Manifest,
    MediaDataBox, MediaRef, SegmentRunEntry, SegmentRunTable, StreamType, bounded,
};
