//! Fragment scheduling, download, and FLV demuxing for Adobe HTTP Dynamic
//! Streaming: the concurrent prefetching engine and packet pipeline layered
//! on top of `hds-manifest`'s manifest/bootstrap model.
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(unreachable_pub)]

mod demuxer;
mod error;
mod flv;
mod locator;
mod media;
mod metrics;
mod resolver;
mod slot;
mod types;
mod url;
mod worker;

pub use demuxer::Demuxer;
pub use error::DemuxError;
pub use types::{Packet, Program, SeekFlags, StreamHandle, StreamKind};
pub use url::MAX_URL_SIZE;
