//! A utility crate for working with bytes.
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(unsafe_code)]
#![deny(unreachable_pub)]

mod cow;
mod zero_copy;

pub use cow::{BytesCow, StringCow};
pub use zero_copy::{BytesBuf, IoRead, Slice, ZeroCopyReader};
