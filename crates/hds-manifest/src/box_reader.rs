//! F4F (ISO-BMFF-like) box parsing: `abst` bootstrap info and `mdat` payload.

use bytes::{Buf, Bytes};
use scuffle_bytes_util::StringCow;

use crate::error::ManifestError;
use crate::model::{
    F4fBox, FragmentRunEntry, FragmentRunTable, MediaDataBox, SegmentRunEntry, SegmentRunTable, bounded,
};

fn need(remaining: usize, want: usize, what: &'static str) -> Result<(), ManifestError> {
    if remaining < want {
        Err(ManifestError::Truncated(what))
    } else {
        Ok(())
    }
}

/// Reads one box header (`size`, `type`) and slices out its payload.
///
/// Honors the ISO-BMFF `size == 1` (64-bit extended size follows) and
/// `size == 0` (box runs to the end of the buffer) conventions.
fn read_box(buf: &mut Bytes) -> Result<([u8; 4], Bytes), ManifestError> {
    need(buf.remaining(), 8, "box header")?;
    let declared_size = buf.get_u32() as u64;
    let mut box_type = [0u8; 4];
    buf.copy_to_slice(&mut box_type);

    let mut header_len = 8u64;
    let size = if declared_size == 1 {
        need(buf.remaining(), 8, "box extended size")?;
        header_len = 16;
        buf.get_u64()
    } else if declared_size == 0 {
        header_len + buf.remaining() as u64
    } else {
        declared_size
    };

    let payload_len = size.checked_sub(header_len).ok_or(ManifestError::Truncated("box size smaller than header"))?;
    if payload_len > buf.remaining() as u64 {
        return Err(ManifestError::OutOfMemory {
            declared: payload_len,
            remaining: buf.remaining() as u64,
        });
    }

    let payload = buf.copy_to_bytes(payload_len as usize);
    Ok((box_type, payload))
}

fn read_u8(buf: &mut Bytes) -> Result<u8, ManifestError> {
    need(buf.remaining(), 1, "u8 field")?;
    Ok(buf.get_u8())
}

fn read_u32(buf: &mut Bytes) -> Result<u32, ManifestError> {
    need(buf.remaining(), 4, "u32 field")?;
    Ok(buf.get_u32())
}

fn read_u64(buf: &mut Bytes) -> Result<u64, ManifestError> {
    need(buf.remaining(), 8, "u64 field")?;
    Ok(buf.get_u64())
}

/// Reads a NUL-terminated UTF-8 string, consuming the terminator.
fn read_cstring(buf: &mut Bytes) -> Result<StringCow<'static>, ManifestError> {
    let bytes = buf.chunk();
    let nul = bytes.iter().position(|&b| b == 0);
    let Some(nul) = nul else {
        return Err(ManifestError::Truncated("unterminated string field"));
    };
    let s = String::from_utf8_lossy(&bytes[..nul]).into_owned();
    buf.advance(nul + 1);
    Ok(bounded(&s))
}

fn skip_box_header_version(buf: &mut Bytes) -> Result<(), ManifestError> {
    // full-box header: 1 byte version + 3 bytes flags
    need(buf.remaining(), 4, "full box version/flags")?;
    buf.advance(4);
    Ok(())
}

fn parse_segment_run_table(mut payload: Bytes) -> Result<SegmentRunTable, ManifestError> {
    skip_box_header_version(&mut payload)?;

    let quality_count = read_u8(&mut payload)?;
    let mut quality_entries = Vec::with_capacity(quality_count as usize);
    for _ in 0..quality_count {
        quality_entries.push(read_cstring(&mut payload)?);
    }

    let entry_count = read_u32(&mut payload)?;
    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let first_segment = read_u32(&mut payload)?;
        let fragments_per_segment = read_u32(&mut payload)?;
        entries.push(SegmentRunEntry {
            first_segment,
            fragments_per_segment,
        });
    }

    Ok(SegmentRunTable { quality_entries, entries })
}

fn parse_fragment_run_table(mut payload: Bytes) -> Result<FragmentRunTable, ManifestError> {
    skip_box_header_version(&mut payload)?;

    let _timescale = read_u32(&mut payload)?;

    let quality_count = read_u8(&mut payload)?;
    let mut quality_entries = Vec::with_capacity(quality_count as usize);
    for _ in 0..quality_count {
        quality_entries.push(read_cstring(&mut payload)?);
    }

    let entry_count = read_u32(&mut payload)?;
    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let first_fragment = read_u32(&mut payload)?;
        let first_fragment_time_stamp = read_u64(&mut payload)?;
        let fragment_duration = read_u32(&mut payload)? as u64;
        if fragment_duration == 0 {
            // a discontinuity indicator byte follows when the duration is zero
            let _discontinuity = read_u8(&mut payload)?;
        }
        entries.push(FragmentRunEntry {
            first_fragment,
            first_fragment_time_stamp,
            fragment_duration,
        });
    }

    Ok(FragmentRunTable { quality_entries, entries })
}

fn parse_abst(mut payload: Bytes) -> Result<crate::model::BootstrapBox, ManifestError> {
    skip_box_header_version(&mut payload)?;

    let _bootstrap_info_version = read_u32(&mut payload)?;
    let profile_live_update = read_u8(&mut payload)?;
    let is_live = (profile_live_update >> 5) & 0x1 != 0;

    let _timescale = read_u32(&mut payload)?;
    let current_media_time = read_u64(&mut payload)?;
    let _smpte_timecode_offset = read_u64(&mut payload)?;
    let _movie_identifier = read_cstring(&mut payload)?;

    let server_entry_count = read_u8(&mut payload)?;
    for _ in 0..server_entry_count {
        read_cstring(&mut payload)?;
    }

    let quality_entry_count = read_u8(&mut payload)?;
    for _ in 0..quality_entry_count {
        read_cstring(&mut payload)?;
    }

    let _drm_data = read_cstring(&mut payload)?;
    let _metadata = read_cstring(&mut payload)?;

    let segment_run_table_count = read_u8(&mut payload)?;
    let mut segment_run_tables = Vec::with_capacity(segment_run_table_count as usize);
    for _ in 0..segment_run_table_count {
        let (box_type, box_payload) = read_box(&mut payload)?;
        if &box_type != b"asrt" {
            return Err(ManifestError::InvalidManifest(format!(
                "expected asrt child box, got {}",
                String::from_utf8_lossy(&box_type)
            )));
        }
        segment_run_tables.push(parse_segment_run_table(box_payload)?);
    }

    let fragment_run_table_count = read_u8(&mut payload)?;
    let mut fragment_run_tables = Vec::with_capacity(fragment_run_table_count as usize);
    for _ in 0..fragment_run_table_count {
        let (box_type, box_payload) = read_box(&mut payload)?;
        if &box_type != b"afrt" {
            return Err(ManifestError::InvalidManifest(format!(
                "expected afrt child box, got {}",
                String::from_utf8_lossy(&box_type)
            )));
        }
        fragment_run_tables.push(parse_fragment_run_table(box_payload)?);
    }

    Ok(crate::model::BootstrapBox {
        current_media_time,
        is_live,
        segment_run_tables,
        fragment_run_tables,
    })
}

/// Parses the top-level box sequence of an F4F byte range, recognizing only
/// `abst` and `mdat` and skipping any other box by its declared size.
pub fn parse_f4f_box(data: &[u8]) -> Result<F4fBox, ManifestError> {
    let mut buf = Bytes::copy_from_slice(data);
    let mut result = F4fBox::default();

    while buf.has_remaining() {
        let (box_type, payload) = read_box(&mut buf)?;
        match &box_type {
            b"abst" => result.abst = Some(parse_abst(payload)?),
            b"mdat" => result.mdat = Some(MediaDataBox { data: payload }),
            _ => {}
        }
    }

    Ok(result)
}
