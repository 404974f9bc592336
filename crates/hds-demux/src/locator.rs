//! Fragment addressing: mapping a timestamp or a read cursor to a
//! `Seg{segment}-Frag{fragment}` pair.
//!
//! Both passes below share one notion of "span" for a run table's last
//! entry: the `fragments_per_segment` of the matching segment run table's
//! own last entry, *minus* however many fragments earlier entries in the
//! same fragment run table already accounted for. A fragment run entry's
//! span is the gap to the next entry's `first_fragment`, or that remaining
//! segment span if it's the last entry in its table.

use hds_manifest::{BootstrapBox, FragmentRunEntry, FragmentRunTable, SegmentRunTable};

use crate::error::DemuxError;

fn table_matches(quality_entries: &[scuffle_bytes_util::StringCow<'static>], quality: Option<&str>) -> bool {
    let Some(quality) = quality else {
        return true;
    };
    quality_entries.is_empty() || quality_entries.iter().any(|tag| tag.as_ref() == quality)
}

fn matching_segment_table<'a>(abst: &'a BootstrapBox, quality: Option<&str>) -> Option<&'a SegmentRunTable> {
    abst.segment_run_tables.iter().find(|t| table_matches(&t.quality_entries, quality))
}

fn matching_fragment_table<'a>(abst: &'a BootstrapBox, quality: Option<&str>) -> Option<&'a FragmentRunTable> {
    abst.fragment_run_tables.iter().find(|t| table_matches(&t.quality_entries, quality))
}

/// The matching segment run table's last entry's fragment count, used as
/// the open-ended span for a fragment run table's own last entry.
fn segment_span(table: &SegmentRunTable) -> u32 {
    table.entries.last().map(|e| e.fragments_per_segment).unwrap_or(0)
}

/// The number of fragments each entry in `entries` covers: the distance to
/// the next entry's `first_fragment`, or for the table's last entry, the
/// remaining segment span after subtracting every earlier entry's span
/// (`hdsdec.c` decrements `fragments_max -= fragcount` as it walks; the last
/// entry's run is what's left over, not the whole segment span again).
fn entry_spans(entries: &[FragmentRunEntry], segment_span: u32) -> Vec<u64> {
    let mut spans = Vec::with_capacity(entries.len());
    let mut consumed: u64 = 0;
    for (index, entry) in entries.iter().enumerate() {
        let span = match entries.get(index + 1) {
            Some(next) => (next.first_fragment - entry.first_fragment) as u64,
            None => (segment_span as u64).saturating_sub(consumed),
        };
        consumed += span;
        spans.push(span);
    }
    spans
}

/// Returns the absolute fragment number (relative to its table's
/// `first_fragment` baseline) that contains `timestamp`.
pub(crate) fn fragment_for_timestamp(abst: &BootstrapBox, quality: Option<&str>, timestamp: u64) -> Result<u32, DemuxError> {
    let segment_table = matching_segment_table(abst, quality).ok_or(DemuxError::BootstrapIncomplete)?;
    let span = segment_span(segment_table);

    let fragment_table = matching_fragment_table(abst, quality).ok_or(DemuxError::BootstrapIncomplete)?;
    let entries = &fragment_table.entries;
    let spans = entry_spans(entries, span);

    for (index, entry) in entries.iter().enumerate() {
        if entry.fragment_duration == 0 {
            continue;
        }
        let run = spans[index];
        let end = entry.first_fragment_time_stamp + run * entry.fragment_duration;
        if timestamp >= entry.first_fragment_time_stamp && timestamp <= end {
            let delta = (timestamp - entry.first_fragment_time_stamp) / entry.fragment_duration;
            return Ok(entry.first_fragment + delta as u32);
        }
    }

    Err(DemuxError::EndOfStream)
}

/// Converts an absolute fragment number into the zero-based count this
/// module's `nb_fragments_read` convention expects, assuming a table's
/// first entry starts at fragment 1 (true for every bootstrap this client
/// has seen). Used both to anchor a live read at the live head and to seek
/// a recorded stream to a timestamp.
pub(crate) fn fragments_read_for_fragment(fragment: u32) -> u32 {
    fragment.max(1) - 1
}

/// Resolves `(segment, fragment)` for the `nb_fragments_read`'th fragment
/// this [`crate::bootstrap::ResolvedMedia`] has yet to read.
///
/// A live stream always reads from segment 1 at its current read cursor,
/// since the live edge has no fixed run table to walk. A recorded stream
/// walks its run tables, consuming `nb_fragments_read` as a skip count from
/// each table's first entry.
pub(crate) fn segment_fragment_for_index(
    abst: &BootstrapBox,
    quality: Option<&str>,
    is_live: bool,
    nb_fragments_read: u32,
) -> Result<(u32, u32), DemuxError> {
    if is_live {
        return Ok((1, nb_fragments_read));
    }

    let segment_table = matching_segment_table(abst, quality).ok_or(DemuxError::BootstrapIncomplete)?;
    let mut segment = None;
    let mut skip = nb_fragments_read;
    for entry in &segment_table.entries {
        if entry.fragments_per_segment > skip {
            segment = Some(entry.first_segment);
            break;
        }
        skip -= entry.fragments_per_segment;
    }
    let segment = segment.ok_or(DemuxError::EndOfStream)?;

    let span = segment_span(segment_table);
    let fragment_table = matching_fragment_table(abst, quality).ok_or(DemuxError::BootstrapIncomplete)?;
    let entries = &fragment_table.entries;
    let spans = entry_spans(entries, span);

    let mut skip = nb_fragments_read;
    for (index, entry) in entries.iter().enumerate() {
        let run = spans[index] as u32;
        if run > skip {
            return Ok((segment, entry.first_fragment + skip));
        }
        skip -= run;
    }

    Err(DemuxError::EndOfStream)
}

#[cfg(test)]
mod tests {
    use hds_manifest::{FragmentRunEntry, SegmentRunEntry};

    use super::*;

    fn single_rendition_bootstrap() -> BootstrapBox {
        BootstrapBox {
            current_media_time: 25_000,
            is_live: false,
            segment_run_tables: vec![SegmentRunTable {
                quality_entries: vec![],
                entries: vec![SegmentRunEntry {
                    first_segment: 1,
                    fragments_per_segment: 3,
                }],
            }],
            fragment_run_tables: vec![FragmentRunTable {
                quality_entries: vec![],
                entries: vec![FragmentRunEntry {
                    first_fragment: 1,
                    first_fragment_time_stamp: 0,
                    fragment_duration: 10_000,
                }],
            }],
        }
    }

    #[test]
    fn sequential_reads_walk_one_segment_then_end() {
        let abst = single_rendition_bootstrap();
        let mut seen = Vec::new();
        for nb_read in 0..4 {
            match segment_fragment_for_index(&abst, None, false, nb_read) {
                Ok(pair) => seen.push(pair),
                Err(DemuxError::EndOfStream) => break,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(seen, vec![(1, 1), (1, 2), (1, 3)]);
    }

    #[test]
    fn seek_to_mid_stream_lands_on_expected_fragment() {
        let abst = single_rendition_bootstrap();
        let absolute = fragment_for_timestamp(&abst, None, 15_000).unwrap();
        assert_eq!(absolute, 2);

        let nb_fragments_read = fragments_read_for_fragment(absolute);
        let (segment, fragment) = segment_fragment_for_index(&abst, None, false, nb_fragments_read).unwrap();
        assert_eq!((segment, fragment), (1, 2));
    }

    #[test]
    fn live_anchor_skips_table_walk_entirely() {
        let abst = single_rendition_bootstrap();
        let absolute = fragment_for_timestamp(&abst, None, 25_000).unwrap();
        assert_eq!(absolute, 3);

        let nb_fragments_read = fragments_read_for_fragment(absolute);
        let (segment, fragment) = segment_fragment_for_index(&abst, None, true, nb_fragments_read).unwrap();
        assert_eq!((segment, fragment), (1, 2));
    }

    #[test]
    fn multi_entry_afrt_ends_at_remaining_segment_span_not_full_span() {
        // Segment run table says 5 fragments total. Fragment run table has
        // two entries: the first covers fragments 1-2 (span from its
        // `first_fragment` to the next entry's), the second starts at
        // fragment 3 and, being last, must cover only the *remaining* span
        // (5 - 2 = 3 fragments: 3, 4, 5), not the full segment span of 5.
        let abst = BootstrapBox {
            current_media_time: 0,
            is_live: false,
            segment_run_tables: vec![SegmentRunTable {
                quality_entries: vec![],
                entries: vec![SegmentRunEntry {
                    first_segment: 1,
                    fragments_per_segment: 5,
                }],
            }],
            fragment_run_tables: vec![FragmentRunTable {
                quality_entries: vec![],
                entries: vec![
                    FragmentRunEntry {
                        first_fragment: 1,
                        first_fragment_time_stamp: 0,
                        fragment_duration: 10_000,
                    },
                    FragmentRunEntry {
                        first_fragment: 3,
                        first_fragment_time_stamp: 20_000,
                        fragment_duration: 10_000,
                    },
                ],
            }],
        };

        // nb_fragments_read=6 would be the 7th fragment; only 5 exist.
        assert!(matches!(
            segment_fragment_for_index(&abst, None, false, 6),
            Err(DemuxError::EndOfStream)
        ));
        // The 5th fragment (nb_fragments_read=4) is still in range.
        assert_eq!(segment_fragment_for_index(&abst, None, false, 4).unwrap(), (1, 5));

        // A timestamp past the real end of the second entry's window
        // (20_000 + 3*10_000 = 50_000) must not resolve.
        assert!(matches!(fragment_for_timestamp(&abst, None, 55_000), Err(DemuxError::EndOfStream)));
        assert_eq!(fragment_for_timestamp(&abst, None, 49_999).unwrap(), 5);
    }

    #[test]
    fn quality_tagged_tables_use_any_match_semantics() {
        let mut abst = single_rendition_bootstrap();
        abst.segment_run_tables[0].quality_entries = vec!["high".into()];
        abst.fragment_run_tables[0].quality_entries = vec!["high".into()];

        assert!(matches!(
            segment_fragment_for_index(&abst, Some("low"), false, 0),
            Err(DemuxError::BootstrapIncomplete)
        ));
        assert_eq!(segment_fragment_for_index(&abst, Some("high"), false, 0).unwrap(), (1, 1));
        assert_eq!(segment_fragment_for_index(&abst, None, false, 0).unwrap(), (1, 1));
    }
}
