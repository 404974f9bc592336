//! In-memory representation of an F4M manifest and a resolved F4F bootstrap box.

use scuffle_bytes_util::StringCow;

/// Upper bound on any id/url/profile field copied out of a manifest or box.
///
/// The original source uses fixed-size stack buffers for these fields;
/// silent truncation at this bound is the specified behavior (it exists to
/// cap memory use against a hostile manifest, not to avoid a buffer
/// overflow — growable `String`s can't overflow).
pub const MAX_FIELD_LEN: usize = 256;

/// Truncates `s` to at most [`MAX_FIELD_LEN`] bytes, respecting UTF-8 char boundaries.
pub fn bounded(s: &str) -> StringCow<'static> {
    if s.len() <= MAX_FIELD_LEN {
        return StringCow::from_string(s.to_owned());
    }

    let mut end = MAX_FIELD_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    StringCow::from_string(s[..end].to_owned())
}

/// Whether a manifest describes a live stream or a recorded (VOD) one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamType {
    /// Fragments beyond the live head are not yet available.
    Live,
    /// The full fragment range is available up front.
    #[default]
    Recorded,
}

impl StreamType {
    fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("live") { StreamType::Live } else { StreamType::Recorded }
    }
}

/// A manifest as parsed from F4M XML, before bootstrap resolution.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// The `<id>` element's text, if present.
    pub id: StringCow<'static>,
    /// The `<streamType>` element's value.
    pub stream_type: StreamType,
    /// The `<duration>` element, in the host's time base (milliseconds here).
    pub duration: i64,
    /// `<bootstrapInfo>` children, in document order.
    pub bootstraps: Vec<BootstrapRef>,
    /// `<media>` children, in document order.
    pub media: Vec<MediaRef>,
}

impl Manifest {
    pub(crate) fn set_element(&mut self, name: &str, text: &str) {
        if name.eq_ignore_ascii_case("id") {
            self.id = bounded(text);
        } else if name.eq_ignore_ascii_case("streamType") {
            self.stream_type = StreamType::parse(text);
        } else if name.eq_ignore_ascii_case("duration") {
            let seconds: f64 = text.trim().parse().unwrap_or(0.0);
            self.duration = (seconds * 1000.0) as i64;
        }
    }
}

/// A `<bootstrapInfo>` element, before download/parsing of its box.
#[derive(Debug, Clone, Default)]
pub struct BootstrapRef {
    /// The `id` attribute.
    pub id: StringCow<'static>,
    /// The `url` attribute, relative to the manifest's base URL.
    pub url: StringCow<'static>,
    /// The `profile` attribute.
    pub profile: StringCow<'static>,
    /// Base64-decoded text content, if the element had any.
    pub inline_box: Option<bytes::Bytes>,
}

/// A `<media>` element, before bootstrap resolution.
#[derive(Debug, Clone, Default)]
pub struct MediaRef {
    /// The `bitrate` attribute, in kbit/s.
    pub bitrate: u32,
    /// The `url` attribute, relative to the manifest's base URL.
    pub url: StringCow<'static>,
    /// The `bootstrapInfoId` attribute, matched case-insensitively against a
    /// [`BootstrapRef::id`].
    pub bootstrap_info_id: StringCow<'static>,
    /// Base64-decoded text of a nested `<metadata>` element, if present.
    pub inline_metadata: Option<bytes::Bytes>,
}

/// One entry of a [`SegmentRunTable`].
#[derive(Debug, Clone, Copy)]
pub struct SegmentRunEntry {
    /// The segment number this entry starts at.
    pub first_segment: u32,
    /// How many fragments each segment in this run contains.
    pub fragments_per_segment: u32,
}

/// The `asrt` box: one quality-tagged list of segment run entries.
#[derive(Debug, Clone, Default)]
pub struct SegmentRunTable {
    /// Quality tags this table applies to; empty means "applies to all qualities".
    pub quality_entries: Vec<StringCow<'static>>,
    /// Segment run entries, in ascending `first_segment` order.
    pub entries: Vec<SegmentRunEntry>,
}

/// One entry of a [`FragmentRunTable`].
#[derive(Debug, Clone, Copy)]
pub struct FragmentRunEntry {
    /// The fragment number this entry starts at.
    pub first_fragment: u32,
    /// The timestamp (host time base) of `first_fragment`.
    pub first_fragment_time_stamp: u64,
    /// Duration of each fragment in this run, same time base as
    /// `first_fragment_time_stamp`.
    pub fragment_duration: u64,
}

/// The `afrt` box: one quality-tagged list of fragment run entries.
#[derive(Debug, Clone, Default)]
pub struct FragmentRunTable {
    /// Quality tags this table applies to; empty means "applies to all qualities".
    pub quality_entries: Vec<StringCow<'static>>,
    /// Fragment run entries, in ascending `first_fragment` order.
    pub entries: Vec<FragmentRunEntry>,
}

/// The parsed `abst` bootstrap-info box.
#[derive(Debug, Clone, Default)]
pub struct BootstrapBox {
    /// The live head timestamp, host time base.
    pub current_media_time: u64,
    /// Whether the bootstrap describes a live stream (redundant with the
    /// manifest's `streamType`, but carried on the box itself since a live
    /// bootstrap can be refreshed independently of the manifest).
    pub is_live: bool,
    /// Segment run tables, in the order they appeared in the box.
    pub segment_run_tables: Vec<SegmentRunTable>,
    /// Fragment run tables, in the order they appeared in the box.
    pub fragment_run_tables: Vec<FragmentRunTable>,
}

/// The `mdat` payload extracted alongside an `abst` box, or on its own for a
/// fragment response.
#[derive(Debug, Clone, Default)]
pub struct MediaDataBox {
    /// The raw FLV tag stream carried by this fragment.
    pub data: bytes::Bytes,
}

/// Everything consumed out of a parsed F4F box.
#[derive(Debug, Clone, Default)]
pub struct F4fBox {
    /// The bootstrap-info box, if this byte range contained one.
    pub abst: Option<BootstrapBox>,
    /// The media-data box, if this byte range contained one.
    pub mdat: Option<MediaDataBox>,
}

/// A resolved bootstrap: identifiers plus its parsed box.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    /// The `id` attribute from the manifest.
    pub id: StringCow<'static>,
    /// The `url` attribute from the manifest.
    pub url: StringCow<'static>,
    /// The `profile` attribute from the manifest.
    pub profile: StringCow<'static>,
    /// Optional quality tag used to filter this bootstrap's run tables.
    ///
    /// The manifest format never sets this; it exists so a host can apply a
    /// rendition-selection policy on top of the resolved bootstrap.
    pub quality: Option<StringCow<'static>>,
    /// The parsed bootstrap-info box.
    pub abst: BootstrapBox,
}
