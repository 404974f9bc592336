//! Bounded URL composition with the manifest's query-suffix forwarding rule.
//!
//! Every composed URL goes through [`compose_url`], so the "forward the
//! manifest's own query string unless the relative path already has one"
//! rule applies uniformly to bootstrap URLs, fragment URLs, and the
//! fragment re-queue path alike.

/// Upper bound on a composed request URL, matching the original client's
/// fixed-size request buffer.
pub const MAX_URL_SIZE: usize = 1024;

fn push_bounded(dest: &mut String, piece: &str) {
    if dest.len() >= MAX_URL_SIZE {
        return;
    }
    let remaining = MAX_URL_SIZE - dest.len();
    if piece.len() <= remaining {
        dest.push_str(piece);
        return;
    }
    let mut end = remaining;
    while end > 0 && !piece.is_char_boundary(end) {
        end -= 1;
    }
    dest.push_str(&piece[..end]);
}

/// Returns `manifest_url`'s own query string, including the leading `?`, or
/// an empty string if it has none.
pub(crate) fn query_suffix(manifest_url: &str) -> &str {
    match manifest_url.find('?') {
        Some(idx) => &manifest_url[idx..],
        None => "",
    }
}

/// Composes `base + relative`, forwarding `query_suffix` only when `relative`
/// does not already carry its own `?`.
pub(crate) fn compose_url(base: &str, relative: &str, query_suffix: &str) -> String {
    let mut url = String::with_capacity(base.len() + relative.len() + query_suffix.len());
    push_bounded(&mut url, base);
    push_bounded(&mut url, relative);
    if !relative.contains('?') {
        push_bounded(&mut url, query_suffix);
    }
    url
}

/// Composes a fragment request URL: `{base}{media_url}Seg{segment}-Frag{fragment}{query_suffix}`.
pub(crate) fn compose_fragment_url(base: &str, media_url: &str, segment: u32, fragment: u32, query_suffix: &str) -> String {
    let relative = format!("{media_url}Seg{segment}-Frag{fragment}");
    compose_url(base, &relative, query_suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_query_suffix_when_relative_has_none() {
        let suffix = query_suffix("https://example.com/manifest.f4m?auth=abc");
        assert_eq!(suffix, "?auth=abc");
        let url = compose_fragment_url("https://example.com/", "media/1/", 1, 2, suffix);
        assert_eq!(url, "https://example.com/media/1/Seg1-Frag2?auth=abc");
    }

    #[test]
    fn does_not_double_append_when_relative_has_its_own_query() {
        let url = compose_url("https://example.com/", "media/1/bootstrap?id=abc", "?auth=xyz");
        assert_eq!(url, "https://example.com/media/1/bootstrap?id=abc");
    }

    #[test]
    fn truncates_at_max_url_size() {
        let base = "https://example.com/";
        let long_segment = "a".repeat(MAX_URL_SIZE);
        let url = compose_url(base, &long_segment, "?q=1");
        assert_eq!(url.len(), MAX_URL_SIZE);
    }
}
