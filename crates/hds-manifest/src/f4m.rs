//! F4M manifest (XML) parsing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::ManifestError;
use crate::model::{BootstrapRef, Manifest, MediaRef, bounded};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Manifest,
    BootstrapInfo,
    Media,
    MediaMetadata,
    Other,
}

struct Pending {
    name: String,
    bootstrap: BootstrapRef,
    media: MediaRef,
    text: String,
}

fn read_attr(start: &BytesStart, key: &str) -> Option<String> {
    start.attributes().flatten().find_map(|attr| {
        let attr_key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        if attr_key == key {
            Some(attr.unescape_value().unwrap_or_default().into_owned())
        } else {
            None
        }
    })
}

fn bootstrap_ref_from_start(start: &BytesStart) -> BootstrapRef {
    let mut bootstrap = BootstrapRef::default();
    if let Some(v) = read_attr(start, "id") {
        bootstrap.id = bounded(&v);
    }
    if let Some(v) = read_attr(start, "url") {
        bootstrap.url = bounded(&v);
    }
    if let Some(v) = read_attr(start, "profile") {
        bootstrap.profile = bounded(&v);
    }
    bootstrap
}

fn media_ref_from_start(start: &BytesStart) -> MediaRef {
    let mut media = MediaRef::default();
    if let Some(v) = read_attr(start, "bitrate") {
        media.bitrate = v.trim().parse().unwrap_or(0);
    }
    if let Some(v) = read_attr(start, "url") {
        media.url = bounded(&v);
    }
    if let Some(v) = read_attr(start, "bootstrapInfoId") {
        media.bootstrap_info_id = bounded(&v);
    }
    media
}

fn decode_base64(text: &str) -> Result<Option<bytes::Bytes>, ManifestError> {
    let trimmed: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let decoded = BASE64.decode(trimmed.as_bytes())?;
    Ok(Some(bytes::Bytes::from(decoded)))
}

/// Parses the raw bytes of an F4M manifest document.
///
/// Requires the root element to be named `manifest`; any other root fails
/// with [`ManifestError::InvalidManifest`].
pub fn parse_manifest(xml: &[u8]) -> Result<Manifest, ManifestError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut manifest = Manifest::default();
    let mut scope_stack = vec![Scope::Root];
    let mut pending_stack: Vec<Pending> = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                let parent_scope = *scope_stack.last().unwrap();

                if parent_scope == Scope::Root {
                    if name != "manifest" {
                        return Err(ManifestError::InvalidManifest(format!(
                            "root element is not named manifest, name = {name}"
                        )));
                    }
                    saw_root = true;
                    scope_stack.push(Scope::Manifest);
                    continue;
                }

                let scope = match (parent_scope, name.as_str()) {
                    (Scope::Manifest, "bootstrapInfo") => Scope::BootstrapInfo,
                    (Scope::Manifest, "media") => Scope::Media,
                    (Scope::Media, "metadata") => Scope::MediaMetadata,
                    _ => Scope::Other,
                };

                let bootstrap = if scope == Scope::BootstrapInfo {
                    bootstrap_ref_from_start(&start)
                } else {
                    BootstrapRef::default()
                };
                let media = if scope == Scope::Media {
                    media_ref_from_start(&start)
                } else {
                    MediaRef::default()
                };

                pending_stack.push(Pending {
                    name,
                    bootstrap,
                    media,
                    text: String::new(),
                });
                scope_stack.push(scope);
            }
            Event::Empty(start) => {
                // Self-closing elements never get a matching `End` event; finalize inline.
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                let parent_scope = *scope_stack.last().unwrap();

                match (parent_scope, name.as_str()) {
                    (Scope::Manifest, "bootstrapInfo") => {
                        manifest.bootstraps.push(bootstrap_ref_from_start(&start));
                    }
                    (Scope::Manifest, "media") => {
                        manifest.media.push(media_ref_from_start(&start));
                    }
                    _ => {}
                }
            }
            Event::Text(text) => {
                if let Some(pending) = pending_stack.last_mut() {
                    pending.text.push_str(&text.unescape().unwrap_or_default());
                }
            }
            Event::End(_) => {
                let scope = scope_stack.pop().unwrap_or(Scope::Root);
                if scope == Scope::Root {
                    continue;
                }

                let Some(mut pending) = pending_stack.pop() else { continue };

                match scope {
                    Scope::MediaMetadata => {
                        let metadata = decode_base64(pending.text.trim())?;
                        if let Some(parent) = pending_stack.last_mut() {
                            parent.media.inline_metadata = metadata;
                        }
                    }
                    Scope::BootstrapInfo => {
                        pending.bootstrap.inline_box = decode_base64(pending.text.trim())?;
                        manifest.bootstraps.push(pending.bootstrap);
                    }
                    Scope::Media => {
                        // A nested <metadata> element already populated pending.media
                        // via the parent-propagation branch above, since `media` here
                        // refers to the *popped* pending frame for the media element
                        // itself, not its metadata child.
                        manifest.media.push(pending.media);
                    }
                    Scope::Manifest => {
                        manifest.set_element(&pending.name, pending.text.trim());
                    }
                    Scope::Other | Scope::Root => {}
                }
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(ManifestError::InvalidManifest("no root element found".to_string()));
    }

    Ok(manifest)
}
