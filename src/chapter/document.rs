// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Structural lookup in HTML/XML metadata documents.
//!
//! Platform viewers embed the interesting metadata in attributes and text
//! nodes (`<div data-viewer-id="...">`, `<script id="__STATE__">{json}`,
//! `<Scramble>0,3,...</Scramble>`). Nothing here renders or validates —
//! this is a forgiving event scan that answers exactly three questions:
//! the value of an attribute on a matching element, the text content of an
//! element, and all values of one attribute across the document. Markup
//! errors end the scan instead of failing the page; whatever was found up
//! to that point stands.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

fn reader_for(doc: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(doc.as_bytes());
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    reader
}

fn attr_value(e: &BytesStart<'_>, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name.as_bytes() {
            return String::from_utf8(attr.value.into_owned()).ok();
        }
    }
    None
}

/// Whether the element carries `filter.0="filter.1"`; an empty filter name
/// matches any element.
fn matches_filter(e: &BytesStart<'_>, filter: Option<(&str, &str)>) -> bool {
    match filter {
        None => true,
        Some((name, want)) => attr_value(e, name).as_deref() == Some(want),
    }
}

/// Value of `attr` on the first element matching `tag` (any tag if empty)
/// and the optional `attr=value` filter.
pub fn find_attr(
    doc: &str,
    tag: &str,
    filter: Option<(&str, &str)>,
    attr: &str,
) -> Option<String> {
    let mut reader = reader_for(doc);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let tag_ok = tag.is_empty() || e.name().as_ref() == tag.as_bytes();
                if tag_ok && matches_filter(&e, filter) {
                    if let Some(v) = attr_value(&e, attr) {
                        return Some(v);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Concatenated text content of the first element matching `tag` and the
/// optional `attr=value` filter. Nested markup inside the element is
/// skipped, its text kept.
pub fn element_text(doc: &str, tag: &str, filter: Option<(&str, &str)>) -> Option<String> {
    let mut reader = reader_for(doc);
    let mut buf = Vec::new();
    let mut inside = 0usize;
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if inside > 0 {
                    inside += 1;
                } else if e.name().as_ref() == tag.as_bytes() && matches_filter(&e, filter) {
                    inside = 1;
                }
            }
            Ok(Event::End(_)) if inside > 0 => {
                inside -= 1;
                if inside == 0 {
                    return Some(text);
                }
            }
            Ok(Event::Text(e)) if inside > 0 => match e.xml_content() {
                Ok(t) => text.push_str(&t),
                // Keep raw bytes when the content is not entity-clean
                // (inline JSON blobs frequently are not).
                Err(_) => text.push_str(&String::from_utf8_lossy(&e)),
            },
            Ok(Event::CData(e)) if inside > 0 => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::Eof) | Err(_) => {
                return if inside > 0 { Some(text) } else { None };
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Every value of `attr` across the document, in document order.
pub fn all_attr_values(doc: &str, attr: &str) -> Vec<String> {
    let mut reader = reader_for(doc);
    let mut buf = Vec::new();
    let mut values = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if let Some(v) = attr_value(&e, attr) {
                    values.push(v);
                }
            }
            Ok(Event::Eof) | Err(_) => return values,
            _ => {}
        }
        buf.clear();
    }
}
