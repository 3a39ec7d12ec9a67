//! Attachment validation by sniffed content type

use crate::error::{MailError, MailResult};
use crate::models::{Attachment, RequestAttachment};
use std::collections::HashSet;

/// Number of leading bytes inspected when classifying text content
const SNIFF_LEN: usize = 512;

/// Extension used when a MIME type maps to no known file extension
pub const UNKNOWN_EXTENSION: &str = "unknown";

/// HTML tag openers recognised at the start of text content, compared
/// case-insensitively and followed by a space or `>`
const HTML_TAGS: [&[u8]; 17] = [
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

const XML_DECLARATION: &[u8] = b"<?xml";

const HTML: &str = "text/html; charset=utf-8";
const XML: &str = "text/xml; charset=utf-8";
const PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

/// Detect the MIME type of `content` from its leading bytes.
///
/// Binary formats are recognised by their magic numbers. Content opening
/// with a known HTML tag or an XML declaration (after leading whitespace) is
/// HTML or XML. Anything else is plain text unless it contains control
/// bytes, in which case it is `application/octet-stream`.
pub fn detect_content_type(content: &[u8]) -> String {
    if let Some(kind) = infer::get(content) {
        if kind.matcher_type() != infer::MatcherType::Text {
            return kind.mime_type().to_string();
        }
    }

    let head = &content[..content.len().min(SNIFF_LEN)];
    if let Some(kind) = sniff_markup(head) {
        return kind.to_string();
    }

    if head.iter().any(|b| is_binary_byte(*b)) {
        OCTET_STREAM.to_string()
    } else {
        PLAIN.to_string()
    }
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

fn sniff_markup(head: &[u8]) -> Option<&'static str> {
    let start = head
        .iter()
        .position(|&b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(head.len());
    let data = &head[start..];

    if HTML_TAGS.iter().any(|tag| opens_with_tag(data, tag)) {
        Some(HTML)
    } else if data.starts_with(XML_DECLARATION) {
        Some(XML)
    } else {
        None
    }
}

/// `data` starts with `tag` (ignoring ASCII case) and the tag name ends there
fn opens_with_tag(data: &[u8], tag: &[u8]) -> bool {
    data.len() > tag.len()
        && data[..tag.len()].eq_ignore_ascii_case(tag)
        && matches!(data[tag.len()], b' ' | b'>')
}

/// File extension (without dot) for a MIME type, or [`UNKNOWN_EXTENSION`].
///
/// Parameters such as `; charset=utf-8` are ignored.
pub fn extension_for(kind: &str) -> &'static str {
    let essence = kind.split(';').next().unwrap_or(kind).trim();

    mime_guess::get_mime_extensions_str(essence)
        .and_then(|extensions| extensions.first().copied())
        .unwrap_or(UNKNOWN_EXTENSION)
}

/// Validate `attachments` against the `allowed` MIME types.
///
/// Stops at the first attachment whose detected type is not allowed and
/// reports that type. On success the attachments keep their input order.
pub fn process_attachments(
    allowed: &HashSet<String>,
    attachments: &[RequestAttachment],
) -> MailResult<Vec<Attachment>> {
    attachments
        .iter()
        .map(|attachment| {
            let kind = detect_content_type(&attachment.content);
            if !allowed.contains(&kind) {
                return Err(MailError::AttachmentTypeNotAllowed(kind));
            }

            Ok(Attachment {
                name: attachment.name.clone(),
                kind,
                content: attachment.content.clone(),
            })
        })
        .collect()
}
