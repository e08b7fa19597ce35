//! Text decoding and package path helpers.

use std::borrow::Cow;

use memchr::memmem;

/// Decode the bytes of an XML document to a string.
///
/// Strips a UTF-8 BOM, then decodes with [`decode_text`] using the encoding
/// named in the XML declaration as the hint.
pub fn decode_xml(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = strip_bom(bytes);
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// Decode bytes to a string, handling legacy encodings.
///
/// 1. UTF-8 when the bytes are well formed
/// 2. The hint encoding (from `<?xml encoding="..."?>`)
/// 3. Windows-1252, which older packages commonly use without declaring it
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Strip a UTF-8 byte order mark if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Read the `encoding` pseudo-attribute of an XML declaration.
///
/// Only the first 100 bytes are examined.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(100)];
    let after_decl = &prefix[memmem::find(prefix, b"<?xml")?..];

    let enc_pos = after_decl
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_decl[enc_pos + 9..];

    let (&quote, rest) = after_enc.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let end = memchr::memchr(quote, rest)?;
    std::str::from_utf8(&rest[..end]).ok()
}

/// Directory part of a root-relative path (`"OEBPS/content.opf"` -> `"OEBPS"`).
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Drop a `#fragment` suffix from an href.
pub fn strip_fragment(href: &str) -> &str {
    memchr::memchr(b'#', href.as_bytes())
        .map(|i| &href[..i])
        .unwrap_or(href)
}

/// Lexically normalize an href relative to some base.
///
/// Removes empty and `.` segments and folds `name/..` pairs. Leading `..`
/// segments that cannot be folded are kept, so the result may still point
/// above its base.
pub fn normalize_href(href: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Resolve an href against the directory of the package document.
///
/// Returns `None` when the result would escape the archive root.
pub fn resolve_href(base_dir: &str, href: &str) -> Option<String> {
    let joined = if base_dir.is_empty() {
        normalize_href(href)
    } else {
        normalize_href(&format!("{base_dir}/{href}"))
    };
    if joined.is_empty() || joined == ".." || joined.starts_with("../") {
        None
    } else {
        Some(joined)
    }
}
