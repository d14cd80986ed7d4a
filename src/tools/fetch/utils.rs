use encoding_rs::{Encoding, UTF_8};
use std::path::Path;

/// Charset parameter of a `Content-Type` value, if any.
pub(super) fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"').trim();
        (!value.is_empty()).then_some(value)
    })
}

/// Decode a body with the declared charset, UTF-8 when missing or unknown.
///
/// A BOM never overrides the declared charset. Malformed sequences become
/// U+FFFD.
pub(super) fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from_content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

pub(super) fn is_local_source(source: &str) -> bool {
    !source.is_empty() && Path::new(source).exists()
}

/// Backoff before the attempt after `attempt`: `factor * attempt` seconds,
/// saturating at `Duration::MAX`.
pub(super) fn backoff_delay(backoff_factor: f64, attempt: u32) -> std::time::Duration {
    let secs = (backoff_factor * f64::from(attempt)).max(0.0);
    std::time::Duration::try_from_secs_f64(secs).unwrap_or(std::time::Duration::MAX)
}
