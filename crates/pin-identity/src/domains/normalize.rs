//! Domain normalization and parsing of free-form domain lists.

use crate::error::{PinError, Result};

/// Reduce user input to a bare lowercase host.
///
/// Strips surrounding whitespace, an `http://` or `https://` scheme,
/// leading/trailing slashes and any path. Returns `None` when nothing is left.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let mut rest = raw.trim();
    for scheme in ["https://", "http://"] {
        if let Some(stripped) = strip_prefix_ignore_case(rest, scheme) {
            rest = stripped;
            break;
        }
    }
    let rest = rest.trim_matches('/');
    let host = rest.split('/').next().unwrap_or_default().trim();
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// Like [`normalize_domain`], but an empty result is a validation failure.
pub fn require_domain(raw: &str) -> Result<String> {
    normalize_domain(raw)
        .ok_or_else(|| PinError::ValidationFailure(format!("invalid domain: {raw:?}")))
}

/// Split a comma- or newline-separated list into normalized domains.
pub fn parse_domains(input: &str) -> Vec<String> {
    input
        .split([',', '\n', '\r'])
        .filter_map(normalize_domain)
        .collect()
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        value.get(prefix.len()..)
    } else {
        None
    }
}
