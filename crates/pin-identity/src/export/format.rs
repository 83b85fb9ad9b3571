//! Export formats selected by path suffix, with their HTTP metadata.

use crate::projection::View;

/// Cache policy for exports reachable by handle.
pub const PUBLIC_CACHE_CONTROL: &str = "public, max-age=300, stale-while-revalidate=300";

/// Cache policy for exports reachable only by capability token.
pub const PRIVATE_CACHE_CONTROL: &str = "private, no-store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Canonical JSON envelope; the format with no suffix.
    Envelope,
    /// `.json`, also the envelope.
    Json,
    Xml,
    Text,
    VCard,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        Self::Envelope,
        Self::Json,
        Self::Xml,
        Self::Text,
        Self::VCard,
    ];

    /// Parse a bare extension (`json`, `xml`, `txt`, `vcf`). Case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            "txt" => Some(Self::Text),
            "vcf" => Some(Self::VCard),
            _ => None,
        }
    }

    /// Split a path identifier such as `alice.vcf` into its stem and format.
    ///
    /// An unknown or missing suffix is part of the identifier, so handles that
    /// contain dots still resolve: `alice.dev` is `("alice.dev", Envelope)`.
    pub fn from_ident(ident: &str) -> (&str, Self) {
        if let Some((stem, ext)) = ident.rsplit_once('.') {
            if let Some(format) = Self::from_extension(ext) {
                if !stem.is_empty() {
                    return (stem, format);
                }
            }
        }
        (ident, Self::Envelope)
    }

    /// Remove a trailing recognised export extension from a path.
    pub fn strip_extension(path: &str) -> &str {
        match path.rsplit_once('.') {
            Some((stem, ext)) if Self::from_extension(ext).is_some() => stem,
            _ => path,
        }
    }

    /// File extension, without the dot. The envelope has none.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Envelope => None,
            Self::Json => Some("json"),
            Self::Xml => Some("xml"),
            Self::Text => Some("txt"),
            Self::VCard => Some("vcf"),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Envelope | Self::Json => "application/json; charset=utf-8",
            Self::Xml => "application/xml; charset=utf-8",
            Self::Text => "text/plain; charset=utf-8",
            Self::VCard => "text/vcard; charset=utf-8",
        }
    }

    /// Name accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Envelope => "envelope",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Text => "txt",
            Self::VCard => "vcf",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = crate::PinError;

    fn from_str(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("envelope") {
            return Ok(Self::Envelope);
        }
        Self::from_extension(s)
            .ok_or_else(|| crate::PinError::ValidationFailure(format!("unknown export format: {s}")))
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `Cache-Control` value for a view.
pub fn cache_control(view: View) -> &'static str {
    match view {
        View::Public => PUBLIC_CACHE_CONTROL,
        View::Private => PRIVATE_CACHE_CONTROL,
    }
}
