//! Visibility flags: per-field and per-entry public/private policy.
//!
//! Keys follow a small grammar:
//!
//! ```text
//! email                      scalar field name
//! link:<i>   social:<i>      indexed entry of an ordered collection
//! wallet.<label>             namespaced entry of a keyed collection
//! key.<algorithm>
//! custom.<key>
//! verified_domain:<domain>
//! ```
//!
//! A key with no entry resolves to public, except for the fields listed in
//! [`DEFAULT_PRIVATE_FIELDS`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;

/// Scalar fields that are private unless explicitly made public.
pub const DEFAULT_PRIVATE_FIELDS: [&str; 4] = ["email", "phone", "address", "birthdate"];

/// Public or private exposure of a piece of identity data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    /// Resolve free-form input. Anything other than `private`
    /// (ignoring case and surrounding whitespace) is public.
    pub fn normalize(input: &str) -> Self {
        if input.trim().eq_ignore_ascii_case("private") {
            Self::Private
        } else {
            Self::Public
        }
    }

    /// Return a stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private)
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Visibility {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Visibility {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::normalize(&raw))
    }
}

// ── Key builders ──────────────────────────────────────────────────────────────

/// Visibility key for the link at `index`.
pub fn link_key(index: usize) -> String {
    format!("link:{index}")
}

/// Visibility key for the social profile at `index`.
pub fn social_key(index: usize) -> String {
    format!("social:{index}")
}

/// Visibility key for a wallet label. Labels are case-insensitive.
pub fn wallet_key(label: &str) -> String {
    format!("wallet.{}", label.to_lowercase())
}

/// Visibility key for a public key algorithm. Algorithms are case-insensitive.
pub fn public_key_key(algorithm: &str) -> String {
    format!("key.{}", algorithm.to_lowercase())
}

/// Visibility key for a custom field. Custom keys are matched verbatim.
pub fn custom_key(key: &str) -> String {
    format!("custom.{key}")
}

/// Visibility key for a verified domain.
pub fn verified_domain_key(domain: &str) -> String {
    format!("verified_domain:{}", domain.to_lowercase())
}

// ── VisibilityMap ─────────────────────────────────────────────────────────────

/// Persisted entry shape: `{"key": "...", "visibility": "public|private"}`.
#[derive(Debug, Serialize, Deserialize)]
struct VisibilityEntry {
    key: String,
    visibility: Visibility,
}

/// Mapping from visibility key to its explicit flag.
///
/// Serializes as a JSON list of entries sorted by key, so the persisted
/// document is stable across writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityMap {
    entries: BTreeMap<String, Visibility>,
}

impl VisibilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a flag. Blank keys are ignored; keys are trimmed.
    pub fn set(&mut self, key: impl AsRef<str>, visibility: Visibility) {
        let key = key.as_ref().trim();
        if key.is_empty() {
            return;
        }
        self.entries.insert(key.to_string(), visibility);
    }

    /// Remove an explicit flag, returning the key to its default.
    pub fn unset(&mut self, key: &str) -> Option<Visibility> {
        self.entries.remove(key.trim())
    }

    /// The explicit flag for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Visibility> {
        self.entries.get(key).copied()
    }

    /// Resolve `key`, falling back to `default` when no flag is recorded.
    pub fn resolve(&self, key: &str, default: Visibility) -> Visibility {
        self.get(key).unwrap_or(default)
    }

    /// Resolve a scalar field name, honouring the private-by-default set.
    pub fn resolve_field(&self, field: &str) -> Visibility {
        let default = if DEFAULT_PRIVATE_FIELDS.contains(&field) {
            Visibility::Private
        } else {
            Visibility::Public
        };
        self.resolve(field, default)
    }

    /// True when `key` carries an explicit private flag.
    pub fn is_private(&self, key: &str) -> bool {
        self.resolve(key, Visibility::Public).is_private()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Visibility)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Serialize to the persisted document. An empty map encodes as `""`.
    pub fn encode(&self) -> Result<String> {
        if self.entries.is_empty() {
            return Ok(String::new());
        }
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a persisted document. Blank input decodes to an empty map.
    pub fn decode(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(raw)?)
    }
}

impl Serialize for VisibilityMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let entries: Vec<VisibilityEntry> = self
            .entries
            .iter()
            .map(|(key, visibility)| VisibilityEntry {
                key: key.clone(),
                visibility: *visibility,
            })
            .collect();
        entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VisibilityMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries = Vec::<VisibilityEntry>::deserialize(deserializer)?;
        let mut map = Self::default();
        for entry in entries {
            map.set(&entry.key, entry.visibility);
        }
        Ok(map)
    }
}

impl<K: AsRef<str>> FromIterator<(K, Visibility)> for VisibilityMap {
    fn from_iter<I: IntoIterator<Item = (K, Visibility)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (key, visibility) in iter {
            map.set(key, visibility);
        }
        map
    }
}
