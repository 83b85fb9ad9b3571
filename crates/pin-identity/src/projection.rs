//! Visibility projection: public and private views of one identity.
//!
//! `project` is pure: it clones what it returns and never touches the
//! caller's record, so any number of views can be taken concurrently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::visibility::{
    custom_key, link_key, public_key_key, social_key, verified_domain_key, wallet_key,
};
use crate::identity::{Identity, ScalarField, Visibility};

/// Which audience a projection is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Anyone who knows the handle.
    Public,
    /// Holders of the private capability token.
    Private,
}

impl View {
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

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filtered identity plus its custom fields, split out.
///
/// `identity.custom_fields` is always empty; the surviving custom fields
/// live in `custom_fields` with blank values removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub identity: Identity,
    pub custom_fields: BTreeMap<String, String>,
}

/// Derive the `view` of `identity`.
///
/// The private view keeps every field. The public view blanks scalar fields
/// that resolve private (explicitly, or by default for email, phone, address
/// and birthdate) and drops collection entries flagged private either on the
/// entry itself or through their visibility key.
pub fn project(identity: &Identity, view: View) -> Projection {
    let mut out = identity.clone();
    let custom = std::mem::take(&mut out.custom_fields);

    if view.is_private() {
        return Projection {
            identity: out,
            custom_fields: strip_empty(custom),
        };
    }

    let visibility = &identity.visibility;

    for field in ScalarField::ALL {
        if visibility.resolve_field(field.key()).is_private() {
            out.field_mut(field).clear();
        }
    }

    out.links = identity
        .links
        .iter()
        .enumerate()
        .filter(|(i, link)| !entry_private(link.visibility, visibility.is_private(&link_key(*i))))
        .map(|(_, link)| link.clone())
        .collect();

    out.social_profiles = identity
        .social_profiles
        .iter()
        .enumerate()
        .filter(|(i, p)| !entry_private(p.visibility, visibility.is_private(&social_key(*i))))
        .map(|(_, p)| p.clone())
        .collect();

    out.wallets
        .retain(|label, _| !visibility.is_private(&wallet_key(label)));
    out.public_keys
        .retain(|algorithm, _| !visibility.is_private(&public_key_key(algorithm)));
    out.verified_domains
        .retain(|domain| !visibility.is_private(&verified_domain_key(domain)));

    let custom = custom
        .into_iter()
        .filter(|(key, _)| !visibility.is_private(&custom_key(key)))
        .collect();

    // The capability token must never appear in anything reachable by handle.
    out.private_token.clear();

    Projection {
        identity: out,
        custom_fields: strip_empty(custom),
    }
}

fn entry_private(own: Option<Visibility>, by_key: bool) -> bool {
    by_key || own.is_some_and(|v| v.is_private())
}

/// Trim values and drop entries left empty.
pub(crate) fn strip_empty(values: BTreeMap<String, String>) -> BTreeMap<String, String> {
    values
        .into_iter()
        .filter_map(|(k, v)| {
            let v = v.trim();
            if k.trim().is_empty() || v.is_empty() {
                None
            } else {
                Some((k, v.to_string()))
            }
        })
        .collect()
}
