//! Canonical export envelope (`pinc-1`).
//!
//! ```json
//! {
//!     "meta": { "version": "pinc-1", "base_url": "...", "view": "public",
//!               "subject": "urn:pin:subject:...", "rev": "sha256:...", "self": "..." },
//!     "identity": { "handle": "...", "display_name": "...", ... }
//! }
//! ```
//!
//! Empty values are omitted everywhere, so an absent field and an empty one
//! serialize identically and hash identically.

use std::collections::BTreeMap;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::identity::{Identity, IdentityId, Link, SocialProfile};
use crate::projection::{strip_empty, Projection, View};
use crate::time::to_rfc3339;

use super::format::ExportFormat;

/// Protocol version carried in `meta.version`.
pub const PINC_VERSION: &str = "pinc-1";

/// Algorithm tag prefixed to every `rev`.
pub const REV_ALGORITHM: &str = "sha256";

/// Path segment of the profile picture below a profile URL.
pub const PROFILE_PICTURE_SEGMENT: &str = "profile-picture";

// ── Payload types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSocial {
    pub label: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(default)]
    pub verified: bool,
}

/// The identity as exported: trimmed, emptied fields omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPayload {
    pub handle: String,
    pub display_name: String,
    pub url: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bio: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub organization: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub job_title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub birthdate: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub languages: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub website: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pronouns: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timezone: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub profile_image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub profile_image_alt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<ExportLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub social: Vec<ExportSocial>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub wallets: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub public_keys: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verified_domains: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub atproto_handle: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub atproto_did: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub version: String,
    pub base_url: String,
    pub view: View,
    pub subject: String,
    pub rev: String,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub meta: Meta,
    pub identity: IdentityPayload,
}

/// Instance-level inputs to [`build_envelope`].
#[derive(Debug, Clone)]
pub struct EnvelopeContext<'a> {
    /// Base URL of the instance; a trailing slash is ignored.
    pub base_url: &'a str,
    /// Alt text of the active profile picture.
    pub profile_image_alt: &'a str,
    /// Used as `updated_at` when the identity carries none.
    pub now: DateTime<Utc>,
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Build the envelope for an already projected identity.
///
/// `self_url` is echoed verbatim into `meta.self`. For the private view it
/// also determines the profile image, so private exports only reference the
/// capability-scoped image.
pub fn build_envelope(
    projection: &Projection,
    view: View,
    ctx: &EnvelopeContext<'_>,
    self_url: Option<&str>,
) -> Result<Envelope> {
    let identity = &projection.identity;
    let base_url = ctx.base_url.trim().trim_end_matches('/');
    let handle = identity.handle.as_str().to_string();
    let profile_url = format!("{base_url}/{handle}");
    let self_url = self_url.map(str::trim).filter(|s| !s.is_empty());

    let mut profile_image = format!("{profile_url}/{PROFILE_PICTURE_SEGMENT}");
    if view.is_private() {
        if let Some(private_image) = self_url.and_then(profile_image_from_self) {
            profile_image = private_image;
        }
    }

    let payload = IdentityPayload {
        display_name: first_non_empty(&identity.display_name, &handle),
        url: profile_url,
        updated_at: to_rfc3339(&identity.updated_at.unwrap_or(ctx.now)),
        email: trimmed(&identity.email),
        bio: trimmed(&identity.bio),
        organization: trimmed(&identity.organization),
        job_title: trimmed(&identity.job_title),
        birthdate: trimmed(&identity.birthdate),
        languages: trimmed(&identity.languages),
        phone: trimmed(&identity.phone),
        address: trimmed(&identity.address),
        location: trimmed(&identity.location),
        website: trimmed(&identity.website),
        pronouns: trimmed(&identity.pronouns),
        timezone: trimmed(&identity.timezone),
        custom_fields: strip_empty(projection.custom_fields.clone()),
        profile_image,
        profile_image_alt: trimmed(ctx.profile_image_alt),
        links: export_links(&identity.links),
        social: export_social(&identity.social_profiles),
        wallets: strip_empty(identity.wallets.clone()),
        public_keys: strip_empty(identity.public_keys.clone()),
        verified_domains: identity
            .verified_domains
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect(),
        atproto_handle: trimmed(&identity.atproto_handle),
        atproto_did: trimmed(&identity.atproto_did),
        handle,
    };

    let meta = Meta {
        version: PINC_VERSION.to_string(),
        base_url: base_url.to_string(),
        view,
        subject: subject_for_identity(identity.id, identity.handle.as_str()),
        rev: compute_rev(&payload)?,
        self_url: self_url.map(str::to_string),
    };

    Ok(Envelope {
        meta,
        identity: payload,
    })
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

fn first_non_empty(preferred: &str, fallback: &str) -> String {
    let preferred = preferred.trim();
    if preferred.is_empty() {
        fallback.trim().to_string()
    } else {
        preferred.to_string()
    }
}

fn export_links(links: &[Link]) -> Vec<ExportLink> {
    links
        .iter()
        .filter(|link| !link.is_blank())
        .map(|link| ExportLink {
            label: link.label.trim().to_string(),
            url: link.url.trim().to_string(),
        })
        .collect()
}

fn export_social(profiles: &[SocialProfile]) -> Vec<ExportSocial> {
    profiles
        .iter()
        .filter(|profile| !profile.is_blank())
        .map(|profile| ExportSocial {
            label: profile.label.trim().to_string(),
            url: profile.url.trim().to_string(),
            provider: profile.provider.trim().to_string(),
            verified: profile.verified,
        })
        .collect()
}

// ── Subject and rev ───────────────────────────────────────────────────────────

/// Opaque subject id: a one-way hash over the numeric id and handle.
pub fn subject_for_identity(id: IdentityId, handle: &str) -> String {
    let input = format!("pin:{}:{}", id.0, handle.trim().to_lowercase());
    let digest = Sha256::digest(input.as_bytes());
    format!(
        "urn:pin:subject:{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
    )
}

/// Subject of a whole identity record.
pub fn subject_of(identity: &Identity) -> String {
    subject_for_identity(identity.id, identity.handle.as_str())
}

#[derive(Serialize)]
struct Pair<'a> {
    key: &'a str,
    value: &'a str,
}

/// Hash input: the payload with every map flattened to sorted pairs.
#[derive(Serialize)]
struct RevPayload<'a> {
    handle: &'a str,
    display_name: &'a str,
    url: &'a str,
    updated_at: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    email: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    bio: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    organization: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    job_title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    birthdate: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    languages: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    phone: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    address: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    location: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    website: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pronouns: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    timezone: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    custom_fields: Vec<Pair<'a>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    profile_image: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    profile_image_alt: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    links: &'a [ExportLink],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    social: &'a [ExportSocial],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    wallets: Vec<Pair<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    public_keys: Vec<Pair<'a>>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    verified_domains: &'a [String],
    #[serde(skip_serializing_if = "str::is_empty")]
    atproto_handle: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    atproto_did: &'a str,
}

/// Map entries as key-sorted pairs, skipping blank keys and values.
fn sorted_pairs<'a, I>(values: I) -> Vec<Pair<'a>>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut pairs: Vec<Pair<'a>> = values
        .into_iter()
        .filter(|(k, _)| !k.trim().is_empty())
        .map(|(k, v)| Pair {
            key: k.as_str(),
            value: v.trim(),
        })
        .filter(|p| !p.value.is_empty())
        .collect();
    pairs.sort_by(|a, b| a.key.cmp(b.key));
    pairs
}

/// Content hash of a payload: `sha256:` + hex digest of its canonical JSON.
///
/// Independent of map iteration order.
pub fn compute_rev(payload: &IdentityPayload) -> Result<String> {
    let rev = RevPayload {
        handle: &payload.handle,
        display_name: &payload.display_name,
        url: &payload.url,
        updated_at: &payload.updated_at,
        email: &payload.email,
        bio: &payload.bio,
        organization: &payload.organization,
        job_title: &payload.job_title,
        birthdate: &payload.birthdate,
        languages: &payload.languages,
        phone: &payload.phone,
        address: &payload.address,
        location: &payload.location,
        website: &payload.website,
        pronouns: &payload.pronouns,
        timezone: &payload.timezone,
        custom_fields: sorted_pairs(&payload.custom_fields),
        profile_image: &payload.profile_image,
        profile_image_alt: &payload.profile_image_alt,
        links: &payload.links,
        social: &payload.social,
        wallets: sorted_pairs(&payload.wallets),
        public_keys: sorted_pairs(&payload.public_keys),
        verified_domains: &payload.verified_domains,
        atproto_handle: &payload.atproto_handle,
        atproto_did: &payload.atproto_did,
    };
    let raw = serde_json::to_vec(&rev)?;
    Ok(format!("{REV_ALGORITHM}:{}", hex::encode(Sha256::digest(&raw))))
}

// ── Private profile image ─────────────────────────────────────────────────────

/// Derive the private profile-picture URL from an export's own URL.
///
/// Strips a trailing export extension from the path and appends
/// `/profile-picture`, dropping query and fragment. `None` when the URL does
/// not parse or its path is empty.
pub fn profile_image_from_self(self_url: &str) -> Option<String> {
    let mut parsed = url::Url::parse(self_url.trim()).ok()?;
    let path = parsed.path().to_string();
    let path = ExportFormat::strip_extension(&path);
    if path.is_empty() || path == "/" {
        return None;
    }
    let path = path.trim_end_matches('/');
    parsed.set_path(&format!("{path}/{PROFILE_PICTURE_SEGMENT}"));
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some(parsed.to_string())
}
