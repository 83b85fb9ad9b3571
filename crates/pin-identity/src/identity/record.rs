//! The canonical identity record.
//!
//! Collections are typed here and serialized only at the persistence edge
//! (see [`encode_links`] and friends), so a malformed blob fails loudly at
//! load time instead of silently vanishing from a page.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PinError, Result};

use super::visibility::{Visibility, VisibilityMap};

/// Numeric identity key assigned by the identity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub i64);

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// URL-safe handle: lowercase ASCII letters, digits, `.`, `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(String);

impl Handle {
    /// Parse a handle. Input is trimmed and lowercased before validation.
    pub fn parse(raw: &str) -> Result<Self> {
        let handle = raw.trim().to_lowercase();
        if handle.is_empty() {
            return Err(PinError::ValidationFailure("handle is required".into()));
        }
        if let Some(bad) = handle
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')))
        {
            return Err(PinError::ValidationFailure(format!(
                "handle contains disallowed character {bad:?}"
            )));
        }
        Ok(Self(handle))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Handle {
    type Error = PinError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A labelled URL shown on the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

impl Link {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            visibility: None,
        }
    }

    /// True when neither label nor URL carries text.
    pub fn is_blank(&self) -> bool {
        self.label.trim().is_empty() && self.url.trim().is_empty()
    }
}

/// A social account link with optional verification metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialProfile {
    pub label: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

impl SocialProfile {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.label.trim().is_empty() && self.url.trim().is_empty()
    }
}

/// Scalar profile fields governed by the visibility map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarField {
    DisplayName,
    Bio,
    Email,
    Organization,
    JobTitle,
    Birthdate,
    Languages,
    Phone,
    Address,
    Location,
    Website,
    Pronouns,
    Timezone,
    AtprotoHandle,
    AtprotoDid,
}

impl ScalarField {
    pub const ALL: [ScalarField; 15] = [
        Self::DisplayName,
        Self::Bio,
        Self::Email,
        Self::Organization,
        Self::JobTitle,
        Self::Birthdate,
        Self::Languages,
        Self::Phone,
        Self::Address,
        Self::Location,
        Self::Website,
        Self::Pronouns,
        Self::Timezone,
        Self::AtprotoHandle,
        Self::AtprotoDid,
    ];

    /// Field name, doubling as its visibility key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::DisplayName => "display_name",
            Self::Bio => "bio",
            Self::Email => "email",
            Self::Organization => "organization",
            Self::JobTitle => "job_title",
            Self::Birthdate => "birthdate",
            Self::Languages => "languages",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::Location => "location",
            Self::Website => "website",
            Self::Pronouns => "pronouns",
            Self::Timezone => "timezone",
            Self::AtprotoHandle => "atproto_handle",
            Self::AtprotoDid => "atproto_did",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// The single canonical identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub handle: Handle,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub birthdate: String,
    #[serde(default)]
    pub languages: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub pronouns: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub atproto_handle: String,
    #[serde(default)]
    pub atproto_did: String,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub social_profiles: Vec<SocialProfile>,
    #[serde(default)]
    pub wallets: BTreeMap<String, String>,
    #[serde(default)]
    pub public_keys: BTreeMap<String, String>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
    #[serde(default)]
    pub verified_domains: Vec<String>,
    #[serde(default)]
    pub visibility: VisibilityMap,
    #[serde(default)]
    pub private_token: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// A blank identity with only its key and handle set.
    pub fn new(id: IdentityId, handle: Handle) -> Self {
        Self {
            id,
            handle,
            display_name: String::new(),
            email: String::new(),
            bio: String::new(),
            organization: String::new(),
            job_title: String::new(),
            birthdate: String::new(),
            languages: String::new(),
            phone: String::new(),
            address: String::new(),
            location: String::new(),
            website: String::new(),
            pronouns: String::new(),
            timezone: String::new(),
            atproto_handle: String::new(),
            atproto_did: String::new(),
            links: Vec::new(),
            social_profiles: Vec::new(),
            wallets: BTreeMap::new(),
            public_keys: BTreeMap::new(),
            custom_fields: BTreeMap::new(),
            verified_domains: Vec::new(),
            visibility: VisibilityMap::new(),
            private_token: String::new(),
            updated_at: None,
        }
    }

    pub fn field(&self, field: ScalarField) -> &str {
        match field {
            ScalarField::DisplayName => &self.display_name,
            ScalarField::Bio => &self.bio,
            ScalarField::Email => &self.email,
            ScalarField::Organization => &self.organization,
            ScalarField::JobTitle => &self.job_title,
            ScalarField::Birthdate => &self.birthdate,
            ScalarField::Languages => &self.languages,
            ScalarField::Phone => &self.phone,
            ScalarField::Address => &self.address,
            ScalarField::Location => &self.location,
            ScalarField::Website => &self.website,
            ScalarField::Pronouns => &self.pronouns,
            ScalarField::Timezone => &self.timezone,
            ScalarField::AtprotoHandle => &self.atproto_handle,
            ScalarField::AtprotoDid => &self.atproto_did,
        }
    }

    pub fn field_mut(&mut self, field: ScalarField) -> &mut String {
        match field {
            ScalarField::DisplayName => &mut self.display_name,
            ScalarField::Bio => &mut self.bio,
            ScalarField::Email => &mut self.email,
            ScalarField::Organization => &mut self.organization,
            ScalarField::JobTitle => &mut self.job_title,
            ScalarField::Birthdate => &mut self.birthdate,
            ScalarField::Languages => &mut self.languages,
            ScalarField::Phone => &mut self.phone,
            ScalarField::Address => &mut self.address,
            ScalarField::Location => &mut self.location,
            ScalarField::Website => &mut self.website,
            ScalarField::Pronouns => &mut self.pronouns,
            ScalarField::Timezone => &mut self.timezone,
            ScalarField::AtprotoHandle => &mut self.atproto_handle,
            ScalarField::AtprotoDid => &mut self.atproto_did,
        }
    }

    /// The display name, or the handle when none is set.
    pub fn display_name_or_handle(&self) -> &str {
        let name = self.display_name.trim();
        if name.is_empty() {
            self.handle.as_str()
        } else {
            name
        }
    }
}

// ── Persistence-edge codecs ───────────────────────────────────────────────────

/// Encode links for storage. An empty list encodes as `""`.
pub fn encode_links(links: &[Link]) -> Result<String> {
    encode_list(links)
}

/// Decode stored links. Blank input decodes to an empty list.
pub fn decode_links(raw: &str) -> Result<Vec<Link>> {
    decode_list(raw)
}

/// Encode social profiles for storage. An empty list encodes as `""`.
pub fn encode_social_profiles(profiles: &[SocialProfile]) -> Result<String> {
    encode_list(profiles)
}

/// Decode stored social profiles. Blank input decodes to an empty list.
pub fn decode_social_profiles(raw: &str) -> Result<Vec<SocialProfile>> {
    decode_list(raw)
}

fn encode_list<T: Serialize>(values: &[T]) -> Result<String> {
    if values.is_empty() {
        return Ok(String::new());
    }
    Ok(serde_json::to_string(values)?)
}

fn decode_list<T: serde::de::DeserializeOwned>(raw: &str) -> Result<Vec<T>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

// ── Profile helpers ───────────────────────────────────────────────────────────

/// Carry verification state across a social-profile edit.
///
/// Profiles in `updated` whose URL (case-insensitive) matches one in
/// `existing` keep its `verified` flag, and its provider when none was given.
/// Entries without a URL are dropped. An empty `updated` list keeps `existing`.
pub fn merge_social_profiles(
    updated: Vec<SocialProfile>,
    existing: &[SocialProfile],
) -> Vec<SocialProfile> {
    if updated.is_empty() {
        return existing.to_vec();
    }
    let by_url: BTreeMap<String, &SocialProfile> = existing
        .iter()
        .filter(|p| !p.url.trim().is_empty())
        .map(|p| (p.url.trim().to_lowercase(), p))
        .collect();

    updated
        .into_iter()
        .filter(|p| !p.url.trim().is_empty())
        .map(|mut profile| {
            if let Some(prev) = by_url.get(&profile.url.trim().to_lowercase()) {
                profile.verified = prev.verified;
                if profile.provider.is_empty() {
                    profile.provider = prev.provider.clone();
                }
            }
            profile
        })
        .collect()
}

/// True when a federation handle sits under one of the verified domains.
pub fn is_atproto_handle_verified(handle: &str, verified_domains: &[String]) -> bool {
    let handle = handle.trim().to_lowercase();
    if handle.is_empty() {
        return false;
    }
    verified_domains
        .iter()
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .any(|d| handle == d || handle.ends_with(&format!(".{d}")))
}
