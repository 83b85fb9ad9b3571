//! File-backed store: identities and verification rows as JSON files.
//!
//! Identity file format:
//! ```json
//! {
//!     "version": 1,
//!     "identity": { ... scalar fields, "links": "<encoded>", "visibility": "<encoded>" ... },
//!     "profile_image_alt": "..."
//! }
//! ```
//!
//! Domain file format:
//! ```json
//! { "version": 1, "rows": [ ... DomainVerification ... ] }
//! ```
//!
//! Typed collections are serialized to strings only here, at the edge.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domains::DomainVerification;
use crate::error::{PinError, Result};
use crate::identity::{
    decode_links, decode_social_profiles, encode_links, encode_social_profiles, Handle,
    Identity, IdentityId, ScalarField, VisibilityMap,
};

use super::{DomainVerificationStore, IdentityStore, ProfilePictureAltSource};

// ── File format constants ─────────────────────────────────────────────────────

const IDENTITY_FILE_VERSION: u32 = 1;
const DOMAIN_FILE_VERSION: u32 = 1;

// ── On-disk structures ────────────────────────────────────────────────────────

/// Identity as persisted. Links, social profiles and the visibility map are
/// stored as encoded strings.
#[derive(Debug, Serialize, Deserialize)]
struct StoredIdentity {
    id: IdentityId,
    handle: Handle,
    #[serde(default)]
    scalars: BTreeMap<String, String>,
    #[serde(default)]
    links: String,
    #[serde(default)]
    social_profiles: String,
    #[serde(default)]
    wallets: BTreeMap<String, String>,
    #[serde(default)]
    public_keys: BTreeMap<String, String>,
    #[serde(default)]
    custom_fields: BTreeMap<String, String>,
    #[serde(default)]
    verified_domains: Vec<String>,
    #[serde(default)]
    visibility: String,
    #[serde(default)]
    private_token: String,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IdentityFile {
    version: u32,
    identity: StoredIdentity,
    #[serde(default)]
    profile_image_alt: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct DomainFile {
    version: u32,
    rows: Vec<DomainVerification>,
}

impl StoredIdentity {
    fn from_identity(identity: &Identity) -> Result<Self> {
        let scalars = ScalarField::ALL
            .iter()
            .map(|f| (f.key().to_string(), identity.field(*f).to_string()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        Ok(Self {
            id: identity.id,
            handle: identity.handle.clone(),
            scalars,
            links: encode_links(&identity.links)?,
            social_profiles: encode_social_profiles(&identity.social_profiles)?,
            wallets: identity.wallets.clone(),
            public_keys: identity.public_keys.clone(),
            custom_fields: identity.custom_fields.clone(),
            verified_domains: identity.verified_domains.clone(),
            visibility: identity.visibility.encode()?,
            private_token: identity.private_token.clone(),
            updated_at: identity.updated_at,
        })
    }

    fn into_identity(self) -> Result<Identity> {
        let mut identity = Identity::new(self.id, self.handle);
        for (key, value) in self.scalars {
            match ScalarField::from_key(&key) {
                Some(field) => *identity.field_mut(field) = value,
                None => log::warn!("identity {}: ignoring unknown field {key}", identity.id),
            }
        }
        identity.links = decode_links(&self.links)?;
        identity.social_profiles = decode_social_profiles(&self.social_profiles)?;
        identity.wallets = self.wallets;
        identity.public_keys = self.public_keys;
        identity.custom_fields = self.custom_fields;
        identity.verified_domains = self.verified_domains;
        identity.visibility = VisibilityMap::decode(&self.visibility)?;
        identity.private_token = self.private_token;
        identity.updated_at = self.updated_at;
        Ok(identity)
    }
}

// ── FileStore ─────────────────────────────────────────────────────────────────

/// Filesystem-backed store.
///
/// Lookups by handle or token scan the identity directory. The store is safe
/// for single-process use; concurrent writes from multiple processes are not
/// coordinated.
pub struct FileStore {
    identities_dir: PathBuf,
    domains_dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `base_dir`, creating its directories.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let identities_dir = base_dir.join("identities");
        let domains_dir = base_dir.join("domains");
        std::fs::create_dir_all(&identities_dir)?;
        std::fs::create_dir_all(&domains_dir)?;
        Ok(Self {
            identities_dir,
            domains_dir,
        })
    }

    /// Write a new identity, or overwrite an existing one.
    pub fn insert_identity(&self, identity: &Identity) -> Result<()> {
        let alt = self.read_identity_file(identity.id).map(|f| f.profile_image_alt);
        let alt = match alt {
            Ok(alt) => alt,
            Err(PinError::NotFound(_)) => String::new(),
            Err(e) => return Err(e),
        };
        self.write_identity_file(identity, alt)
    }

    /// Remove an identity and every verification row it owns.
    pub fn delete_identity(&self, id: IdentityId) -> Result<()> {
        remove_if_exists(&self.identity_path(id))?;
        remove_if_exists(&self.domain_path(id))?;
        log::info!("deleted identity {id} and its domain rows");
        Ok(())
    }

    /// Set the alt text of the identity's active profile picture.
    pub fn set_alt_text(&self, id: IdentityId, alt: &str) -> Result<()> {
        let file = self.read_identity_file(id)?;
        let identity = file.identity.into_identity()?;
        self.write_identity_file(&identity, alt.to_string())
    }

    /// All stored identities for listing, skipping files that fail to parse.
    pub fn load_all(&self) -> Result<Vec<Identity>> {
        let mut out = Vec::new();
        for path in self.identity_files()? {
            match load_identity(&path) {
                Ok(identity) => out.push(identity),
                Err(e) => log::warn!("skipping corrupt identity file {}: {e}", path.display()),
            }
        }
        out.sort_by_key(|identity| identity.id);
        Ok(out)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn identity_files(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.identities_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn identity_path(&self, id: IdentityId) -> PathBuf {
        self.identities_dir.join(format!("{id}.json"))
    }

    fn domain_path(&self, id: IdentityId) -> PathBuf {
        self.domains_dir.join(format!("{id}.json"))
    }

    fn read_identity_file(&self, id: IdentityId) -> Result<IdentityFile> {
        let path = self.identity_path(id);
        if !path.exists() {
            return Err(PinError::NotFound(format!("identity not found: {id}")));
        }
        let file: IdentityFile = read_json(&path)?;
        if file.version != IDENTITY_FILE_VERSION {
            return Err(PinError::StoreFailure(format!(
                "unsupported identity file version {} in {}",
                file.version,
                path.display()
            )));
        }
        Ok(file)
    }

    fn write_identity_file(&self, identity: &Identity, profile_image_alt: String) -> Result<()> {
        let file = IdentityFile {
            version: IDENTITY_FILE_VERSION,
            identity: StoredIdentity::from_identity(identity)?,
            profile_image_alt,
        };
        write_json(&self.identity_path(identity.id), &file)
    }

    fn read_rows(&self, id: IdentityId) -> Result<Vec<DomainVerification>> {
        let path = self.domain_path(id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file: DomainFile = read_json(&path)?;
        if file.version != DOMAIN_FILE_VERSION {
            return Err(PinError::StoreFailure(format!(
                "unsupported domain file version {} in {}",
                file.version,
                path.display()
            )));
        }
        Ok(file.rows)
    }

    fn write_rows(&self, id: IdentityId, mut rows: Vec<DomainVerification>) -> Result<()> {
        rows.sort_by(|a, b| a.domain.cmp(&b.domain));
        let file = DomainFile {
            version: DOMAIN_FILE_VERSION,
            rows,
        };
        write_json(&self.domain_path(id), &file)
    }

    /// First identity matching `pred`. Any unreadable file fails the lookup.
    fn find_identity(&self, pred: impl Fn(&Identity) -> bool) -> Result<Option<Identity>> {
        for path in self.identity_files()? {
            let identity = load_identity(&path)?;
            if pred(&identity) {
                return Ok(Some(identity));
            }
        }
        Ok(None)
    }
}

fn load_identity(path: &Path) -> Result<Identity> {
    let file: IdentityFile = read_json(path)?;
    if file.version != IDENTITY_FILE_VERSION {
        return Err(PinError::StoreFailure(format!(
            "unsupported identity file version {} in {}",
            file.version,
            path.display()
        )));
    }
    file.identity.into_identity()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        PinError::Serialization(format!("failed to parse {}: {e}", path.display()))
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json.as_bytes())?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PinError::Io(e)),
    }
}

// ── Trait implementations ─────────────────────────────────────────────────────

impl IdentityStore for FileStore {
    fn get_by_handle(&self, handle: &str) -> Result<Identity> {
        let wanted = handle.trim().to_lowercase();
        self.find_identity(|identity| identity.handle.as_str() == wanted)?
            .ok_or_else(|| PinError::NotFound(format!("identity not found: {wanted}")))
    }

    fn get_by_id(&self, id: IdentityId) -> Result<Identity> {
        self.read_identity_file(id)?.identity.into_identity()
    }

    fn get_by_private_token(&self, token: &str) -> Result<Identity> {
        let token = token.trim();
        if token.is_empty() {
            return Err(PinError::NotFound("identity not found".into()));
        }
        self.find_identity(|identity| identity.private_token == token)?
            .ok_or_else(|| PinError::NotFound("identity not found".into()))
    }

    fn update(&self, identity: &Identity) -> Result<()> {
        let file = self.read_identity_file(identity.id)?;
        self.write_identity_file(identity, file.profile_image_alt)
    }
}

impl DomainVerificationStore for FileStore {
    fn list_for_identity(&self, identity_id: IdentityId) -> Result<Vec<DomainVerification>> {
        let mut rows = self.read_rows(identity_id)?;
        rows.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(rows)
    }

    fn upsert(
        &self,
        identity_id: IdentityId,
        domain: &str,
        token: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.read_rows(identity_id)?;
        match rows.iter_mut().find(|row| row.domain == domain) {
            Some(row) => row.token = token.to_string(),
            None => rows.push(DomainVerification {
                identity_id,
                domain: domain.to_string(),
                token: token.to_string(),
                verified_at: None,
                created_at,
            }),
        }
        self.write_rows(identity_id, rows)
    }

    fn delete(&self, identity_id: IdentityId, domain: &str) -> Result<()> {
        let mut rows = self.read_rows(identity_id)?;
        let before = rows.len();
        rows.retain(|row| row.domain != domain);
        if rows.len() == before {
            return Ok(());
        }
        self.write_rows(identity_id, rows)
    }

    fn mark_verified(
        &self,
        identity_id: IdentityId,
        domain: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.read_rows(identity_id)?;
        let Some(row) = rows.iter_mut().find(|row| row.domain == domain) else {
            return Ok(());
        };
        row.verified_at = Some(at);
        self.write_rows(identity_id, rows)
    }
}

impl ProfilePictureAltSource for FileStore {
    fn active_alt_text(&self, identity: &Identity) -> String {
        match self.read_identity_file(identity.id) {
            Ok(file) => file.profile_image_alt,
            Err(e) => {
                log::debug!("no alt text for identity {}: {e}", identity.id);
                String::new()
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
