//! In-process store backing all three storage traits.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::domains::DomainVerification;
use crate::error::{PinError, Result};
use crate::identity::{Identity, IdentityId};

use super::{DomainVerificationStore, IdentityStore, ProfilePictureAltSource};

/// Thread-safe map-backed store. Rows are keyed by `(identity, domain)`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    identities: RwLock<BTreeMap<IdentityId, Identity>>,
    rows: RwLock<BTreeMap<(IdentityId, String), DomainVerification>>,
    alt_texts: RwLock<BTreeMap<IdentityId, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an identity.
    pub fn insert_identity(&self, identity: Identity) -> Result<()> {
        write(&self.identities)?.insert(identity.id, identity);
        Ok(())
    }

    /// Remove an identity together with its verification rows and alt text.
    pub fn delete_identity(&self, id: IdentityId) -> Result<()> {
        write(&self.identities)?.remove(&id);
        write(&self.rows)?.retain(|(owner, _), _| *owner != id);
        write(&self.alt_texts)?.remove(&id);
        Ok(())
    }

    /// Set the alt text of the identity's active profile picture.
    pub fn set_alt_text(&self, id: IdentityId, alt: impl Into<String>) -> Result<()> {
        write(&self.alt_texts)?.insert(id, alt.into());
        Ok(())
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| PinError::StoreFailure("memory store lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| PinError::StoreFailure("memory store lock poisoned".into()))
}

impl IdentityStore for MemoryStore {
    fn get_by_handle(&self, handle: &str) -> Result<Identity> {
        let wanted = handle.trim().to_lowercase();
        read(&self.identities)?
            .values()
            .find(|identity| identity.handle.as_str() == wanted)
            .cloned()
            .ok_or_else(|| PinError::NotFound(format!("identity not found: {wanted}")))
    }

    fn get_by_id(&self, id: IdentityId) -> Result<Identity> {
        read(&self.identities)?
            .get(&id)
            .cloned()
            .ok_or_else(|| PinError::NotFound(format!("identity not found: {id}")))
    }

    fn get_by_private_token(&self, token: &str) -> Result<Identity> {
        let token = token.trim();
        if token.is_empty() {
            return Err(PinError::NotFound("identity not found".into()));
        }
        read(&self.identities)?
            .values()
            .find(|identity| identity.private_token == token)
            .cloned()
            .ok_or_else(|| PinError::NotFound("identity not found".into()))
    }

    fn update(&self, identity: &Identity) -> Result<()> {
        let mut map = write(&self.identities)?;
        match map.get_mut(&identity.id) {
            Some(slot) => {
                *slot = identity.clone();
                Ok(())
            }
            None => Err(PinError::NotFound(format!(
                "identity not found: {}",
                identity.id
            ))),
        }
    }
}

impl DomainVerificationStore for MemoryStore {
    fn list_for_identity(&self, identity_id: IdentityId) -> Result<Vec<DomainVerification>> {
        // BTreeMap keys order rows by domain within one identity.
        Ok(read(&self.rows)?
            .range((identity_id, String::new())..)
            .take_while(|((owner, _), _)| *owner == identity_id)
            .map(|(_, row)| row.clone())
            .collect())
    }

    fn upsert(
        &self,
        identity_id: IdentityId,
        domain: &str,
        token: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = write(&self.rows)?;
        rows.entry((identity_id, domain.to_string()))
            .and_modify(|row| row.token = token.to_string())
            .or_insert_with(|| DomainVerification {
                identity_id,
                domain: domain.to_string(),
                token: token.to_string(),
                verified_at: None,
                created_at,
            });
        Ok(())
    }

    fn delete(&self, identity_id: IdentityId, domain: &str) -> Result<()> {
        write(&self.rows)?.remove(&(identity_id, domain.to_string()));
        Ok(())
    }

    fn mark_verified(
        &self,
        identity_id: IdentityId,
        domain: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(row) = write(&self.rows)?.get_mut(&(identity_id, domain.to_string())) {
            row.verified_at = Some(at);
        }
        Ok(())
    }

    fn has(&self, identity_id: IdentityId, domain: &str) -> Result<bool> {
        Ok(read(&self.rows)?.contains_key(&(identity_id, domain.to_string())))
    }
}

impl ProfilePictureAltSource for MemoryStore {
    fn active_alt_text(&self, identity: &Identity) -> String {
        self.alt_texts
            .read()
            .ok()
            .and_then(|map| map.get(&identity.id).cloned())
            .unwrap_or_default()
    }
}
