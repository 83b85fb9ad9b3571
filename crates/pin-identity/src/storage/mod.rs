//! Storage collaborators for identities and domain verification rows.
//!
//! The engine only talks to the narrow traits below. Two implementations
//! ship with the crate:
//!
//! - [`memory`]: `MemoryStore`, an in-process store for tests and embedding.
//! - [`file_store`]: `FileStore`, versioned JSON files on disk:
//!
//! ```text
//! {base_dir}/
//! ├── identities/
//! │   └── {identity_id}.json     # identity record incl. visibility document
//! └── domains/
//!     └── {identity_id}.json     # every verification row of that identity
//! ```
//!
//! Both delete an identity's verification rows together with the identity.

pub mod file_store;
pub mod memory;

use chrono::{DateTime, Utc};

use crate::domains::DomainVerification;
use crate::error::Result;
use crate::identity::{Identity, IdentityId};

pub use file_store::FileStore;
pub use memory::MemoryStore;

/// Identity lookups and updates.
pub trait IdentityStore: Send + Sync {
    /// Case-insensitive lookup. `NotFound` when no identity has the handle.
    fn get_by_handle(&self, handle: &str) -> Result<Identity>;

    fn get_by_id(&self, id: IdentityId) -> Result<Identity>;

    /// Lookup by private capability token. Blank tokens never match.
    fn get_by_private_token(&self, token: &str) -> Result<Identity>;

    /// Persist every field, including the visibility map. `NotFound` for an unknown id.
    fn update(&self, identity: &Identity) -> Result<()>;
}

/// Persistence for domain verification rows, unique per `(identity, domain)`.
pub trait DomainVerificationStore: Send + Sync {
    /// Rows of one identity ordered by domain ascending.
    fn list_for_identity(&self, identity_id: IdentityId) -> Result<Vec<DomainVerification>>;

    /// Insert a row, or replace the token of an existing one.
    fn upsert(
        &self,
        identity_id: IdentityId,
        domain: &str,
        token: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Remove a row. Removing a missing row is not an error.
    fn delete(&self, identity_id: IdentityId, domain: &str) -> Result<()>;

    /// Stamp a row verified. A missing row is left missing.
    fn mark_verified(&self, identity_id: IdentityId, domain: &str, at: DateTime<Utc>)
        -> Result<()>;

    fn has(&self, identity_id: IdentityId, domain: &str) -> Result<bool> {
        Ok(self
            .list_for_identity(identity_id)?
            .iter()
            .any(|row| row.domain == domain))
    }
}

/// Alt text of an identity's active profile picture (empty when none).
pub trait ProfilePictureAltSource: Send + Sync {
    fn active_alt_text(&self, identity: &Identity) -> String;
}
