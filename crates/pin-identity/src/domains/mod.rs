//! Domain verification: claimed domains and their ownership proofs.
//!
//! The domains module provides:
//! - Normalization of free-form domain input
//! - The live `/.well-known/pin-verify` challenge
//! - `DomainService`, which reconciles desired domains with stored rows,
//!   runs challenges and guards the instance's own protected domain

pub mod challenge;
pub mod normalize;
pub mod service;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::IdentityId;

pub use challenge::{check_domain, ChallengeFetcher, FetchError, HttpChallenger, WELL_KNOWN_PATH};
pub use normalize::{normalize_domain, parse_domains, require_domain};
pub use service::{record_verified_domains, DomainService, DomainState};

/// One claimed domain and its challenge token.
///
/// Unique per `(identity_id, domain)`. `verified_at` is set by a successful
/// challenge and only cleared by deleting the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainVerification {
    pub identity_id: IdentityId,
    pub domain: String,
    pub token: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DomainVerification {
    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }
}

/// Names of the verified domains among `rows`, in row order.
pub fn verified_domains(rows: &[DomainVerification]) -> Vec<String> {
    rows.iter()
        .filter(|row| row.is_verified() && !row.domain.trim().is_empty())
        .map(|row| row.domain.clone())
        .collect()
}

/// Comma-separated domain list for display.
pub fn domains_to_text(rows: &[DomainVerification]) -> String {
    rows.iter()
        .map(|row| row.domain.trim())
        .filter(|d| !d.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
