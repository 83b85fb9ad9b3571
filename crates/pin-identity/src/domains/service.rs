//! Domain verification service.
//!
//! Reconciles the set of domains an identity claims with stored rows, runs
//! the live challenge and stamps rows verified. Rows for the same identity
//! are not transactionally isolated: concurrent calls race and the last
//! write wins.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use crate::config::InstanceConfig;
use crate::error::{PinError, Result};
use crate::identity::IdentityId;
use crate::storage::{DomainVerificationStore, IdentityStore};
use crate::time::{Clock, SystemClock};

use super::challenge::{check_domain, ChallengeFetcher};
use super::normalize::{normalize_domain, require_domain};
use super::{verified_domains, DomainVerification};

/// Rows after a mutation plus the names of the verified domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainState {
    pub rows: Vec<DomainVerification>,
    pub verified: Vec<String>,
}

/// Manages claimed domains for identities on one instance.
pub struct DomainService {
    store: Arc<dyn DomainVerificationStore>,
    fetcher: Arc<dyn ChallengeFetcher>,
    clock: Arc<dyn Clock>,
    protected: Option<(IdentityId, String)>,
}

impl DomainService {
    pub fn new(
        store: Arc<dyn DomainVerificationStore>,
        fetcher: Arc<dyn ChallengeFetcher>,
    ) -> Self {
        Self {
            store,
            fetcher,
            clock: Arc::new(SystemClock),
            protected: None,
        }
    }

    /// Replace the clock used for `created_at` / `verified_at` stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the instance's protected domain and the identity that owns it,
    /// as recorded in its configuration.
    pub fn with_protected_domain(mut self, owner: IdentityId, domain: Option<String>) -> Self {
        self.protected = domain
            .as_deref()
            .and_then(normalize_domain)
            .map(|domain| (owner, domain));
        self
    }

    pub fn protected_domain(&self) -> Option<&str> {
        self.protected.as_ref().map(|(_, domain)| domain.as_str())
    }

    /// The protected domain, when `identity_id` is the instance owner.
    fn protected_for(&self, identity_id: IdentityId) -> Option<&str> {
        match &self.protected {
            Some((owner, domain)) if *owner == identity_id => Some(domain),
            _ => None,
        }
    }

    /// Rows of an identity, ordered by domain.
    pub fn list_for_identity(&self, identity_id: IdentityId) -> Result<Vec<DomainVerification>> {
        self.store.list_for_identity(identity_id)
    }

    /// Make the stored rows match `desired`.
    ///
    /// Domains already tracked keep their row and token untouched, new ones
    /// get a token from `tokens`, and tracked domains missing from `desired`
    /// are deleted. The owner's protected domain is never deleted here. Calling this
    /// twice with the same input changes nothing the second time.
    pub fn sync_desired_domains<S: AsRef<str>>(
        &self,
        identity_id: IdentityId,
        desired: &[S],
        tokens: &mut dyn FnMut() -> String,
    ) -> Result<Vec<DomainVerification>> {
        let existing: BTreeMap<String, DomainVerification> = self
            .store
            .list_for_identity(identity_id)?
            .into_iter()
            .map(|row| (row.domain.to_lowercase(), row))
            .collect();

        let mut keep: BTreeSet<String> = BTreeSet::new();
        for raw in desired {
            let Some(domain) = normalize_domain(raw.as_ref()) else {
                continue;
            };
            if !keep.insert(domain.clone()) {
                continue;
            }
            if existing.contains_key(&domain) {
                log::debug!("domain {domain} already tracked for identity {identity_id}");
                continue;
            }
            let token = tokens();
            self.store
                .upsert(identity_id, &domain, &token, self.clock.now())?;
            log::info!("tracking domain {domain} for identity {identity_id}");
        }

        if let Some(protected) = self.protected_for(identity_id) {
            keep.insert(protected.to_string());
        }

        for (domain, row) in &existing {
            if keep.contains(domain) {
                continue;
            }
            self.store.delete(identity_id, &row.domain)?;
            log::info!("dropped domain {} for identity {identity_id}", row.domain);
        }

        self.store.list_for_identity(identity_id)
    }

    /// Insert a fresh row for every domain, replacing tokens of existing ones.
    ///
    /// Used to populate rows from a legacy verified-domain list.
    pub fn seed_domains<S: AsRef<str>>(
        &self,
        identity_id: IdentityId,
        domains: &[S],
        tokens: &mut dyn FnMut() -> String,
    ) -> Result<Vec<DomainVerification>> {
        for raw in domains {
            if let Some(domain) = normalize_domain(raw.as_ref()) {
                self.store
                    .upsert(identity_id, &domain, &tokens(), self.clock.now())?;
            }
        }
        self.store.list_for_identity(identity_id)
    }

    /// Run the live challenge for `domain` and mark it verified on success.
    ///
    /// `NotFound` when the identity has no row for the domain;
    /// `VerificationFailed` when the token could not be retrieved for any
    /// reason, including an elapsed `deadline`.
    pub async fn verify_domain(
        &self,
        identity_id: IdentityId,
        domain: &str,
        deadline: Option<Duration>,
    ) -> Result<DomainState> {
        let domain = require_domain(domain)?;
        let rows = self.store.list_for_identity(identity_id)?;
        let token = rows
            .iter()
            .find(|row| row.domain == domain)
            .map(|row| row.token.clone())
            .ok_or_else(|| PinError::NotFound(format!("domain not found: {domain}")))?;

        if !check_domain(self.fetcher.as_ref(), &domain, &token, deadline).await {
            log::info!("verification of {domain} for identity {identity_id} failed");
            return Err(PinError::VerificationFailed);
        }

        self.store
            .mark_verified(identity_id, &domain, self.clock.now())?;
        log::info!("verified {domain} for identity {identity_id}");

        let rows = self.store.list_for_identity(identity_id)?;
        let mut verified = verified_domains(&rows);
        if !verified.contains(&domain) {
            verified.push(domain);
        }
        Ok(DomainState { rows, verified })
    }

    /// Remove one claimed domain.
    pub fn delete_domain(&self, identity_id: IdentityId, domain: &str) -> Result<DomainState> {
        let domain = require_domain(domain)?;
        self.store.delete(identity_id, &domain)?;
        let rows = self.store.list_for_identity(identity_id)?;
        let verified = verified_domains(&rows)
            .into_iter()
            .filter(|d| !d.eq_ignore_ascii_case(&domain))
            .collect();
        Ok(DomainState { rows, verified })
    }

    /// Register the host serving this instance as its protected domain.
    ///
    /// Does nothing when `base_url` is blank, a protected domain is already
    /// configured, or the owner already tracks the host. Otherwise records
    /// the host in `config` and adds a row for it. The caller persists
    /// `config`. Returns the newly protected domain.
    pub fn ensure_server_domain(
        &mut self,
        config: &mut InstanceConfig,
        tokens: &mut dyn FnMut() -> String,
    ) -> Result<Option<String>> {
        let owner = config.owner_identity_id;
        if config.protected_domain.is_some() {
            self.protected = config
                .protected_domain
                .as_deref()
                .and_then(normalize_domain)
                .map(|domain| (owner, domain));
            return Ok(None);
        }
        let Some(host) = config.base_host() else {
            return Ok(None);
        };
        if self.store.has(owner, &host)? {
            return Ok(None);
        }
        self.store.upsert(owner, &host, &tokens(), self.clock.now())?;
        config.protected_domain = Some(host.clone());
        self.protected = Some((owner, host.clone()));
        log::info!("registered protected domain {host} for identity {owner}");
        Ok(Some(host))
    }
}

/// Copy the verified-domain list onto the identity record.
pub fn record_verified_domains(
    identities: &dyn IdentityStore,
    identity_id: IdentityId,
    verified: &[String],
) -> Result<()> {
    let mut identity = identities.get_by_id(identity_id)?;
    if identity.verified_domains == verified {
        return Ok(());
    }
    identity.verified_domains = verified.to_vec();
    identities.update(&identity)
}
