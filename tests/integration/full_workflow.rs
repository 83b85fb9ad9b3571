//! Integration test: full end-to-end workflow.
//!
//! Tests the complete lifecycle:
//! 1. Create an identity and claim a domain
//! 2. Verify the domain against a canned challenge endpoint
//! 3. Reject verification of an unclaimed domain
//! 4. Apply visibility flags to scalar fields and links
//! 5. Export in every format and check the content hash

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pin_identity::domains::{record_verified_domains, ChallengeFetcher, FetchError};
use pin_identity::export::{
    build_envelope, compute_rev, Envelope, EnvelopeContext, ExportFormat, ExportService,
};
use pin_identity::identity::{Handle, Identity, IdentityId, Link, Visibility};
use pin_identity::projection::{project, View};
use pin_identity::storage::{DomainVerificationStore, FileStore, IdentityStore, MemoryStore};
use pin_identity::time::{Clock, FixedClock};
use pin_identity::{DomainService, PinError};

const ALICE: IdentityId = IdentityId(1);

/// Serves whatever body is currently registered for a URL.
#[derive(Default)]
struct StaticSite {
    pages: Mutex<BTreeMap<String, String>>,
}

impl StaticSite {
    fn serve(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }
}

#[async_trait]
impl ChallengeFetcher for StaticSite {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

fn alice() -> Identity {
    let mut identity = Identity::new(ALICE, Handle::parse("alice").unwrap());
    identity.display_name = "Alice".into();
    identity.email = "a@b.com".into();
    identity.private_token = "pin:alice-private".into();
    identity.updated_at = Some(FixedClock::from_unix(1_735_689_600).now());
    identity
}

fn counter() -> impl FnMut() -> String {
    let mut n = 0;
    move || {
        n += 1;
        format!("pin:token-{n}")
    }
}

#[tokio::test]
async fn full_workflow_claim_verify_export() {
    let store = Arc::new(MemoryStore::new());
    store.insert_identity(alice()).unwrap();
    let site = Arc::new(StaticSite::default());
    let clock = Arc::new(FixedClock::from_unix(1_750_000_000));
    let domains = DomainService::new(store.clone(), site.clone()).with_clock(clock.clone());

    // ── Step 1: Claim a domain ──────────────────────────────────────────
    let mut tokens = counter();
    let rows = domains
        .sync_desired_domains(ALICE, &["example.com"], &mut tokens)
        .expect("sync should succeed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].domain, "example.com");
    assert!(!rows[0].token.is_empty());
    assert!(!rows[0].is_verified());
    let token = rows[0].token.clone();

    // ── Step 2: Verify it ───────────────────────────────────────────────
    site.serve(
        "https://example.com/.well-known/pin-verify",
        &format!("{token}\n"),
    );
    let state = domains
        .verify_domain(ALICE, "example.com", None)
        .await
        .expect("verification should succeed");
    assert_eq!(state.verified, vec!["example.com"]);
    assert_eq!(state.rows[0].verified_at, Some(clock.now()));
    record_verified_domains(store.as_ref(), ALICE, &state.verified).unwrap();
    assert_eq!(
        store.get_by_id(ALICE).unwrap().verified_domains,
        vec!["example.com"]
    );

    // ── Step 3: Unclaimed domain ────────────────────────────────────────
    let err = domains
        .verify_domain(ALICE, "missing.com", None)
        .await
        .unwrap_err();
    assert!(matches!(err, PinError::NotFound(_)));

    // ── Step 4: Export ──────────────────────────────────────────────────
    let exports = ExportService::new(store.clone(), store.clone(), store.clone(), "https://pin.example")
        .with_clock(clock.clone());
    let public = exports.render_public("alice.json", None).unwrap();
    let envelope: Envelope = serde_json::from_str(&public.body).unwrap();
    assert_eq!(envelope.identity.verified_domains, vec!["example.com"]);
    assert_eq!(envelope.identity.email, "");

    let private = exports
        .render_private("pin:alice-private", Some("https://pin.example/p/pin:alice-private"))
        .unwrap();
    let envelope: Envelope = serde_json::from_str(&private.body).unwrap();
    assert_eq!(envelope.identity.email, "a@b.com");
    assert_eq!(envelope.meta.view, View::Private);

    for format in [ExportFormat::Xml, ExportFormat::Text, ExportFormat::VCard] {
        let ident = format!("alice.{}", format.extension().unwrap());
        let out = exports.render_public(&ident, None).unwrap();
        assert_eq!(out.format, format);
        assert!(out.body.contains("example.com") || format == ExportFormat::VCard);
        assert!(!out.body.contains("a@b.com"), "{format} leaked a private email");
    }
}

#[tokio::test]
async fn full_workflow_sync_is_idempotent_and_keeps_verification() {
    let store = Arc::new(MemoryStore::new());
    let site = Arc::new(StaticSite::default());
    let domains = DomainService::new(store.clone(), site.clone());
    let mut tokens = counter();

    let first = domains
        .sync_desired_domains(ALICE, &["example.com", "example.org"], &mut tokens)
        .unwrap();
    site.serve("http://example.org/.well-known/pin-verify", &first[1].token);
    domains.verify_domain(ALICE, "example.org", None).await.unwrap();

    let second = domains
        .sync_desired_domains(ALICE, &["EXAMPLE.org", "https://example.com/"], &mut tokens)
        .unwrap();
    assert_eq!(second.len(), 2);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.token, b.token, "token for {} rotated", a.domain);
    }
    assert!(second[1].is_verified());
}

#[test]
fn full_workflow_visibility_scenarios() {
    // Explicit private flag on email.
    let mut identity = alice();
    identity.visibility.set("email", Visibility::Private);
    assert_eq!(project(&identity, View::Public).identity.email, "");
    assert_eq!(project(&identity, View::Private).identity.email, "a@b.com");

    // Indexed private link.
    identity.links = vec![Link::new("A", "https://a.example"), Link::new("B", "https://b.example")];
    identity.visibility.set("link:1", Visibility::Private);
    let public = project(&identity, View::Public);
    let labels: Vec<_> = public.identity.links.iter().map(|l| l.label.as_str()).collect();
    assert_eq!(labels, vec!["A"]);
}

#[test]
fn full_workflow_rev_is_order_independent() {
    let ctx = EnvelopeContext {
        base_url: "https://pin.example",
        profile_image_alt: "",
        now: FixedClock::from_unix(0).now(),
    };

    let mut one = alice();
    one.wallets.insert("btc".into(), "1".into());
    one.wallets.insert("eth".into(), "2".into());
    let mut two = alice();
    two.wallets.insert("eth".into(), "2".into());
    two.wallets.insert("btc".into(), "1".into());

    let a = build_envelope(&project(&one, View::Public), View::Public, &ctx, None).unwrap();
    let b = build_envelope(&project(&two, View::Public), View::Public, &ctx, None).unwrap();
    assert_eq!(a.meta.rev, b.meta.rev);

    // A payload read back from JSON hashes the same.
    let json = serde_json::to_string(&a).unwrap();
    let reread: Envelope = serde_json::from_str(&json).unwrap();
    assert_eq!(compute_rev(&reread.identity).unwrap(), a.meta.rev);
}

#[test]
fn full_workflow_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let mut tokens = counter();
    {
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        store.insert_identity(&alice()).unwrap();
        let domains = DomainService::new(store.clone(), Arc::new(StaticSite::default()));
        domains
            .sync_desired_domains(ALICE, &["example.com"], &mut tokens)
            .unwrap();
    }

    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    assert_eq!(store.get_by_handle("alice").unwrap().email, "a@b.com");
    assert_eq!(store.list_for_identity(ALICE).unwrap()[0].token, "pin:token-1");

    store.delete_identity(ALICE).unwrap();
    assert!(store.list_for_identity(ALICE).unwrap().is_empty());
}

#[test]
fn full_workflow_corrupt_file_store_is_not_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    store.insert_identity(&alice()).unwrap();
    std::fs::write(dir.path().join("identities").join("2.json"), "{ truncated").unwrap();

    let svc = ExportService::new(store.clone(), store.clone(), store, "https://pin.example");

    // Files are scanned in order, so alice is found before the corrupt file.
    assert!(svc.render_public("alice", None).is_ok());

    let err = svc.render_public("bob.vcf", None).unwrap_err();
    assert!(err.is_store_failure(), "got {err:?}");
    let err = svc.render_private("pin:missing", None).unwrap_err();
    assert!(err.is_store_failure(), "got {err:?}");
}
