//! Stress test: many threads render the same identity at once; every
//! render of a view must be byte-identical and carry the same rev.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use pin_identity::export::{Envelope, ExportFormat, ExportService};
use pin_identity::identity::{Handle, Identity, IdentityId, Link, Visibility};
use pin_identity::storage::{DomainVerificationStore, MemoryStore};
use pin_identity::time::{Clock, FixedClock};

fn seeded_service() -> ExportService {
    let store = Arc::new(MemoryStore::new());
    let mut identity = Identity::new(IdentityId(1), Handle::parse("dana").unwrap());
    identity.display_name = "Dana".into();
    identity.email = "dana@example.com".into();
    identity.private_token = "pin:dana".into();
    identity.links = (0..50)
        .map(|i| Link::new(format!("l{i}"), format!("https://l{i}.example")))
        .collect();
    for label in ["btc", "eth", "sol", "xrp"] {
        identity.wallets.insert(label.into(), format!("{label}-addr"));
    }
    identity.visibility.set("link:3", Visibility::Private);
    store.insert_identity(identity).unwrap();

    let clock = Arc::new(FixedClock::from_unix(1_700_000_000));
    store
        .upsert(IdentityId(1), "dana.dev", "pin:t", clock.now())
        .unwrap();
    store
        .mark_verified(IdentityId(1), "dana.dev", clock.now())
        .unwrap();

    ExportService::new(store.clone(), store.clone(), store, "https://pin.example").with_clock(clock)
}

#[test]
fn stress_100_threads_same_public_rev() {
    let svc = Arc::new(seeded_service());
    let handles: Vec<_> = (0..100)
        .map(|_| {
            let svc = Arc::clone(&svc);
            thread::spawn(move || svc.render_public("dana.json", None).unwrap().body)
        })
        .collect();

    let bodies: BTreeSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(bodies.len(), 1, "concurrent renders diverged");

    let envelope: Envelope = serde_json::from_str(bodies.iter().next().unwrap()).unwrap();
    assert!(envelope.meta.rev.starts_with("sha256:"));
    assert_eq!(envelope.identity.links.len(), 49);
    assert_eq!(envelope.identity.verified_domains, vec!["dana.dev"]);
}

#[test]
fn stress_mixed_views_and_formats_in_parallel() {
    let svc = Arc::new(seeded_service());
    let handles: Vec<_> = (0..200)
        .map(|i| {
            let svc = Arc::clone(&svc);
            thread::spawn(move || {
                let format = ExportFormat::ALL[i % ExportFormat::ALL.len()];
                let out = if i % 2 == 0 {
                    svc.render_public(&format!("dana.{}", format.extension().unwrap_or("json")), None)
                } else {
                    svc.render_private("pin:dana", None)
                }
                .unwrap();
                (i % 2 == 0, out.body)
            })
        })
        .collect();

    let mut public = BTreeSet::new();
    let mut private = BTreeSet::new();
    for handle in handles {
        let (is_public, body) = handle.join().unwrap();
        if is_public {
            assert!(!body.contains("dana@example.com"));
            assert!(!body.contains("pin:dana"));
            public.insert(body);
        } else {
            assert!(body.contains("dana@example.com"));
            private.insert(body);
        }
    }
    assert_eq!(private.len(), 1);
    // One distinct body per format reachable through an extension.
    assert!(public.len() <= ExportFormat::ALL.len());
}
