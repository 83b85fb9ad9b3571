//! Integration test: live domain challenge over HTTP.
//!
//! Runs `HttpChallenger` against a local mock server. The mock only speaks
//! plain HTTP, so every check also exercises the HTTPS-then-HTTP fallback.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pin_identity::domains::{check_domain, normalize_domain, HttpChallenger, WELL_KNOWN_PATH};
use pin_identity::storage::MemoryStore;
use pin_identity::{DomainService, IdentityId, PinError};

const TOKEN: &str = "pin:3f9c2a7e";
const LIMIT: Option<Duration> = Some(Duration::from_secs(10));

async fn serve(body: ResponseTemplate) -> (MockServer, String) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WELL_KNOWN_PATH))
        .respond_with(body)
        .mount(&server)
        .await;
    let domain = normalize_domain(&server.uri()).expect("mock uri has a host");
    (server, domain)
}

#[tokio::test]
async fn challenge_finds_token_over_http_fallback() {
    let (_server, domain) = serve(ResponseTemplate::new(200).set_body_string(TOKEN)).await;
    let fetcher = HttpChallenger::new().unwrap();
    assert!(check_domain(&fetcher, &domain, TOKEN, LIMIT).await);
}

#[tokio::test]
async fn challenge_accepts_token_on_any_line() {
    let body = format!("# pin verification\r\n  {TOKEN}  \r\nother\n");
    let (_server, domain) = serve(ResponseTemplate::new(200).set_body_string(body)).await;
    let fetcher = HttpChallenger::new().unwrap();
    assert!(check_domain(&fetcher, &domain, TOKEN, LIMIT).await);
}

#[tokio::test]
async fn challenge_rejects_substring_match() {
    let body = format!("token={TOKEN}");
    let (_server, domain) = serve(ResponseTemplate::new(200).set_body_string(body)).await;
    let fetcher = HttpChallenger::new().unwrap();
    assert!(!check_domain(&fetcher, &domain, TOKEN, LIMIT).await);
}

#[tokio::test]
async fn challenge_rejects_error_status_even_with_token() {
    let (_server, domain) = serve(ResponseTemplate::new(404).set_body_string(TOKEN)).await;
    let fetcher = HttpChallenger::new().unwrap();
    assert!(!check_domain(&fetcher, &domain, TOKEN, LIMIT).await);
}

#[tokio::test]
async fn challenge_gives_up_at_deadline() {
    let slow = ResponseTemplate::new(200)
        .set_body_string(TOKEN)
        .set_delay(Duration::from_secs(5));
    let (_server, domain) = serve(slow).await;
    let fetcher = HttpChallenger::new().unwrap();
    assert!(!check_domain(&fetcher, &domain, TOKEN, Some(Duration::from_millis(200))).await);
}

#[tokio::test]
async fn domain_service_verifies_against_live_server() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(HttpChallenger::new().unwrap());
    let svc = DomainService::new(store.clone(), fetcher);
    let id = IdentityId(7);

    let (server, domain) = serve(ResponseTemplate::new(200).set_body_string(TOKEN)).await;
    let mut tokens = || TOKEN.to_string();
    svc.sync_desired_domains(id, &[domain.as_str()], &mut tokens)
        .unwrap();

    let state = svc.verify_domain(id, &domain, LIMIT).await.unwrap();
    assert_eq!(state.verified, vec![domain.clone()]);
    assert!(state.rows[0].is_verified());

    // Site taken down: the row stays verified, a re-check fails.
    drop(server);
    let err = svc
        .verify_domain(id, &domain, Some(Duration::from_secs(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, PinError::VerificationFailed));
    assert!(svc.list_for_identity(id).unwrap()[0].is_verified());
}
