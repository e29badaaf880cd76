#![allow(clippy::unwrap_used)]
// Integration tests for `Session` login/logout using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{basic_auth, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fosrest_api::{
    Credentials, Error, FosClient, FosVersion, RetryPolicy, Session, SessionState, TransportConfig,
};

const TOKEN: &str = "Custom_Basic YWRtaW46eHh4OjE2ZmEyYmQ=";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, FosClient, Session) {
    let server = MockServer::start().await;
    let transport = TransportConfig::default().with_retry(RetryPolicy::immediate(2));
    let client = FosClient::with_client(reqwest::Client::new(), &transport);
    let session = Session::new(Url::parse(&server.uri()).unwrap());
    (server, client, session)
}

fn creds() -> Credentials {
    Credentials::new("admin", SecretString::from("password".to_string()))
}

fn login_ok(version: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Authorization", TOKEN)
        .insert_header(
            "Content-Type",
            format!("application/yang-data+json;version={version}").as_str(),
        )
}

async fn mount_probe(server: &MockServer, vf_enabled: bool) {
    let body = json!({"Response": {"chassis": {"chassis-user-friendly-name": "lab", "vf-enabled": vf_enabled}}});
    Mock::given(method("GET"))
        .and(path("/rest/running/brocade-chassis/chassis"))
        .and(header("Authorization", TOKEN))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/yang-data+json"),
        )
        .mount(server)
        .await;
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .and(basic_auth("admin", "password"))
        .and(header("Accept", "application/yang-data+json"))
        .respond_with(login_ok("9.1.0b"))
        .expect(1)
        .mount(&server)
        .await;
    mount_probe(&server, true).await;

    session.login(&client, creds()).await.unwrap();

    assert!(session.is_active());
    assert_eq!(session.state(), SessionState::LoggedIn);
    assert_eq!(
        session.version(),
        Some(&"9.1.0b".parse::<FosVersion>().unwrap())
    );
    assert!(session.vf_enabled());
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let result = session.login(&client, creds()).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!session.is_active());
    assert_eq!(session.state(), SessionState::LoggedOut);
}

#[tokio::test]
async fn test_login_unreachable() {
    let transport = TransportConfig::default();
    let client = FosClient::with_client(reqwest::Client::new(), &transport);
    let mut session = Session::new(Url::parse("http://127.0.0.1:1").unwrap());

    let result = session.login(&client, creds()).await;

    assert!(
        matches!(result, Err(Error::Unreachable { .. })),
        "expected Unreachable error, got: {result:?}"
    );
    assert!(!session.is_active());
}

#[tokio::test]
async fn test_login_without_token_fails() {
    let (server, client, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/yang-data+json;version=9.1.0"),
        )
        .mount(&server)
        .await;

    let result = session.login(&client, creds()).await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_old_release_is_rejected_and_logged_out() {
    let (server, client, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(login_ok("8.2.1a"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/logout"))
        .and(header("Authorization", TOKEN))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = session.login(&client, creds()).await;

    match result {
        Err(Error::UnsupportedVersion { found, .. }) => assert_eq!(found, "8.2.1a"),
        other => panic!("expected UnsupportedVersion, got: {other:?}"),
    }
    assert!(!session.is_active());
    assert!(session.version().is_none());
}

#[tokio::test]
async fn test_missing_release_is_rejected() {
    let (server, client, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("Authorization", TOKEN))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let result = session.login(&client, creds()).await;

    match result {
        Err(Error::UnsupportedVersion { found, .. }) => assert_eq!(found, "unknown"),
        other => panic!("expected UnsupportedVersion, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_release_from_content_version_header() {
    let (server, client, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Authorization", TOKEN)
                .insert_header("Content-Type", "application/yang-data+json")
                .insert_header("Content-Version", "9.2.0"),
        )
        .mount(&server)
        .await;
    mount_probe(&server, false).await;

    session.login(&client, creds()).await.unwrap();
    assert_eq!(session.version().unwrap().to_string(), "9.2.0");
    assert!(!session.vf_enabled());
}

#[tokio::test]
async fn test_custom_minimum_version() {
    let (server, client, _) = setup().await;
    let mut session = Session::new(Url::parse(&server.uri()).unwrap())
        .with_minimum_version("9.0.0".parse().unwrap());

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(login_ok("8.2.2"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let result = session.login(&client, creds()).await;
    assert!(matches!(result, Err(Error::UnsupportedVersion { .. })));
}

#[tokio::test]
async fn test_probe_failure_means_vf_disabled() {
    let (server, client, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(login_ok("9.1.0"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/running/brocade-chassis/chassis"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    session.login(&client, creds()).await.unwrap();

    assert!(session.is_active());
    assert!(!session.vf_enabled());
}

#[tokio::test]
async fn test_double_login_is_a_config_error() {
    let (server, client, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(login_ok("9.1.0"))
        .expect(1)
        .mount(&server)
        .await;
    mount_probe(&server, false).await;

    session.login(&client, creds()).await.unwrap();
    let result = session.login(&client, creds()).await;

    assert!(matches!(result, Err(Error::Config { .. })));
    assert!(session.is_active());
}

// ── Logout ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_clears_session() {
    let (server, client, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(login_ok("9.1.0"))
        .mount(&server)
        .await;
    mount_probe(&server, false).await;
    Mock::given(method("POST"))
        .and(path("/rest/logout"))
        .and(header("Authorization", TOKEN))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    session.login(&client, creds()).await.unwrap();
    session.logout(&client).await;

    assert!(!session.is_active());
    assert_eq!(session.state(), SessionState::LoggedOut);
    assert!(session.version().is_none());

    // Already logged out: nothing is sent.
    session.logout(&client).await;
}

#[tokio::test]
async fn test_logout_failure_still_clears_session() {
    let (server, client, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(login_ok("9.1.0"))
        .mount(&server)
        .await;
    mount_probe(&server, false).await;
    Mock::given(method("POST"))
        .and(path("/rest/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    session.login(&client, creds()).await.unwrap();
    session.logout(&client).await;

    assert!(!session.is_active());
}
