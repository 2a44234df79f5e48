//! Keystone token exchange against a mock server

use std::net::TcpListener;

use casjobs_cli::keystone::get_token;
use casjobs_cli::Error;
use mockito::{Matcher, Server};
use serde_json::json;

fn host(server: &Server) -> String {
    server.url()
}

#[test]
fn extracts_access_token_id() {
    //* Given
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v2.0/tokens")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "auth": {
                "tenantName": "demo",
                "passwordCredentials": {"username": "alice", "password": "pw"}
            }
        })))
        .with_status(200)
        .with_body(r#"{"access": {"token": {"id": "tok-123", "expires": "2030-01-01T00:00:00Z"}, "user": {}}}"#)
        .expect(1)
        .create();

    //* When
    let token = get_token(&host(&server), "demo", "alice", "pw");

    //* Then
    mock.assert();
    assert_eq!(token.expect("token").as_str(), "tok-123");
}

#[test]
fn rejected_credentials_are_reported_with_status() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/v2.0/tokens")
        .with_status(401)
        .with_body(r#"{"error": {"message": "The request you have made requires authentication."}}"#)
        .create();

    let err = get_token(&host(&server), "demo", "alice", "wrong").unwrap_err();

    assert!(matches!(err, Error::InvalidCredentials { status: 401, .. }));
}

#[test]
fn malformed_answer_is_an_auth_service_error() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/v2.0/tokens")
        .with_status(200)
        .with_body(r#"{"access": {}}"#)
        .create();

    let err = get_token(&host(&server), "demo", "alice", "pw").unwrap_err();

    assert!(matches!(err, Error::AuthService(_)));
}

#[test]
fn unreachable_host_is_an_auth_service_error() {
    // reserve a free port, then release it so nothing is listening there
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = get_token(&addr.to_string(), "demo", "alice", "pw").unwrap_err();
    assert!(matches!(err, Error::AuthService(_)));
}
