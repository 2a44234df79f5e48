//! Token lifecycle end to end: file cache, Keystone, CasJobs, one retry

use casjobs_cli::api::{CasJobsClient, JobService};
use casjobs_cli::keystone::{KeystoneClient, KeystoneCredentials, Password};
use casjobs_cli::session::Session;
use casjobs_cli::token::{FileTokenStore, Token, TokenStore};
use mockito::{Mock, Server};

fn keystone(server: &Server) -> KeystoneClient {
    KeystoneClient::new(
        &server.url(),
        KeystoneCredentials {
            tenant_name: "demo".into(),
            username: "alice".into(),
            password: Password::Fixed("pw".into()),
        },
    )
    .expect("keystone client")
}

fn keystone_mock(server: &mut Server, token: &str, hits: usize) -> Mock {
    server
        .mock("POST", "/v2.0/tokens")
        .with_status(200)
        .with_body(format!(r#"{{"access": {{"token": {{"id": "{token}"}}}}}}"#))
        .expect(hits)
        .create()
}

#[test]
fn missing_cache_authenticates_before_first_request() {
    //* Given
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token");
    let mut server = Server::new();
    let auth = keystone_mock(&mut server, "fresh", 1);
    let query = server
        .mock("POST", "/CasJobs/RestApi/contexts/MyDB/query")
        .match_header("x-auth-token", "fresh")
        .with_status(200)
        .with_body("1")
        .expect(1)
        .create();

    //* When
    let mut session = Session::open(keystone(&server), FileTokenStore::new(&path)).unwrap();
    let api = CasJobsClient::new(&format!("{}/CasJobs", server.url())).unwrap();
    let result = session.with_auth_retry(|token| api.execute_query(token, "MyDB", "select 1"));

    //* Then
    auth.assert();
    query.assert();
    assert_eq!(result.unwrap(), b"1");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh");
}

#[test]
fn stale_cached_token_is_replaced_and_request_replayed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token");
    FileTokenStore::new(&path).save(&Token::new("stale")).unwrap();

    let mut server = Server::new();
    let auth = keystone_mock(&mut server, "fresh", 1);
    let rejected = server
        .mock("DELETE", "/CasJobs/RestApi/jobs/5")
        .match_header("x-auth-token", "stale")
        .with_status(401)
        .expect(1)
        .create();
    let accepted = server
        .mock("DELETE", "/CasJobs/RestApi/jobs/5")
        .match_header("x-auth-token", "fresh")
        .with_status(200)
        .with_body("cancelled")
        .expect(1)
        .create();

    let mut session = Session::open(keystone(&server), FileTokenStore::new(&path)).unwrap();
    let api = CasJobsClient::new(&format!("{}/CasJobs", server.url())).unwrap();
    let job = casjobs_cli::api::JobId("5".into());
    let confirmation = session
        .with_auth_retry(|token| api.cancel_job(token, &job))
        .unwrap();

    auth.assert();
    rejected.assert();
    accepted.assert();
    assert_eq!(confirmation, "cancelled");
    assert_eq!(FileTokenStore::new(&path).load().unwrap().as_str(), "fresh");
}

#[test]
fn repeated_rejection_stops_after_one_retry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token");
    FileTokenStore::new(&path).save(&Token::new("stale")).unwrap();

    let mut server = Server::new();
    let auth = keystone_mock(&mut server, "also-rejected", 1);
    let query = server
        .mock("POST", "/CasJobs/RestApi/contexts/MyDB/query")
        .with_status(401)
        .expect(2)
        .create();

    let mut session = Session::open(keystone(&server), FileTokenStore::new(&path)).unwrap();
    let api = CasJobsClient::new(&format!("{}/CasJobs", server.url())).unwrap();
    let err = session
        .with_auth_retry(|token| api.execute_query(token, "MyDB", "select 1"))
        .unwrap_err();

    auth.assert();
    query.assert();
    assert!(err.is_authorization());
}
