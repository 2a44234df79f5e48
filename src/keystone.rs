// Keystone v2 identity client. Exchanges tenant/username/password for a
// token. One request per call, no retry: the session decides when to call.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::token::Token;

/// Anything able to mint a fresh token.
pub trait Authenticator {
    fn authenticate(&self) -> Result<Token>;
}

/// Where the Keystone password comes from.
#[derive(Clone)]
pub enum Password {
    Fixed(String),
    /// Ask on the terminal each time authentication is needed.
    Prompt,
}

#[derive(Clone)]
pub struct KeystoneCredentials {
    pub tenant_name: String,
    pub username: String,
    pub password: Password,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthBody<'a> {
    tenant_name: &'a str,
    password_credentials: PasswordCredentials<'a>,
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// Only the `access.token.id` path of the answer is of interest.
#[derive(Deserialize)]
struct AuthResponse {
    access: Access,
}

#[derive(Deserialize)]
struct Access {
    token: TokenInfo,
}

#[derive(Deserialize)]
struct TokenInfo {
    id: String,
}

pub struct KeystoneClient {
    client: Client,
    tokens_url: String,
    credentials: KeystoneCredentials,
}

impl KeystoneClient {
    /// `host` may be a bare `host:port` or a full URL; plain http is assumed
    /// when no scheme is given.
    pub fn new(host: &str, credentials: KeystoneCredentials) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(KeystoneClient {
            client,
            tokens_url: tokens_url(host),
            credentials,
        })
    }

    fn request_token(&self, password: &str) -> Result<Token> {
        let body = AuthRequest {
            auth: AuthBody {
                tenant_name: &self.credentials.tenant_name,
                password_credentials: PasswordCredentials {
                    username: &self.credentials.username,
                    password,
                },
            },
        };

        debug!(url = %self.tokens_url, tenant = %self.credentials.tenant_name, "requesting Keystone token");
        let res = self
            .client
            .post(&self.tokens_url)
            .json(&body)
            .send()
            .map_err(|e| Error::AuthService(format!("{}: {e}", self.tokens_url)))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            return Err(Error::InvalidCredentials {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AuthResponse = res
            .json()
            .map_err(|e| Error::AuthService(format!("unexpected token response: {e}")))?;
        Ok(Token::new(parsed.access.token.id))
    }
}

impl Authenticator for KeystoneClient {
    fn authenticate(&self) -> Result<Token> {
        match &self.credentials.password {
            Password::Fixed(p) => self.request_token(p),
            Password::Prompt => {
                let prompt = format!("Keystone password for {}", self.credentials.username);
                let p = dialoguer::Password::new()
                    .with_prompt(prompt)
                    .interact()
                    .map_err(|e| Error::AuthService(format!("could not read password: {e}")))?;
                self.request_token(&p)
            }
        }
    }
}

/// One-shot form of [`KeystoneClient`]: authenticate against `host` with the
/// given tenant, username and password.
pub fn get_token(host: &str, tenant_name: &str, username: &str, password: &str) -> Result<Token> {
    let credentials = KeystoneCredentials {
        tenant_name: tenant_name.to_string(),
        username: username.to_string(),
        password: Password::Fixed(password.to_string()),
    };
    KeystoneClient::new(host, credentials)?.authenticate()
}

fn tokens_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{host}/v2.0/tokens")
    } else {
        format!("http://{host}/v2.0/tokens")
    }
}
