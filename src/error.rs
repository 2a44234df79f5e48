// Error taxonomy shared by every layer of the client.
// Only `Authorization` is ever recovered from (once, by the session);
// everything else propagates to the command layer.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The batch-query service rejected the current token (HTTP 401).
    #[error("the CasJobs service rejected the current token")]
    Authorization,

    /// Keystone refused the configured tenant/username/password.
    #[error("Keystone rejected the credentials: {status} - {body}")]
    InvalidCredentials { status: u16, body: String },

    /// Keystone could not be reached or answered with something unreadable.
    #[error("Keystone request failed: {0}")]
    AuthService(String),

    /// Any other non-success answer from the batch-query service.
    #[error("CasJobs request failed: {status} - {body}")]
    Service { status: u16, body: String },

    /// No token has ever been persisted at this location.
    #[error("no cached token at {}", .0.display())]
    TokenNotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True when the failure means "get a new token and try again".
    pub fn is_authorization(&self) -> bool {
        matches!(self, Error::Authorization)
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
