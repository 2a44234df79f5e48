// Authenticated session: owns the one token of the process and replays an
// operation once after re-authenticating when the service rejects it.

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::keystone::Authenticator;
use crate::token::{Token, TokenStore};

pub struct Session<A, S> {
    authenticator: A,
    store: S,
    token: Token,
}

impl<A: Authenticator, S: TokenStore> Session<A, S> {
    /// Start from the cached token, or authenticate right away when there is
    /// none. A freshly minted token is persisted before this returns.
    pub fn open(authenticator: A, store: S) -> Result<Self> {
        let token = match store.load() {
            Ok(token) => token,
            Err(Error::TokenNotFound(path)) => {
                info!(path = %path.display(), "no cached token, authenticating");
                let token = authenticator.authenticate()?;
                store.save(&token)?;
                token
            }
            Err(e) => return Err(e),
        };
        Ok(Session {
            authenticator,
            store,
            token,
        })
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Mint a new token, persist it, then make it current.
    pub fn refresh(&mut self) -> Result<()> {
        let token = self.authenticator.authenticate()?;
        self.store.save(&token)?;
        info!("stored a new Keystone token");
        self.token = token;
        Ok(())
    }

    /// Run `op` with the current token. If it fails with
    /// [`Error::Authorization`], refresh once and run it again with the new
    /// token; a second rejection is returned as is.
    ///
    /// `op` may therefore be invoked twice and must be safe to repeat after a
    /// rejected first attempt.
    pub fn with_auth_retry<T, F>(&mut self, mut op: F) -> Result<T>
    where
        F: FnMut(&Token) -> Result<T>,
    {
        match op(&self.token) {
            Err(e) if e.is_authorization() => {
                warn!("token rejected, re-authenticating");
                self.refresh()?;
                op(&self.token)
            }
            other => other,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_parts(self) -> (A, S) {
        (self.authenticator, self.store)
    }
}
