// Token persistence: a single plain-text file holding the current
// Keystone token. Nothing else (expiry, scope) is stored.

use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Opaque bearer token issued by Keystone.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Token(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Single-slot durable storage for the token.
pub trait TokenStore {
    /// Returns the stored token, or [`Error::TokenNotFound`] if none was saved.
    fn load(&self) -> Result<Token>;

    /// Replaces the stored token. Must be durable when this returns.
    fn save(&self, token: &Token) -> Result<()>;
}

/// Token store backed by one file on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTokenStore { path: path.into() }
    }

    /// `~/.casjobs_token`, or `./.casjobs_token` when there is no home dir.
    pub fn default_path() -> PathBuf {
        let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.join(".casjobs_token")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "token".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Token> {
        match fs::read_to_string(&self.path) {
            Ok(data) if data.is_empty() => Err(Error::TokenNotFound(self.path.clone())),
            Ok(data) => Ok(Token(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::TokenNotFound(self.path.clone()))
            }
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }

    fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        // Write next to the target and rename over it so readers never
        // observe a half-written token.
        let tmp = self.temp_path();
        let mut file = open_private(&tmp).map_err(|e| Error::io(&tmp, e))?;
        file.write_all(token.as_str().as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| Error::io(&tmp, e))?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(|e| Error::io(&self.path, e))?;

        debug!(path = %self.path.display(), "token saved");
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}
