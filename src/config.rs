// Configuration file: where the CasJobs REST root lives and how to log in
// to Keystone. Read once at startup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::keystone::{KeystoneCredentials, Password};
use crate::token::FileTokenStore;

pub const CONFIG_FILE_NAME: &str = "cjclient.toml";
pub const URL_ENV: &str = "CASJOBS_URL";
pub const PASSWORD_ENV: &str = "KEYSTONE_PASSWORD";

#[derive(Deserialize, Clone, Debug)]
pub struct AppConfig {
    pub casjobs: CasJobsConfig,
    pub keystone: KeystoneConfig,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CasJobsConfig {
    /// CasJobs root, e.g. `http://host/CasJobs`.
    pub url: String,
    pub token_file: Option<PathBuf>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct KeystoneConfig {
    pub host: String,
    pub tenant_name: String,
    pub username: String,
    pub password: Option<String>,
}

impl AppConfig {
    pub fn from_toml(data: &str) -> Result<Self> {
        toml::from_str(data).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read `path`, then apply the environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "config file not found at {}\n\n\
                 Please create it with the following format:\n\n\
                 [casjobs]\n\
                 url = \"http://host/CasJobs\"\n\n\
                 [keystone]\n\
                 host = \"keystone-host:5000\"\n\
                 tenant_name = \"...\"\n\
                 username = \"...\"\n\
                 password = \"...\"",
                path.display()
            )));
        }
        let data = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut config = Self::from_toml(&data)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(URL_ENV) {
            self.casjobs.url = url;
        }
        if self.keystone.password.is_none() {
            self.keystone.password = var(PASSWORD_ENV);
        }
    }

    pub fn token_store(&self) -> FileTokenStore {
        let path = self
            .casjobs
            .token_file
            .clone()
            .unwrap_or_else(FileTokenStore::default_path);
        FileTokenStore::new(path)
    }

    pub fn credentials(&self) -> KeystoneCredentials {
        KeystoneCredentials {
            tenant_name: self.keystone.tenant_name.clone(),
            username: self.keystone.username.clone(),
            password: match &self.keystone.password {
                Some(p) => Password::Fixed(p.clone()),
                None => Password::Prompt,
            },
        }
    }
}

/// `explicit` if given, else `./cjclient.toml`, else the per-user config dir.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("cjclient").join("config.toml"))
        .unwrap_or(local)
}
