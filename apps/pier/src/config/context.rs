use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use super::ConfigError;

const CONTEXT_DIR: &str = ".pier";
const CONTEXT_FILE: &str = "contexts.toml";

/// Connection details for one named server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerContext {
    pub server_addr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub tls_skip_verify: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStore {
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub contexts: BTreeMap<String, ServerContext>,
}

impl ContextStore {
    pub fn path() -> Result<PathBuf, ConfigError> {
        let base = BaseDirs::new().ok_or(ConfigError::NoHomeDir)?;
        Ok(base.home_dir().join(CONTEXT_DIR).join(CONTEXT_FILE))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(ContextStore::default());
        }
        let raw = fs::read_to_string(path)?;
        let mut store: ContextStore = toml::from_str(&raw)?;
        store.compact();
        Ok(store)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Writes the store; tokens live here so the file is owner-only on unix.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = toml::to_string_pretty(self)?;
        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(serialized.as_bytes())?;
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.contexts.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ServerContext> {
        self.contexts.get(name)
    }

    pub fn upsert(&mut self, name: String, context: ServerContext, set_current: bool) {
        self.contexts.insert(name.clone(), context);
        if set_current || self.current.is_none() {
            self.current = Some(name);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<ServerContext> {
        let removed = self.contexts.remove(name);
        if self.current.as_deref() == Some(name) {
            self.current = self.contexts.keys().next().cloned();
        }
        removed
    }

    pub fn set_current(&mut self, name: Option<String>) -> Result<(), ConfigError> {
        if let Some(name_ref) = name.as_ref() {
            if !self.contexts.contains_key(name_ref) {
                return Err(ConfigError::ContextNotFound(name_ref.clone()));
            }
        }
        self.current = name;
        Ok(())
    }

    fn compact(&mut self) {
        if let Some(current) = self.current.clone() {
            if !self.contexts.contains_key(&current) {
                self.current = self.contexts.keys().next().cloned();
            }
        }
    }
}
