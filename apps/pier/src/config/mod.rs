use std::env;

use thiserror::Error;
use url::Url;

pub mod context;

pub use context::{ContextStore, ServerContext};

pub const DEFAULT_SERVER_ADDR: &str = "https://localhost:9702";
pub const DEFAULT_EXEC_PATH: &str = "/v1/exec";

pub const ENV_SERVER_ADDR: &str = "PIER_SERVER_ADDR";
pub const ENV_TOKEN: &str = "PIER_TOKEN";
pub const ENV_CONTEXT: &str = "PIER_CONTEXT";
pub const ENV_EXEC_PATH: &str = "PIER_EXEC_PATH";
pub const ENV_TLS_SKIP_VERIFY: &str = "PIER_TLS_SKIP_VERIFY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("context file error: {0}")]
    Toml(String),
    #[error("unable to determine home directory")]
    NoHomeDir,
    #[error("context '{0}' not found")]
    ContextNotFound(String),
    #[error("invalid server address '{addr}': {reason}")]
    InvalidServerAddr { addr: String, reason: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Toml(value.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        ConfigError::Toml(value.to_string())
    }
}

/// Values supplied on the command line; each one wins over env and context.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server_addr: Option<String>,
    pub token: Option<String>,
    pub context: Option<String>,
    pub exec_path: Option<String>,
    pub tls_skip_verify: Option<bool>,
}

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server_addr: String,
    pub token: Option<String>,
    pub exec_path: String,
    pub tls_skip_verify: bool,
    /// Name of the context the values were drawn from, if any.
    pub context: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            token: None,
            exec_path: DEFAULT_EXEC_PATH.to_string(),
            tls_skip_verify: false,
            context: None,
        }
    }
}

impl Config {
    /// Resolves flags, then environment, then the selected context, then defaults.
    pub fn resolve(overrides: &Overrides, store: &ContextStore) -> Result<Self, ConfigError> {
        Self::resolve_with(overrides, store, |key| env::var(key).ok())
    }

    pub fn resolve_with<F>(
        overrides: &Overrides,
        store: &ContextStore,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let requested = overrides.context.clone().or_else(|| env_value(ENV_CONTEXT));
        let (context_name, context) = match requested {
            Some(name) => {
                let ctx = store
                    .get(&name)
                    .ok_or_else(|| ConfigError::ContextNotFound(name.clone()))?;
                (Some(name), Some(ctx))
            }
            None => match store.current.as_deref() {
                Some(name) => (store.get(name).map(|_| name.to_string()), store.get(name)),
                None => (None, None),
            },
        };

        let server_addr = overrides
            .server_addr
            .clone()
            .or_else(|| env_value(ENV_SERVER_ADDR))
            .or_else(|| context.map(|ctx| ctx.server_addr.clone()))
            .unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());
        let token = overrides
            .token
            .clone()
            .or_else(|| env_value(ENV_TOKEN))
            .or_else(|| context.and_then(|ctx| ctx.token.clone()));
        let exec_path = overrides
            .exec_path
            .clone()
            .or_else(|| env_value(ENV_EXEC_PATH))
            .unwrap_or_else(|| DEFAULT_EXEC_PATH.to_string());
        let tls_skip_verify = overrides
            .tls_skip_verify
            .or_else(|| env_value(ENV_TLS_SKIP_VERIFY).map(|value| parse_flag(&value)))
            .or_else(|| context.map(|ctx| ctx.tls_skip_verify))
            .unwrap_or(false);

        Ok(Self {
            server_addr,
            token,
            exec_path,
            tls_skip_verify,
            context: context_name,
        })
    }

    /// Base URL for gRPC-Web calls.
    pub fn http_base(&self) -> Result<Url, ConfigError> {
        let raw = self.server_addr.trim().trim_end_matches('/');
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };
        // Normalize localhost to IPv4 to avoid IPv6 (::1) preference on macOS
        let normalized = with_scheme.replacen("://localhost", "://127.0.0.1", 1);
        let url = Url::parse(&normalized).map_err(|err| ConfigError::InvalidServerAddr {
            addr: self.server_addr.clone(),
            reason: err.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidServerAddr {
                addr: self.server_addr.clone(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    /// WebSocket endpoint for the exec stream, derived from the HTTP base.
    pub fn exec_url(&self) -> Result<Url, ConfigError> {
        let mut url = self.http_base()?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| ConfigError::InvalidServerAddr {
                addr: self.server_addr.clone(),
                reason: format!("cannot switch to {scheme}"),
            })?;
        url.set_path(&self.exec_path);
        Ok(url)
    }
}

pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn store_with(name: &str, addr: &str, token: Option<&str>) -> ContextStore {
        let mut store = ContextStore::default();
        store.upsert(
            name.to_string(),
            ServerContext {
                server_addr: addr.to_string(),
                token: token.map(str::to_string),
                tls_skip_verify: true,
            },
            true,
        );
        store
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config =
            Config::resolve_with(&Overrides::default(), &ContextStore::default(), lookup(&[]))
                .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn precedence_is_flag_then_env_then_context() {
        let store = store_with("prod", "pier.example.com:9702", Some("ctx-token"));

        let from_context =
            Config::resolve_with(&Overrides::default(), &store, lookup(&[])).unwrap();
        assert_eq!(from_context.server_addr, "pier.example.com:9702");
        assert_eq!(from_context.token.as_deref(), Some("ctx-token"));
        assert!(from_context.tls_skip_verify);
        assert_eq!(from_context.context.as_deref(), Some("prod"));

        let from_env = Config::resolve_with(
            &Overrides::default(),
            &store,
            lookup(&[(ENV_TOKEN, "env-token"), (ENV_TLS_SKIP_VERIFY, "0")]),
        )
        .unwrap();
        assert_eq!(from_env.token.as_deref(), Some("env-token"));
        assert!(!from_env.tls_skip_verify);

        let overrides = Overrides {
            token: Some("flag-token".into()),
            server_addr: Some("http://127.0.0.1:1234".into()),
            ..Default::default()
        };
        let from_flag =
            Config::resolve_with(&overrides, &store, lookup(&[(ENV_TOKEN, "env-token")]))
                .unwrap();
        assert_eq!(from_flag.token.as_deref(), Some("flag-token"));
        assert_eq!(from_flag.server_addr, "http://127.0.0.1:1234");
    }

    #[test]
    fn explicit_missing_context_is_an_error() {
        let overrides = Overrides {
            context: Some("staging".into()),
            ..Default::default()
        };
        let err = Config::resolve_with(&overrides, &ContextStore::default(), lookup(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ContextNotFound(name) if name == "staging"));
    }

    #[test]
    fn http_base_adds_scheme_and_normalizes_localhost() {
        let config = Config {
            server_addr: "localhost:9702/".into(),
            ..Default::default()
        };
        assert_eq!(
            config.http_base().unwrap().as_str(),
            "https://127.0.0.1:9702/"
        );
    }

    #[test]
    fn exec_url_follows_http_scheme() {
        let secure = Config {
            server_addr: "https://pier.example.com".into(),
            ..Default::default()
        };
        assert_eq!(
            secure.exec_url().unwrap().as_str(),
            "wss://pier.example.com/v1/exec"
        );

        let plain = Config {
            server_addr: "http://10.0.0.4:9702".into(),
            exec_path: "/exec".into(),
            ..Default::default()
        };
        assert_eq!(plain.exec_url().unwrap().as_str(), "ws://10.0.0.4:9702/exec");
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let config = Config {
            server_addr: "ftp://pier.example.com".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.http_base(),
            Err(ConfigError::InvalidServerAddr { .. })
        ));
    }

    #[test]
    fn flag_parsing() {
        assert!(parse_flag("true"));
        assert!(parse_flag("YES"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
