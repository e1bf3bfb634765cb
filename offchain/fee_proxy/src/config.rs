//! Environment-driven configuration. Credentials are optional at startup so
//! the calculator routes work without them; fee requests check for them.

use std::fmt;
use std::time::Duration;

use crate::error::ProxyError;

pub const DEFAULT_BASE_URL: &str = "https://www.okx.com";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8787";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
    pub project: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .field("passphrase", &"***")
            .field("project", &self.project)
            .finish()
    }
}

#[derive(Clone)]
pub struct ProxyConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub passphrase: Option<String>,
    pub project: Option<String>,
    pub base_url: String,
    pub bind_addr: String,
    pub timeout: Duration,
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("has_credentials", &self.has_credentials())
            .field("project", &self.project)
            .field("base_url", &self.base_url)
            .field("bind_addr", &self.bind_addr)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

impl ProxyConfig {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ProxyError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProxyError> {
        let timeout_secs = match non_empty(lookup("FEE_PROXY_TIMEOUT_SECS")) {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ProxyError::InvalidConfig(format!(
                        "FEE_PROXY_TIMEOUT_SECS must be a positive integer, got {raw:?}"
                    )))
                }
            },
        };
        Ok(Self {
            api_key: non_empty(lookup("OKX_API_KEY")),
            api_secret: non_empty(lookup("OKX_API_SECRET")),
            passphrase: non_empty(lookup("OKX_API_PASSPHRASE")),
            project: non_empty(lookup("OKX_API_PROJECT")),
            base_url: non_empty(lookup("OKX_BASE_URL"))
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            bind_addr: non_empty(lookup("FEE_PROXY_ADDR")).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials().is_ok()
    }

    /// The signing credentials, or the names of the variables that are unset.
    pub fn credentials(&self) -> Result<Credentials, ProxyError> {
        match (&self.api_key, &self.api_secret, &self.passphrase) {
            (Some(api_key), Some(api_secret), Some(passphrase)) => Ok(Credentials {
                api_key: api_key.clone(),
                api_secret: api_secret.clone(),
                passphrase: passphrase.clone(),
                project: self.project.clone(),
            }),
            _ => {
                let missing = [
                    ("OKX_API_KEY", self.api_key.is_none()),
                    ("OKX_API_SECRET", self.api_secret.is_none()),
                    ("OKX_API_PASSPHRASE", self.passphrase.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(ProxyError::MissingCredentials(missing))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ProxyConfig, ProxyError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ProxyConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults_apply() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert!(!cfg.has_credentials());
    }

    #[test]
    fn test_missing_credentials_are_named() {
        let cfg = config(&[("OKX_API_KEY", "k"), ("OKX_API_PASSPHRASE", "  ")]).unwrap();
        match cfg.credentials() {
            Err(ProxyError::MissingCredentials(names)) => assert_eq!(names, vec!["OKX_API_SECRET", "OKX_API_PASSPHRASE"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_full_credentials_and_overrides() {
        let cfg = config(&[
            ("OKX_API_KEY", "k"),
            ("OKX_API_SECRET", "s"),
            ("OKX_API_PASSPHRASE", "p"),
            ("OKX_API_PROJECT", ""),
            ("OKX_BASE_URL", "http://127.0.0.1:9000/"),
            ("FEE_PROXY_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        let creds = cfg.credentials().unwrap();
        assert_eq!(creds.project, None);
        assert_eq!(cfg.base_url, "http://127.0.0.1:9000");
        assert_eq!(cfg.timeout, Duration::from_secs(3));
        assert!(!format!("{creds:?}").contains("\"s\""));
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        assert!(matches!(config(&[("FEE_PROXY_TIMEOUT_SECS", "0")]), Err(ProxyError::InvalidConfig(_))));
        assert!(matches!(config(&[("FEE_PROXY_TIMEOUT_SECS", "soon")]), Err(ProxyError::InvalidConfig(_))));
    }
}
