//! Environment-driven configuration.
//!
//! Test setup code usually configures Esperar through the process
//! environment: a base URL for [`start`](crate::registry::PageRegistry::start)
//! navigation, wait timings, and a root directory for `resource:` URLs
//! (bundled fixture pages served straight from the filesystem instead of
//! a network request).

use crate::wait::{WaitPolicy, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Base URL the registry navigates to on start
pub const BASE_URL_ENV: &str = "ESPERAR_BASE_URL";

/// Wait timeout override, in milliseconds
pub const TIMEOUT_ENV: &str = "ESPERAR_TIMEOUT_MS";

/// Polling interval override, in milliseconds
pub const POLL_INTERVAL_ENV: &str = "ESPERAR_POLL_INTERVAL_MS";

/// Directory `resource:` URLs resolve under
pub const RESOURCE_ROOT_ENV: &str = "ESPERAR_RESOURCE_ROOT";

/// Scheme marking a URL as a bundled local resource
pub const RESOURCE_SCHEME: &str = "resource:";

/// Resolved configuration for a registry and the pages it creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// System-wide default start URL; takes precedence over any default
    /// configured on a registry
    pub base_url: Option<String>,
    /// Wait timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Root directory for `resource:` URL resolution
    pub resource_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            resource_root: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// Unset variables keep their defaults; unparseable numbers are
    /// ignored rather than failing.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.is_empty() {
                config.base_url = Some(url);
            }
        }
        if let Some(timeout_ms) = read_millis(TIMEOUT_ENV) {
            config.timeout_ms = timeout_ms;
        }
        if let Some(poll_interval_ms) = read_millis(POLL_INTERVAL_ENV) {
            config.poll_interval_ms = poll_interval_ms;
        }
        if let Ok(root) = std::env::var(RESOURCE_ROOT_ENV) {
            if !root.is_empty() {
                config.resource_root = PathBuf::from(root);
            }
        }
        config
    }

    /// The wait policy these timings describe, with the transient element
    /// failure kinds ignored
    #[must_use]
    pub fn policy(&self) -> WaitPolicy {
        WaitPolicy::element_defaults()
            .with_timeout(self.timeout_ms)
            .with_poll_interval(self.poll_interval_ms)
    }

    /// Resolve a start URL: `resource:` URLs become `file://` URLs under
    /// the resource root, anything else passes through unchanged
    #[must_use]
    pub fn resolve_start_url(&self, url: &str) -> String {
        match url.strip_prefix(RESOURCE_SCHEME) {
            Some(resource) => {
                let relative = resource.trim_start_matches('/');
                format!(
                    "file://{}",
                    self.resource_root.join(relative).display()
                )
            }
            None => url.to_string(),
        }
    }
}

fn read_millis(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(millis) => Some(millis),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparseable milliseconds");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod default_tests {
        use super::*;

        #[test]
        fn test_defaults_match_the_wait_engine() {
            let config = Config::default();
            assert!(config.base_url.is_none());
            assert_eq!(config.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
            assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
            assert_eq!(config.resource_root, PathBuf::from("."));
        }

        #[test]
        fn test_policy_carries_timings_and_transient_kinds() {
            let config = Config {
                timeout_ms: 750,
                poll_interval_ms: 25,
                ..Config::default()
            };
            let policy = config.policy();
            assert_eq!(policy.timeout_ms, 750);
            assert_eq!(policy.poll_interval_ms, 25);
            assert!(policy.ignores(crate::result::FailureKind::NotFound));
            assert!(policy.ignores(crate::result::FailureKind::Stale));
        }
    }

    mod url_resolution_tests {
        use super::*;

        #[test]
        fn test_network_urls_pass_through() {
            let config = Config::default();
            assert_eq!(
                config.resolve_start_url("https://example.com/app"),
                "https://example.com/app"
            );
        }

        #[test]
        fn test_resource_urls_resolve_under_the_root() {
            let config = Config {
                resource_root: PathBuf::from("/srv/fixtures"),
                ..Config::default()
            };
            assert_eq!(
                config.resolve_start_url("resource:pages/login.html"),
                "file:///srv/fixtures/pages/login.html"
            );
            assert_eq!(
                config.resolve_start_url("resource:/pages/login.html"),
                "file:///srv/fixtures/pages/login.html"
            );
        }
    }

    mod env_tests {
        use super::*;

        // the only test in the suite that mutates ESPERAR_* variables
        #[test]
        fn test_from_env_reads_overrides_and_ignores_junk() {
            std::env::set_var(BASE_URL_ENV, "https://ci.example.com/");
            std::env::set_var(TIMEOUT_ENV, "1500");
            std::env::set_var(POLL_INTERVAL_ENV, "not-a-number");
            std::env::set_var(RESOURCE_ROOT_ENV, "/srv/fixtures");

            let config = Config::from_env();
            assert_eq!(config.base_url.as_deref(), Some("https://ci.example.com/"));
            assert_eq!(config.timeout_ms, 1500);
            assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
            assert_eq!(config.resource_root, PathBuf::from("/srv/fixtures"));

            std::env::remove_var(BASE_URL_ENV);
            std::env::remove_var(TIMEOUT_ENV);
            std::env::remove_var(POLL_INTERVAL_ENV);
            std::env::remove_var(RESOURCE_ROOT_ENV);
        }
    }
}
