use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{ApiContext, Credential};
use crate::core::chat_stream::StreamOptions;
use crate::core::constants::{
    DEFAULT_API_BASE, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_GREETING, ENV_API_BASE, ENV_API_KEY,
};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the policy assistant API (e.g., "http://localhost:8000")
    pub api_base: Option<String>,
    /// Value sent in the X-API-Key header
    pub api_key: Option<String>,
    /// Opening assistant message for interactive chat; empty disables it
    pub greeting: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    /// Abandon a reply after this many seconds without a chunk
    pub stream_idle_timeout_secs: Option<u64>,
}

/// Values given on the command line, which win over everything else.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub api_base: Option<String>,
    pub api_key: Option<String>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub context: ApiContext,
    pub greeting: Option<String>,
    pub connect_timeout: Duration,
    pub stream: StreamOptions,
}

impl Config {
    /// Resolves settings with precedence flag > environment > file > default.
    pub fn resolve<F>(&self, overrides: &ConfigOverrides, env: F) -> ResolvedConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let api_base = non_empty(overrides.api_base.clone())
            .or_else(|| non_empty(env(ENV_API_BASE)))
            .or_else(|| non_empty(self.api_base.clone()))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let credential = non_empty(overrides.api_key.clone())
            .or_else(|| non_empty(env(ENV_API_KEY)))
            .or_else(|| non_empty(self.api_key.clone()))
            .map(Credential::new)
            .unwrap_or_default();

        let greeting = match &self.greeting {
            Some(text) if text.trim().is_empty() => None,
            Some(text) => Some(text.clone()),
            None => Some(DEFAULT_GREETING.to_string()),
        };

        ResolvedConfig {
            context: ApiContext::new(api_base, credential),
            greeting,
            connect_timeout: Duration::from_secs(
                self.connect_timeout_secs
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            stream: StreamOptions {
                idle_timeout: self
                    .stream_idle_timeout_secs
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs),
            },
        }
    }
}

/// Get a user-friendly display string for a path, using `~` for the home
/// directory on Unix-like systems.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
