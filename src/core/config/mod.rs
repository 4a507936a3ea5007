//! Persistent client configuration stored as TOML in the platform config dir.

pub mod data;
mod io;

pub use data::{path_display, Config, ConfigOverrides, ResolvedConfig};
pub use io::ConfigError;

/// Keys accepted by `policychat set` / `unset`.
pub const CONFIG_KEYS: &[&str] = &[
    "api-base",
    "api-key",
    "greeting",
    "connect-timeout",
    "idle-timeout",
];

impl Config {
    /// Applies a `set <key> <value>` command. Returns an error message for
    /// unknown keys or unparsable values.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let parse_secs = |value: &str| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("'{value}' is not a whole number of seconds"))
        };

        match key {
            "api-base" => self.api_base = Some(value.trim().to_string()),
            "api-key" => self.api_key = Some(value.trim().to_string()),
            "greeting" => self.greeting = Some(value.to_string()),
            "connect-timeout" => self.connect_timeout_secs = Some(parse_secs(value)?),
            "idle-timeout" => self.stream_idle_timeout_secs = Some(parse_secs(value)?),
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "api-base" => self.api_base = None,
            "api-key" => self.api_key = None,
            "greeting" => self.greeting = None,
            "connect-timeout" => self.connect_timeout_secs = None,
            "idle-timeout" => self.stream_idle_timeout_secs = None,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    pub fn print_all(&self) {
        for line in self.describe() {
            println!("{line}");
        }
    }

    fn describe(&self) -> Vec<String> {
        let or_unset = |value: Option<String>| value.unwrap_or_else(|| "(unset)".to_string());
        vec![
            "Current configuration:".to_string(),
            format!("  api-base: {}", or_unset(self.api_base.clone())),
            format!(
                "  api-key: {}",
                or_unset(self.api_key.as_ref().map(|key| mask_secret(key)))
            ),
            format!("  greeting: {}", or_unset(self.greeting.clone())),
            format!(
                "  connect-timeout: {}",
                or_unset(self.connect_timeout_secs.map(|s| format!("{s}s")))
            ),
            format!(
                "  idle-timeout: {}",
                or_unset(self.stream_idle_timeout_secs.map(|s| format!("{s}s")))
            ),
        ]
    }
}

fn unknown_key(key: &str) -> String {
    format!(
        "Unknown config key: {key} (expected one of: {})",
        CONFIG_KEYS.join(", ")
    )
}

/// Shows only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}
