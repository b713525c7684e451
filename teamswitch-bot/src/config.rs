use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;
use serde::Deserialize;
use teamswitch_core::Settings;
use tracing::{error, warn};

/// One remote RCON endpoint to register as a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RconSpec {
    pub name: String,
    pub base_url: String,
    pub api_token: String,
}

/// Names the chat commands are registered under.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandNames {
    pub prefix: String,
    pub switch: String,
    pub players: String,
}

impl Default for CommandNames {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            switch: "switch".to_string(),
            players: "players".to_string(),
        }
    }
}

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token
    /// Env: DISCORD_BOT_TOKEN (required at runtime)
    pub discord_token: Option<String>,

    /// The only channel commands are accepted in and queue notices are posted to
    /// Env: ALLOWED_CHANNEL_ID (required at runtime)
    pub allowed_channel_id: Option<u64>,

    /// Env: COMMAND_PREFIX (default: "!"), COMMAND_SWITCH (default: "switch"),
    /// COMMAND_PLAYERS (default: "players")
    pub commands: CommandNames,

    /// Backends in registration order. Built from RCONS, else API_BASE_URLS,
    /// else API_BASE_URL; see [`parse_rcons`]
    pub rcons: Vec<RconSpec>,

    /// Faction headcount at which switches get queued
    /// Env: CAPACITY_THRESHOLD (default: 50)
    pub capacity_threshold: u32,

    /// Pause between queue cycles
    /// Env: QUEUE_INTERVAL_SECS (default: 10)
    pub queue_interval: Duration,

    /// Upper bound for a single RCON call
    /// Env: RCON_TIMEOUT_SECS (default: 10)
    pub rcon_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for local runs mostly
        let defaults = CommandNames::default();
        Self {
            discord_token: var("DISCORD_BOT_TOKEN")
                .ok()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            allowed_channel_id: var("ALLOWED_CHANNEL_ID")
                .ok()
                .and_then(|id| id.trim().parse().ok()),
            commands: CommandNames {
                prefix: env_or_default_string("COMMAND_PREFIX", &defaults.prefix),
                switch: env_or_default_string("COMMAND_SWITCH", &defaults.switch),
                players: env_or_default_string("COMMAND_PLAYERS", &defaults.players),
            },
            rcons: parse_rcons(
                &env_or_default_string("RCONS", ""),
                &env_or_default_string("API_BASE_URLS", ""),
                &env_or_default_string("API_BASE_URL", ""),
                &env_or_default_string("API_TOKEN", ""),
            ),
            capacity_threshold: env_or_default("CAPACITY_THRESHOLD", 50),
            queue_interval: Duration::from_secs(env_or_default("QUEUE_INTERVAL_SECS", 10)),
            rcon_timeout: Duration::from_secs(env_or_default("RCON_TIMEOUT_SECS", 10)),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            capacity_threshold: self.capacity_threshold,
            queue_interval: self.queue_interval,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: None,
            allowed_channel_id: None,
            commands: CommandNames::default(),
            rcons: Vec::new(),
            capacity_threshold: 50,
            queue_interval: Duration::from_secs(10),
            rcon_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Deserialize)]
struct RconEntry {
    name: Option<String>,
    base_url: Option<String>,
    api_token: Option<String>,
}

/// Build the backend list from the three supported layouts.
///
/// - `rcons`: JSON array of `{name, base_url, api_token}`; a missing token
///   falls back to `api_token`, a missing name to `RCON<index>` (0-based, so
///   it can collide with an explicit name; the later entry is then skipped).
/// - `base_urls`: JSON array of strings or a comma separated list, all sharing
///   `api_token`, named `RCON1`, `RCON2`, ...
/// - `base_url`: a single backend named `default`.
///
/// The first layout that yields at least one backend wins. Unusable entries
/// are logged and skipped.
pub fn parse_rcons(rcons: &str, base_urls: &str, base_url: &str, api_token: &str) -> Vec<RconSpec> {
    let api_token = api_token.trim();
    let mut specs = Vec::new();

    let rcons = rcons.trim();
    if !rcons.is_empty() {
        match serde_json::from_str::<Vec<serde_json::Value>>(rcons) {
            Ok(items) => {
                for (idx, item) in items.into_iter().enumerate() {
                    let entry = match serde_json::from_value::<RconEntry>(item) {
                        Ok(entry) => entry,
                        Err(e) => {
                            warn!(index = idx, error = %e, "RCONS entry is not an object, skipping");
                            continue;
                        }
                    };
                    let base_url = clean_url(entry.base_url.as_deref().unwrap_or(""));
                    let token = entry
                        .api_token
                        .as_deref()
                        .unwrap_or(api_token)
                        .trim()
                        .to_string();
                    if base_url.is_empty() || token.is_empty() {
                        warn!(index = idx, "RCONS entry lacks base_url or api_token, skipping");
                        continue;
                    }
                    let name = entry.name.unwrap_or_else(|| format!("RCON{idx}"));
                    if specs.iter().any(|spec: &RconSpec| spec.name == name) {
                        warn!(index = idx, %name, "RCONS entry reuses a backend name, skipping");
                        continue;
                    }
                    specs.push(RconSpec {
                        name,
                        base_url,
                        api_token: token,
                    });
                }
            }
            Err(e) => error!(error = %e, "RCONS is set but is not a JSON array"),
        }
    }

    let base_urls = base_urls.trim();
    if specs.is_empty() && !base_urls.is_empty() {
        let mut urls: Vec<String> = Vec::new();
        if base_urls.starts_with('[') {
            match serde_json::from_str::<Vec<serde_json::Value>>(base_urls) {
                Ok(values) => {
                    urls = values
                        .iter()
                        .map(|v| match v {
                            serde_json::Value::String(s) => clean_url(s),
                            other => clean_url(&other.to_string()),
                        })
                        .filter(|u| !u.is_empty())
                        .collect();
                }
                Err(e) => error!(error = %e, "API_BASE_URLS looks like JSON but does not parse"),
            }
        }
        if urls.is_empty() {
            urls = base_urls
                .split(',')
                .map(clean_url)
                .filter(|u| !u.is_empty())
                .collect();
        }

        if api_token.is_empty() {
            error!("API_TOKEN is missing, cannot use API_BASE_URLS");
        } else {
            specs.extend(urls.into_iter().enumerate().map(|(i, base_url)| RconSpec {
                name: format!("RCON{}", i + 1),
                base_url,
                api_token: api_token.to_string(),
            }));
        }
    }

    let base_url = clean_url(base_url);
    if specs.is_empty() && !base_url.is_empty() {
        if api_token.is_empty() {
            error!("API_TOKEN is missing, cannot use API_BASE_URL");
        } else {
            specs.push(RconSpec {
                name: "default".to_string(),
                base_url,
                api_token: api_token.to_string(),
            });
        }
    }

    specs
}

fn clean_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}
