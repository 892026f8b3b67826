//! Application-level configuration loading: system-default gameplay parameters and pacing.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

use crate::modes::params::GameplayParams;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_ENGINE_CONFIG_PATH";

const DEFAULT_REVEAL_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_BUZZ_ARBITRATION_WINDOW: Duration = Duration::from_millis(250);
const DEFAULT_MEDIA_BASE_URL: &str = "/media";

#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// System-level defaults, last link of the parameter resolution chain.
    pub defaults: GameplayParams,
    /// Pause between `song:ended` and whatever comes next.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "reveal_delay_ms")]
    pub reveal_delay: Duration,
    /// How long after an acceptance an earlier-stamped buzz may still take the slot.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "buzz_arbitration_window_ms")]
    pub buzz_arbitration_window: Duration,
    /// Prefix of content-reference URLs published in `song:started`.
    pub media_base_url: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        reveal_delay_ms = config.reveal_delay.as_millis() as u64,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Content-reference URL of an item.
    pub fn content_url(&self, song_id: &str) -> String {
        format!("{}/{}", self.media_base_url.trim_end_matches('/'), song_id)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: GameplayParams::default(),
            reveal_delay: DEFAULT_REVEAL_DELAY,
            buzz_arbitration_window: DEFAULT_BUZZ_ARBITRATION_WINDOW,
            media_base_url: DEFAULT_MEDIA_BASE_URL.into(),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "reveal_delay_ms": 1500, "defaults": { "points_title": 3 } }"#)
                .unwrap();
        assert_eq!(config.reveal_delay, Duration::from_millis(1500));
        assert_eq!(config.buzz_arbitration_window, Duration::from_millis(250));
        assert_eq!(config.defaults.points_title, 3);
        assert_eq!(config.defaults.song_duration_secs, 30);
        assert_eq!(config.media_base_url, "/media");
    }

    #[test]
    fn content_urls_join_cleanly() {
        let config = AppConfig {
            media_base_url: "https://cdn.example.org/items/".into(),
            ..AppConfig::default()
        };
        assert_eq!(config.content_url("s1"), "https://cdn.example.org/items/s1");
        assert_eq!(AppConfig::default().content_url("s1"), "/media/s1");
    }
}
