use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use detector::{DetectorConfig, DEFAULT_PROBE_URL, DEFAULT_USER_AGENT, FALLBACK_PROBE_URL};
use serde::Deserialize;
use url::Url;

/// Resolved CLI settings: defaults, overlaid by an optional TOML file, then
/// `NETWATCH__*` environment variables, then command-line flags (applied by
/// the caller).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub probe_url: String,
    pub fallback_url: String,
    pub probe_timeout_ms: u64,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            probe_url: DEFAULT_PROBE_URL.into(),
            fallback_url: FALLBACK_PROBE_URL.into(),
            probe_timeout_ms: 5_000,
            initial_retry_delay_ms: 5_000,
            max_retry_delay_ms: 120_000,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

/// Shape of `netwatch.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    probe_url: Option<String>,
    fallback_url: Option<String>,
    probe_timeout_ms: Option<u64>,
    initial_retry_delay_ms: Option<u64>,
    max_retry_delay_ms: Option<u64>,
    user_agent: Option<String>,
}

const DEFAULT_SETTINGS_FILE: &str = "netwatch.toml";

pub fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    let raw = match config_path {
        // An explicitly named file must exist; the default one is optional.
        Some(path) => Some(fs::read_to_string(path).with_context(|| {
            format!("failed to read settings file '{}'", path.display())
        })?),
        None => fs::read_to_string(DEFAULT_SETTINGS_FILE).ok(),
    };
    if let Some(raw) = raw {
        let file_cfg: FileSettings = toml::from_str(&raw).context("invalid settings file")?;
        apply_file(&mut settings, file_cfg);
    }

    apply_env(&mut settings);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.probe_url {
        settings.probe_url = v;
    }
    if let Some(v) = file_cfg.fallback_url {
        settings.fallback_url = v;
    }
    if let Some(v) = file_cfg.probe_timeout_ms {
        settings.probe_timeout_ms = v;
    }
    if let Some(v) = file_cfg.initial_retry_delay_ms {
        settings.initial_retry_delay_ms = v;
    }
    if let Some(v) = file_cfg.max_retry_delay_ms {
        settings.max_retry_delay_ms = v;
    }
    if let Some(v) = file_cfg.user_agent {
        settings.user_agent = v;
    }
}

fn apply_env(settings: &mut Settings) {
    if let Ok(v) = std::env::var("NETWATCH__PROBE_URL") {
        settings.probe_url = v;
    }
    if let Ok(v) = std::env::var("NETWATCH__FALLBACK_URL") {
        settings.fallback_url = v;
    }
    if let Ok(v) = std::env::var("NETWATCH__PROBE_TIMEOUT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.probe_timeout_ms = parsed;
        }
    }
    if let Ok(v) = std::env::var("NETWATCH__INITIAL_RETRY_DELAY_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.initial_retry_delay_ms = parsed;
        }
    }
    if let Ok(v) = std::env::var("NETWATCH__MAX_RETRY_DELAY_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.max_retry_delay_ms = parsed;
        }
    }
    if let Ok(v) = std::env::var("NETWATCH__USER_AGENT") {
        settings.user_agent = v;
    }
}

impl Settings {
    pub fn into_detector_config(self) -> Result<DetectorConfig> {
        Ok(DetectorConfig {
            default_probe_url: Url::parse(&self.probe_url)
                .with_context(|| format!("invalid probe url '{}'", self.probe_url))?,
            fallback_probe_url: Url::parse(&self.fallback_url)
                .with_context(|| format!("invalid fallback url '{}'", self.fallback_url))?,
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            initial_retry_delay: Duration::from_millis(self.initial_retry_delay_ms),
            max_retry_delay: Duration::from_millis(self.max_retry_delay_ms),
            user_agent: self.user_agent,
        })
    }
}
