use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "relay_console.toml";
pub const DEFAULT_EXAM_DURATION_SECS: i64 = 20 * 60;
pub const DEFAULT_CACHE_NAME: &str = "relay-console-cache-v2";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub exam_duration_secs: i64,
    pub status_dismiss_secs: u64,
    pub redirect_delay_secs: u32,
    pub reload_delay_ms: u64,
    pub circuit_count: u8,
    pub request_timeout_secs: u64,
    pub cache_name: String,
    pub cache_manifest: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:80".into(),
            exam_duration_secs: DEFAULT_EXAM_DURATION_SECS,
            status_dismiss_secs: 5,
            redirect_delay_secs: 3,
            reload_delay_ms: 1000,
            circuit_count: 7,
            request_timeout_secs: 10,
            cache_name: DEFAULT_CACHE_NAME.into(),
            cache_manifest: vec![
                "/".into(),
                "/static/images/favicon-32x32.png".into(),
                "/static/script.js".into(),
                "/static/script_pi.js".into(),
            ],
        }
    }
}

impl Settings {
    pub fn status_dismiss_after(&self) -> Duration {
        Duration::from_secs(self.status_dismiss_secs)
    }

    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Values accepted in the config file; all optional.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    exam_duration_secs: Option<i64>,
    status_dismiss_secs: Option<u64>,
    redirect_delay_secs: Option<u32>,
    reload_delay_ms: Option<u64>,
    circuit_count: Option<u8>,
    request_timeout_secs: Option<u64>,
    cache_name: Option<String>,
    cache_manifest: Option<Vec<String>>,
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Defaults, then `path` if it exists and parses, then `APP__*` variables.
pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings.server_url = normalize_server_url(&settings.server_url);
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(cfg) => cfg,
        Err(error) => {
            warn!(%error, "ignoring unreadable config file");
            return;
        }
    };

    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.exam_duration_secs {
        settings.exam_duration_secs = v;
    }
    if let Some(v) = file_cfg.status_dismiss_secs {
        settings.status_dismiss_secs = v;
    }
    if let Some(v) = file_cfg.redirect_delay_secs {
        settings.redirect_delay_secs = v;
    }
    if let Some(v) = file_cfg.reload_delay_ms {
        settings.reload_delay_ms = v;
    }
    if let Some(v) = file_cfg.circuit_count {
        settings.circuit_count = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.cache_name {
        settings.cache_name = v;
    }
    if let Some(v) = file_cfg.cache_manifest {
        settings.cache_manifest = v;
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__EXAM_DURATION_SECS").and_then(|v| v.parse().ok()) {
        settings.exam_duration_secs = v;
    }
    if let Some(v) = lookup("APP__STATUS_DISMISS_SECS").and_then(|v| v.parse().ok()) {
        settings.status_dismiss_secs = v;
    }
    if let Some(v) = lookup("APP__REDIRECT_DELAY_SECS").and_then(|v| v.parse().ok()) {
        settings.redirect_delay_secs = v;
    }
    if let Some(v) = lookup("APP__RELOAD_DELAY_MS").and_then(|v| v.parse().ok()) {
        settings.reload_delay_ms = v;
    }
    if let Some(v) = lookup("APP__CIRCUIT_COUNT").and_then(|v| v.parse().ok()) {
        settings.circuit_count = v;
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = lookup("APP__CACHE_NAME") {
        settings.cache_name = v;
    }
    if let Some(v) = lookup("APP__CACHE_MANIFEST") {
        settings.cache_manifest = v
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .collect();
    }
}

/// Adds a missing scheme and drops trailing slashes.
pub fn normalize_server_url(raw: &str) -> String {
    let raw = raw.trim().trim_end_matches('/');

    if raw.is_empty() {
        return Settings::default().server_url;
    }

    if raw.contains("://") {
        return raw.to_string();
    }

    format!("http://{raw}")
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
