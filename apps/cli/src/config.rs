use std::{collections::HashMap, fs, path::Path, time::Duration};

use client_core::{busy::DEFAULT_BUSY_DELAY, remote::DEFAULT_PAGE_SIZE, remote::DEFAULT_POLL_INTERVAL};

pub const SETTINGS_FILE: &str = "gridworks.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub busy_delay: Duration,
    pub process_poll_interval: Duration,
    pub row_page_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3333".into(),
            busy_delay: DEFAULT_BUSY_DELAY,
            process_poll_interval: DEFAULT_POLL_INTERVAL,
            row_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Defaults, then `gridworks.toml`, then the environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(Path::new(SETTINGS_FILE)) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    settings.server_url = normalize_server_url(&settings.server_url);
    settings
}

pub(crate) fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        tracing::warn!(file = SETTINGS_FILE, "ignoring unreadable settings file");
        return;
    };

    if let Some(v) = file_cfg.get("server_url") {
        settings.server_url = v.clone();
    }
    if let Some(ms) = file_cfg.get("busy_delay_ms").and_then(|v| v.parse().ok()) {
        settings.busy_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = file_cfg.get("process_poll_ms").and_then(|v| v.parse().ok()) {
        settings.process_poll_interval = Duration::from_millis(ms);
    }
    if let Some(size) = file_cfg.get("row_page_size").and_then(|v| v.parse().ok()) {
        settings.row_page_size = size;
    }
}

pub(crate) fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("GRIDWORKS_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(ms) = lookup("APP__BUSY_DELAY_MS").and_then(|v| v.parse().ok()) {
        settings.busy_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = lookup("APP__PROCESS_POLL_MS").and_then(|v| v.parse().ok()) {
        settings.process_poll_interval = Duration::from_millis(ms);
    }
    if let Some(size) = lookup("APP__ROW_PAGE_SIZE").and_then(|v| v.parse().ok()) {
        settings.row_page_size = size;
    }
}

pub fn normalize_server_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return Settings::default().server_url;
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    with_scheme.trim_end_matches('/').to_string()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
