use super::data::{Domain, Settings, SourceConfig, ViewerConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PATH_OVERRIDE: &str = "SWEEPSCOPE_SETTINGS";

fn config_dir() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sweepscope")
}

/// Where settings are read from: `$SWEEPSCOPE_SETTINGS`, else the config dir.
pub fn settings_path() -> PathBuf {
    std::env::var_os(PATH_OVERRIDE)
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir().join("settings.json"))
}

/// Read-only view of the settings file.
#[derive(Debug)]
pub struct SettingsManager {
    path: PathBuf,
    data: Settings,
}

impl SettingsManager {
    /// Loads the settings file; a missing or unreadable file yields the presets.
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(settings_path())
    }

    pub fn load_or_default_from(path: PathBuf) -> Self {
        let data = if path.exists() {
            Self::load_from(&path)
                .map_err(|e| warn!("[settings] {e:#}"))
                .unwrap_or_default()
        } else {
            info!("[settings] no settings at {path:?}, using presets");
            Settings::default()
        };
        Self { path, data }
    }

    /// Strict load; errors carry the path.
    pub fn load_from(path: &Path) -> Result<Settings> {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading settings {path:?}"))?;
        let mut data: Settings =
            serde_json::from_str(&text).with_context(|| format!("parse error {path:?}"))?;
        data.sanitize();
        Ok(data)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.data
    }

    pub fn domain(&self) -> Domain {
        self.data.domain
    }

    pub fn viewer(&self, domain: Domain) -> ViewerConfig {
        self.data.viewer(domain)
    }

    pub fn source(&self, domain: Domain) -> SourceConfig {
        self.data.source(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ProjectionMode;
    use std::io::Write;

    #[test]
    fn reads_overrides_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"domain": "doppler", "viewers": {{"doppler": {{"display_rate": 1e9, "projection": "linear"}}}}}}"#
        )
        .expect("write settings");

        let manager = SettingsManager::load_or_default_from(file.path().to_path_buf());
        assert_eq!(manager.domain(), Domain::Doppler);
        let viewer = manager.viewer(Domain::Doppler);
        assert_eq!(viewer.projection, ProjectionMode::Linear);
        assert_eq!(viewer.display_rate, 48_000.0);
        assert_eq!(manager.path(), file.path());
    }

    #[test]
    fn malformed_file_falls_back_to_presets() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").expect("write settings");

        let err = SettingsManager::load_from(&path).expect_err("parse must fail");
        assert!(format!("{err:#}").contains("parse error"));

        let manager = SettingsManager::load_or_default_from(path);
        assert_eq!(manager.settings(), &Settings::default());
        assert_eq!(manager.viewer(Domain::Eeg), {
            let mut preset = ViewerConfig::preset(Domain::Eeg);
            preset.sanitize();
            preset
        });
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = SettingsManager::load_or_default_from(dir.path().join("absent.json"));
        assert_eq!(manager.domain(), Domain::Ecg);
    }
}
