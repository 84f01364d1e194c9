use std::{fs::create_dir_all, path::{Path, PathBuf}, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{ViewOptions, DEFAULT_EXPAND_DEPTH, DEFAULT_MAX_DISPLAY_LEN};
use crate::fetch::DEFAULT_TIMEOUT;
use crate::strategy::ThirdPartyService;

const APP_DIR: &str = "jason-view";
const SETTINGS_FILE: &str = "settings.toml";
const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to get config dir")]
    NoConfigDir,
    #[error("Failed to access {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Invalid settings in {}: {source}", .path.display())]
    Settings { path: PathBuf, source: toml::de::Error },
    #[error("Invalid preferences in {}: {source}", .path.display())]
    Preferences { path: PathBuf, source: serde_json::Error },
}

// Get (and create) the per-user config directory
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?.join(APP_DIR);
    create_dir_all(&dir).map_err(|source| ConfigError::Io { path: dir.clone(), source })?;
    Ok(dir)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub max_display_len: usize,
    pub expand_depth: usize,
    pub timeout_secs: u64,
    /// Relay endpoint used by the retrieval chain; empty disables the tier.
    pub relay_url: String,
    /// Address the `relay` command listens on.
    pub relay_bind: String,
    pub third_party: Vec<ThirdPartyService>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_display_len: DEFAULT_MAX_DISPLAY_LEN,
            expand_depth: DEFAULT_EXPAND_DEPTH,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            relay_url: "http://127.0.0.1:3000/api/proxy".into(),
            relay_bind: "127.0.0.1:3000".into(),
            third_party: ThirdPartyService::defaults(),
        }
    }
}

impl Settings {
    /// Read `path`; a missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&content).map_err(|source| ConfigError::Settings { path: path.to_path_buf(), source })
    }

    pub fn load_default_location() -> Result<Self, ConfigError> {
        Self::load(&config_dir()?.join(SETTINGS_FILE))
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            max_display_len: self.max_display_len,
            expand_depth: self.expand_depth,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn relay_endpoint(&self) -> Option<&str> {
        Some(self.relay_url.as_str()).filter(|s| !s.trim().is_empty())
    }
}

/// The one durable display flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(rename = "darkMode")]
    pub dark_mode: bool,
}

impl Preferences {
    /// Stored value if present, otherwise the environment's preference.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self { dark_mode: environment_prefers_dark() });
        }
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Preferences { path: path.to_path_buf(), source })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        // serialising a bool-only struct cannot fail
        let content = serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"darkMode\":{}}}", self.dark_mode));
        std::fs::write(path, content).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(config_dir()?.join(PREFERENCES_FILE))
    }
}

/// Terminals export `COLORFGBG="fg;bg"`; a low background index means a dark
/// palette.
pub fn environment_prefers_dark() -> bool {
    std::env::var("COLORFGBG").ok().as_deref().is_some_and(colorfgbg_is_dark)
}

fn colorfgbg_is_dark(value: &str) -> bool {
    value
        .rsplit(';')
        .next()
        .and_then(|bg| bg.trim().parse::<u8>().ok())
        .is_some_and(|bg| bg < 7 || bg == 8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_settings_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.view_options(), ViewOptions::default());
        assert_eq!(settings.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
max_display_len = 40
relay_url = ""

[[third_party]]
name = "mine"
endpoint = "https://relay.example/?u="
"#,
        )
        .unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.max_display_len, 40);
        assert_eq!(settings.expand_depth, 2);
        assert_eq!(settings.relay_endpoint(), None);
        assert_eq!(settings.third_party.len(), 1);
        assert!(!settings.third_party[0].envelope);
    }

    #[test]
    fn malformed_settings_name_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "max_display_len = \"lots\"").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(err.to_string().contains("settings.toml"));
    }

    #[test]
    fn preferences_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        Preferences { dark_mode: true }.save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"darkMode":true}"#);
        assert!(Preferences::load(&path).unwrap().dark_mode);
    }

    #[test]
    fn colorfgbg_heuristic() {
        assert!(colorfgbg_is_dark("15;0"));
        assert!(colorfgbg_is_dark("default;default;0"));
        assert!(!colorfgbg_is_dark("0;15"));
        assert!(!colorfgbg_is_dark("0;7"));
        assert!(!colorfgbg_is_dark("garbage"));
    }
}
