use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default tracing filter, e.g. `info` or `seq_core=debug`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Clock step of the `simulate` command
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Used by `migrate` when no path is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub songs_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            poll_interval_ms: default_poll_interval_ms(),
            songs_dir: None,
        }
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("seqctl").join("config.toml"))
    }

    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Missing or malformed files give the defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let path = Self::config_path().context("no config directory on this platform")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let config = Config::load_from(&dir.path().join("absent.toml"));
        assert_eq!(config, Config::default());
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "log_level = \"debug\"\n").expect("write");

        let config = Config::load_from(&path);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.songs_dir, None);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll_interval_ms = \"soon\"").expect("write");
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            songs_dir: Some(PathBuf::from("/music/songs")),
            poll_interval_ms: 20,
            ..Config::default()
        };

        config.save_to(&path).expect("save");
        assert_eq!(Config::load_from(&path), config);
    }
}
