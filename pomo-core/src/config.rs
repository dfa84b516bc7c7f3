use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "pomo.toml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub icon_path: Option<PathBuf>,
    /// Command run on every state change, program first
    pub on_event: Vec<String>,
    pub notifications: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            db_path: data_dir.join("pomo.db"),
            log_path: data_dir.join("pomo.log"),
            icon_path: None,
            on_event: vec![],
            notifications: true,
        }
    }
}

impl Config {
    /// Reads `path`; a missing file gives the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let config_str = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file at {:?}: {}", path, e))
        })?;
        toml::from_str(&config_str).map_err(|e| {
            Error::Config(format!("Failed to parse config file at {:?}: {}", path, e))
        })
    }

    /// The effective configuration as TOML, in the same shape it is read.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Creates the directories the database and log file live in.
    pub fn ensure_paths(&self) -> Result<()> {
        for path in [&self.db_path, &self.log_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "pomo", "pomo")
}

fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `<config dir>/pomo.toml`, or `None` when no home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

pub fn load_config() -> Result<Config> {
    match default_config_path() {
        Some(path) => Config::load_from(&path),
        None => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.notifications);
        assert!(config.on_event.is_empty());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "db_path = \"/tmp/custom.db\"\non_event = [\"notify-send\", \"pomo\"]\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/custom.db"));
        assert_eq!(config.on_event, vec!["notify-send", "pomo"]);
        assert_eq!(config.log_path, Config::default().log_path);
        assert!(config.notifications);
    }

    #[test]
    fn bad_toml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "notifications = \"sometimes\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains(CONFIG_FILE)));
    }

    #[test]
    fn displayed_config_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = Config {
            icon_path: Some(PathBuf::from("/usr/share/icons/pomo.png")),
            on_event: vec!["notify-send".into(), "pomo".into()],
            notifications: false,
            ..Config::default()
        };

        let shown = config.to_toml().unwrap();
        assert!(shown.contains("notifications = false"));
        fs::write(&path, shown).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn ensure_paths_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("data/pomo.db"),
            log_path: dir.path().join("logs/pomo.log"),
            ..Config::default()
        };
        config.ensure_paths().unwrap();
        assert!(dir.path().join("data").is_dir());
        assert!(dir.path().join("logs").is_dir());
    }
}
