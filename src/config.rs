//! Configuration loader and validator for the review poller.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::store::is_valid_subject;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub feed: Feed,
    pub subjects: Vec<String>,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub poll_interval_secs: u64,
}

/// Remote feed settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feed {
    pub base_url: String,
    pub country: String,
    pub request_timeout_secs: u64,
}

impl App {
    /// `data_dir` with a leading `~/` expanded against `$HOME`.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(rest) = self.data_dir.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return Path::new(&home).join(rest);
            }
        }
        PathBuf::from(&self.data_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Feed {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Ensure the data directory exists.
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(self.app.resolved_data_dir())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.poll_interval_secs == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_secs must be > 0"));
    }

    if Url::parse(&cfg.feed.base_url).is_err() {
        return Err(ConfigError::Invalid("feed.base_url must be an absolute URL"));
    }
    let country = cfg.feed.country.as_bytes();
    if country.len() != 2 || !country.iter().all(u8::is_ascii_alphabetic) {
        return Err(ConfigError::Invalid("feed.country must be a two-letter code"));
    }
    if cfg.feed.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("feed.request_timeout_secs must be > 0"));
    }

    if cfg.subjects.is_empty() {
        return Err(ConfigError::Invalid("subjects must list at least one app id"));
    }
    if !cfg.subjects.iter().all(|s| is_valid_subject(s)) {
        return Err(ConfigError::Invalid(
            "subjects must be non-empty and use only [A-Za-z0-9_-]",
        ));
    }

    Ok(())
}

/// Example configuration, also used by tests.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  poll_interval_secs: 1800

feed:
  base_url: "https://itunes.apple.com/"
  country: "us"
  request_timeout_secs: 30

subjects:
  - "595068606"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn example_cfg() -> Config {
        serde_yaml::from_str(example()).unwrap()
    }

    #[test]
    fn parse_example_ok() {
        let cfg = example_cfg();
        validate(&cfg).unwrap();
        assert_eq!(cfg.app.poll_interval(), Duration::from_secs(1800));
        assert_eq!(cfg.feed.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn invalid_interval_and_timeout() {
        let mut cfg = example_cfg();
        cfg.app.poll_interval_secs = 0;
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("poll_interval_secs")), _ => panic!("wrong error") }

        let mut cfg = example_cfg();
        cfg.feed.request_timeout_secs = 0;
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("request_timeout_secs")), _ => panic!("wrong error") }
    }

    #[test]
    fn invalid_country() {
        for bad in ["", "usa", "u1"] {
            let mut cfg = example_cfg();
            cfg.feed.country = bad.into();
            assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))), "{bad:?}");
        }
    }

    #[test]
    fn invalid_subjects() {
        let mut cfg = example_cfg();
        cfg.subjects.clear();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg = example_cfg();
        cfg.subjects.push("../etc".into());
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("subjects")), _ => panic!("wrong error") }
    }

    #[test]
    fn invalid_base_url() {
        let mut cfg = example_cfg();
        cfg.feed.base_url = "not a url".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg = example_cfg();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.subjects, vec!["595068606".to_string()]);
    }
}
