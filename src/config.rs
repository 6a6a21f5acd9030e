//! Runtime settings.
//!
//! Defaults can be overridden by an optional JSON file, then by environment
//! variables (a `.env` file is honoured by the binary), then by CLI flags:
//!
//! ```json
//! {
//!   "data_dir": "mta_data",
//!   "base_url": "http://web.mta.info/developers/data/nyct/turnstile/",
//!   "threshold": 7200,
//!   "earliest": "2017-01-01",
//!   "default_week": "2020-06-27"
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::wrangle::reconcile::DEFAULT_THRESHOLD;

pub const DATA_DIR_ENV: &str = "TURNSTILE_DATA_DIR";
pub const BASE_URL_ENV: &str = "TURNSTILE_BASE_URL";
pub const THRESHOLD_ENV: &str = "TURNSTILE_THRESHOLD";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local cache of weekly files.
    pub data_dir: PathBuf,
    pub base_url: String,
    /// Largest net entries/exits accepted per interval.
    pub threshold: u64,
    /// Default lower bound for `fetch`.
    pub earliest: String,
    /// Week read by `clean` when no start is given.
    pub default_week: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("mta_data"),
            base_url: "http://web.mta.info/developers/data/nyct/turnstile/".to_string(),
            threshold: DEFAULT_THRESHOLD,
            earliest: "2017-01-01".to_string(),
            default_week: "2020-06-27".to_string(),
        }
    }
}

impl Config {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Applies overrides from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup(BASE_URL_ENV) {
            self.base_url = url;
        }
        if let Some(threshold) = lookup(THRESHOLD_ENV) {
            self.threshold = threshold
                .trim()
                .parse()
                .with_context(|| format!("{THRESHOLD_ENV}='{threshold}' is not a count"))?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "threshold": 5000 }"#).unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.threshold, 5000);
        assert_eq!(config.data_dir, PathBuf::from("mta_data"));
    }

    #[test]
    fn test_overrides() {
        let env = HashMap::from([(DATA_DIR_ENV, "/tmp/mta"), (THRESHOLD_ENV, " 3600 ")]);

        let config = Config::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/mta"));
        assert_eq!(config.threshold, 3600);
        assert_eq!(config.earliest, "2017-01-01");
    }

    #[test]
    fn test_bad_threshold_override() {
        let result = Config::default().with_overrides(|k| {
            (k == THRESHOLD_ENV).then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }
}
