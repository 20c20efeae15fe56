use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use change_tracker_core::fields::SnapshotField;
use change_tracker_core::keywords::{KeywordGrammar, OCCURRENCE_WORD};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeywordsConfig {
    #[serde(default = "default_occurrence_word")]
    pub occurrence_word: String,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            occurrence_word: default_occurrence_word(),
        }
    }
}

fn default_occurrence_word() -> String {
    OCCURRENCE_WORD.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Fields compared against the previous capture to record change events.
    #[serde(default = "default_tracked_fields")]
    pub fields: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fields: default_tracked_fields(),
        }
    }
}

fn default_tracked_fields() -> Vec<String> {
    ["title", "h1", "description", "content", "keywords_count"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    /// Scalar fields shown in the "Fields" section of a diff report.
    #[serde(default = "default_report_fields")]
    pub fields: Vec<String>,
    /// Truncate displayed diff lines to this many characters (0 = off).
    #[serde(default)]
    pub max_line_chars: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            fields: default_report_fields(),
            max_line_chars: 0,
        }
    }
}

fn default_report_fields() -> Vec<String> {
    SnapshotField::METADATA
        .iter()
        .map(|f| f.name().to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "change_tracker=info".to_string()
}

impl Config {
    pub fn grammar(&self) -> Result<KeywordGrammar> {
        KeywordGrammar::with_occurrence_word(&self.keywords.occurrence_word)
    }

    pub fn tracked_fields(&self) -> Result<Vec<SnapshotField>> {
        parse_fields(&self.ingest.fields).context("invalid ingest.fields")
    }

    pub fn report_fields(&self) -> Result<Vec<SnapshotField>> {
        parse_fields(&self.report.fields).context("invalid report.fields")
    }
}

fn parse_fields(names: &[String]) -> Result<Vec<SnapshotField>> {
    names.iter().map(|name| name.parse()).collect()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.keywords.occurrence_word.trim().is_empty() {
        anyhow::bail!("keywords.occurrence_word must not be empty");
    }

    config.tracked_fields()?;
    config.report_fields()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(body: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ctrack.toml");
        fs::write(&path, body).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let (_tmp, path) = write_config("[db]\npath = \"./data/ctrack.sqlite\"\n");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.keywords.occurrence_word, "разів");
        assert_eq!(cfg.report_fields().unwrap(), SnapshotField::METADATA.to_vec());
        assert_eq!(cfg.tracked_fields().unwrap().len(), 5);
        assert_eq!(cfg.report.max_line_chars, 0);
        assert_eq!(cfg.logging.filter, "change_tracker=info");
    }

    #[test]
    fn test_rejects_unknown_field() {
        let (_tmp, path) =
            write_config("[db]\npath = \"x.sqlite\"\n\n[report]\nfields = [\"title\", \"price\"]\n");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("price"));
    }

    #[test]
    fn test_rejects_empty_occurrence_word() {
        let (_tmp, path) =
            write_config("[db]\npath = \"x.sqlite\"\n\n[keywords]\noccurrence_word = \" \"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(load_config(Path::new("/nonexistent/ctrack.toml")).is_err());
    }
}
