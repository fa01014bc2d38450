//! Settings file handling (`boxoffice.toml`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dataset::columns;
use crate::query::DEFAULT_TOP_N;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "boxoffice.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Dataset root: a hive-partitioned directory or a single parquet file.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Columns shown in the preview when none are requested.
    #[serde(default = "default_columns")]
    pub default_columns: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            default_columns: default_columns(),
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("data/movie_after_2024.parquet")
}

fn default_columns() -> Vec<String> {
    [
        columns::DT,
        columns::MOVIE_CD,
        columns::AUDI_ACC,
        columns::MULTI_MOVIE_YN,
        columns::REP_NATION_CD,
        columns::RANK,
        columns::MOVIE_NM,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Columns whose missing-value ratios are tracked.
    #[serde(default = "default_null_columns")]
    pub null_columns: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            preview_rows: default_preview_rows(),
            null_columns: default_null_columns(),
        }
    }
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_preview_rows() -> usize {
    5
}

fn default_null_columns() -> Vec<String> {
    vec![
        columns::MULTI_MOVIE_YN.to_string(),
        columns::REP_NATION_CD.to_string(),
    ]
}

impl Config {
    /// Parse a TOML settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load `explicit` if given, else `boxoffice.toml` when present, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
