use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data root holding the databases, backups and git working tree.
    #[serde(default)]
    pub data_dir: PathBuf,
    /// Editor override; falls back to $VISUAL / $EDITOR / vi.
    #[serde(default)]
    pub editor: Option<String>,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Backups kept per database after a purge.
    #[serde(default = "BackupConfig::default_keep")]
    pub keep: usize,
}

impl BackupConfig {
    fn default_keep() -> usize {
        3
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            keep: Self::default_keep(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Concurrent metadata fetches during import enrichment.
    #[serde(default = "FetchConfig::default_parallelism")]
    pub parallelism: usize,
    /// Wall-clock deadline per fetch, in seconds.
    #[serde(default = "FetchConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl FetchConfig {
    fn default_parallelism() -> usize {
        8
    }

    fn default_timeout_secs() -> u64 {
        5
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            parallelism: Self::default_parallelism(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

impl AppConfig {
    pub fn git_dir(&self) -> PathBuf {
        self.data_dir.join("git")
    }
}
