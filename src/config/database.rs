use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::utils::error::{AppError, AppResult};

pub const ENCRYPTED_SUFFIX: &str = ".enc";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// File name, `.db` suffix included.
    pub name: String,
    /// Absolute path of the database file.
    pub path: PathBuf,
    /// Sibling directory holding dated copies.
    pub backup_dir: PathBuf,
}

impl DatabaseConfig {
    /// Resolves a user-supplied database name against the data root,
    /// ensuring the `.db` suffix.
    pub fn resolve(data_dir: &Path, name: &str) -> Self {
        let name = if name.ends_with(".db") || name.ends_with(ENCRYPTED_SUFFIX) {
            name.to_string()
        } else {
            format!("{}.db", name)
        };
        Self {
            path: data_dir.join(&name),
            backup_dir: data_dir.join("backup"),
            name,
        }
    }

    /// Name without the `.db` suffix, used for projection directories and
    /// tracker entries.
    pub fn short_name(&self) -> &str {
        self.name.strip_suffix(".db").unwrap_or(&self.name)
    }

    /// Ciphertext sibling produced by the locker.
    pub fn enc_path(&self) -> PathBuf {
        let mut s = self.path.as_os_str().to_os_string();
        s.push(ENCRYPTED_SUFFIX);
        PathBuf::from(s)
    }

    pub fn is_locked(&self) -> bool {
        self.enc_path().exists()
    }

    pub fn exists(&self) -> bool {
        self.path.exists() || self.is_locked()
    }

    /// Opens the database file. Fails with `DbNotFound` when absent,
    /// `DbEncrypted` for a ciphertext path, `DbLocked` when only the
    /// ciphertext sibling exists. Exclusive access is delegated to
    /// SQLite's own file locking.
    pub async fn create_pool(&self) -> AppResult<SqlitePool> {
        if self
            .path
            .to_str()
            .is_some_and(|p| p.ends_with(ENCRYPTED_SUFFIX))
        {
            return Err(AppError::DbEncrypted(self.name.clone()));
        }
        if !self.path.exists() {
            if self.is_locked() {
                return Err(AppError::DbLocked(self.name.clone()));
            }
            return Err(AppError::DbNotFound(self.name.clone()));
        }
        self.pool_with(false).await
    }

    /// Creates the file if missing. Used by `db new` before `init`.
    pub async fn create_pool_for_init(&self) -> AppResult<SqlitePool> {
        self.pool_with(true).await
    }

    async fn pool_with(&self, create_if_missing: bool) -> AppResult<SqlitePool> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(create_if_missing)
            .foreign_keys(true);

        // The façade is used from one task at a time per open handle.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(pool)
    }
}
