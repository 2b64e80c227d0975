use std::path::PathBuf;

use chrono::Local;

use crate::config::DatabaseConfig;
use crate::utils::error::{AppError, AppResult};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

pub struct BackupService;

impl BackupService {
    /// Copies the database file to `backup/<timestamp>_<dbname>`. A locked
    /// source is refused unless forced, in which case the ciphertext
    /// sibling is copied as-is.
    pub async fn create(db: &DatabaseConfig, force: bool) -> AppResult<PathBuf> {
        let (source, suffix) = if db.is_locked() {
            if !force {
                return Err(AppError::DbLocked(db.name.clone()));
            }
            (db.enc_path(), format!("{}.enc", db.name))
        } else {
            if !db.path.exists() {
                return Err(AppError::DbNotFound(db.name.clone()));
            }
            (db.path.clone(), db.name.clone())
        };

        std::fs::create_dir_all(&db.backup_dir)?;
        let stamp = Local::now().format(TIMESTAMP_FORMAT);
        let target = db.backup_dir.join(format!("{}_{}", stamp, suffix));
        std::fs::copy(&source, &target)?;

        tracing::info!("backup created: {}", target.display());
        Ok(target)
    }

    /// Backup filenames for this database, newest first. The timestamp
    /// prefix makes lexicographic order chronological.
    pub async fn list(db: &DatabaseConfig) -> AppResult<Vec<String>> {
        let mut names = Vec::new();
        let entries = match std::fs::read_dir(&db.backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(&format!("_{}", db.name)) {
                names.push(name);
            }
        }

        names.sort_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Deletes all but the most recent `keep_n` backups and reports what
    /// was removed.
    pub async fn purge(db: &DatabaseConfig, keep_n: usize) -> AppResult<Vec<String>> {
        let names = Self::list(db).await?;
        let mut purged = Vec::new();
        for name in names.into_iter().skip(keep_n) {
            std::fs::remove_file(db.backup_dir.join(&name))?;
            purged.push(name);
        }
        Ok(purged)
    }

    pub async fn remove(db: &DatabaseConfig, backup_name: &str) -> AppResult<()> {
        let path = db.backup_dir.join(backup_name);
        if !path.exists() {
            return Err(AppError::BackupNotFound(backup_name.to_string()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Absolute path of a named backup, for use as an import source.
    pub fn resolve(db: &DatabaseConfig, backup_name: &str) -> AppResult<PathBuf> {
        let path = db.backup_dir.join(backup_name);
        if !path.exists() {
            return Err(AppError::BackupNotFound(backup_name.to_string()));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_db(dir: &std::path::Path) -> DatabaseConfig {
        let cfg = DatabaseConfig::resolve(dir, "work");
        std::fs::write(&cfg.path, b"sqlite bytes").unwrap();
        cfg
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(dir.path());

        let path = BackupService::create(&db, false).await.unwrap();
        assert!(path.exists());

        let names = BackupService::list(&db).await.unwrap();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with("_work.db"));
    }

    #[tokio::test]
    async fn test_create_refuses_locked_source() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(dir.path());
        std::fs::rename(&db.path, db.enc_path()).unwrap();

        assert!(matches!(
            BackupService::create(&db, false).await,
            Err(AppError::DbLocked(_))
        ));
        // Forced, the ciphertext itself is copied.
        let path = BackupService::create(&db, true).await.unwrap();
        assert!(path.to_string_lossy().ends_with("_work.db.enc"));
    }

    #[tokio::test]
    async fn test_purge_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(dir.path());
        std::fs::create_dir_all(&db.backup_dir).unwrap();

        // Synthetic backups with increasing timestamps.
        for day in 1..=5 {
            let name = format!("2025-03-0{}_120000_work.db", day);
            std::fs::write(db.backup_dir.join(name), b"copy").unwrap();
        }

        let purged = BackupService::purge(&db, 3).await.unwrap();
        assert_eq!(
            purged,
            vec![
                "2025-03-02_120000_work.db".to_string(),
                "2025-03-01_120000_work.db".to_string()
            ]
        );

        let names = BackupService::list(&db).await.unwrap();
        assert_eq!(
            names,
            vec![
                "2025-03-05_120000_work.db".to_string(),
                "2025-03-04_120000_work.db".to_string(),
                "2025-03-03_120000_work.db".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_missing_backup() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(dir.path());
        assert!(matches!(
            BackupService::remove(&db, "2025-01-01_000000_work.db").await,
            Err(AppError::BackupNotFound(_))
        ));
    }
}
