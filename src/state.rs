use sqlx::SqlitePool;

use crate::config::{AppConfig, DatabaseConfig};
use crate::services::git_service::GitService;
use crate::services::locker_service::LockerService;
use crate::utils::error::AppResult;

/// Everything a command needs, threaded explicitly; no process-wide
/// mutable state.
pub struct AppContext {
    pub config: AppConfig,
    pub db_name: String,
}

impl AppContext {
    pub fn new(config: AppConfig, db_name: String) -> Self {
        Self { config, db_name }
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::resolve(&self.config.data_dir, &self.db_name)
    }

    pub fn database_named(&self, name: &str) -> DatabaseConfig {
        DatabaseConfig::resolve(&self.config.data_dir, name)
    }

    pub fn git(&self) -> GitService {
        GitService::new(self.config.git_dir())
    }

    /// The strict per-command sequence starts here: unlock if needed,
    /// then open. The pool closes when the caller drops it.
    pub async fn open(&self) -> AppResult<SqlitePool> {
        let db = self.database();
        LockerService::unlock_if_needed(&db)?;
        db.create_pool().await
    }

    /// Post-mutation tracker step: export + commit for a tracked
    /// database. Failures here warn and never roll back the mutation.
    pub async fn tracker_post_step(&self, pool: &SqlitePool, operation: &str) {
        let db = self.database();
        let git = self.git();
        match git.load_state() {
            Ok(state) if state.is_tracked(db.short_name()) => {
                if let Err(e) = git.export_and_commit(pool, &db, operation).await {
                    tracing::warn!("tracker export after {} failed: {}", operation, e);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("tracker state unreadable: {}", e),
        }
    }
}
