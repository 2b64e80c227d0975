use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::config::DatabaseConfig;
use crate::models::bookmark::CreateBookmark;
use crate::models::tracker::{BookmarkRecord, TrackerState};
use crate::services::bookmark_service::BookmarkService;
use crate::services::summary_service::SummaryService;
use crate::utils::error::{AppError, AppResult};
use crate::utils::fs::atomic_write;

const STATE_FILE: &str = "tracker.json";
const SUMMARY_FILE: &str = "summary.json";

/// Git-backed tracker: projects tracked databases as one JSON file per
/// bookmark under the working tree and drives the external `git` binary
/// through a narrow runner. All compound operations serialize on an
/// in-process lock.
pub struct GitService {
    root: PathBuf,
    lock: Mutex<()>,
}

impl GitService {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ---- plumbing ----------------------------------------------------

    async fn run(&self, args: &[&str]) -> AppResult<String> {
        let output = tokio::process::Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .await
            .map_err(|e| AppError::GitExec(format!("failed to run git: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        Err(classify(&stderr, &stdout))
    }

    fn ensure_initialized(&self) -> AppResult<()> {
        if !self.root.join(".git").exists() {
            return Err(AppError::GitNotInitialized);
        }
        Ok(())
    }

    // ---- lifecycle ---------------------------------------------------

    /// `git init` on the working tree. With `redo`, an existing `.git`
    /// is removed first.
    pub async fn init(&self, redo: bool) -> AppResult<()> {
        std::fs::create_dir_all(&self.root)?;
        let git_dir = self.root.join(".git");
        if git_dir.exists() {
            if !redo {
                return Err(AppError::DbExists(".git".to_string()));
            }
            std::fs::remove_dir_all(&git_dir)?;
        }
        self.run(&["init"]).await?;
        tracing::info!("git repository initialized at {}", self.root.display());
        Ok(())
    }

    /// Writes the GPG filter scaffolding and commits it: `.gitattributes`
    /// routing `*.json` through the `gpg` filter, plus the repo-local
    /// filter and textconv configuration.
    pub async fn configure_encryption(&self, recipient: &str) -> AppResult<()> {
        self.ensure_initialized()?;
        let _guard = self.lock.lock().await;

        atomic_write(
            &self.root.join(".gitattributes"),
            b"*.json filter=gpg diff=gpg\n",
        )?;

        let clean = format!("gpg --encrypt --recipient {} --output -", recipient);
        self.run(&["config", "filter.gpg.clean", &clean]).await?;
        self.run(&["config", "filter.gpg.smudge", "gpg --decrypt"])
            .await?;
        self.run(&["config", "diff.gpg.textconv", "gpg --decrypt"])
            .await?;

        self.run(&["add", ".gitattributes"]).await?;
        self.commit_index("[tracker] gpg scaffolding").await?;
        Ok(())
    }

    /// Generates a signing/encryption key through the external gpg
    /// binary. Separate from `configure_encryption` so an existing key
    /// can be reused.
    pub async fn generate_gpg_key(&self, recipient: &str) -> AppResult<()> {
        let output = tokio::process::Command::new("gpg")
            .args(["--batch", "--quick-generate-key", recipient])
            .output()
            .await
            .map_err(|e| AppError::GitExec(format!("failed to run gpg: {}", e)))?;
        if !output.status.success() {
            return Err(AppError::GitExec(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(())
    }

    // ---- tracker state ----------------------------------------------

    pub fn load_state(&self) -> AppResult<TrackerState> {
        let path = self.root.join(STATE_FILE);
        if !path.exists() {
            return Ok(TrackerState::default());
        }
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Atomic replace: the state file is never observed half-written.
    pub fn save_state(&self, state: &TrackerState) -> AppResult<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        atomic_write(&self.root.join(STATE_FILE), &bytes)
    }

    // ---- track / untrack --------------------------------------------

    /// Adds the database to the tracker state, writes the initial
    /// projection and commits.
    pub async fn track(&self, db: &DatabaseConfig, pool: &SqlitePool) -> AppResult<()> {
        self.ensure_initialized()?;
        let _guard = self.lock.lock().await;

        let short = db.short_name().to_string();
        let mut state = self.load_state()?;
        if state.is_tracked(&short) {
            return Err(AppError::DbExists(short));
        }

        state.insert(short.clone(), short.clone());
        self.save_state(&state)?;
        self.write_projection(pool, &short).await?;

        self.run(&["add", "-A"]).await?;
        self.commit_index(&format!("[{}] tracking initialized", short))
            .await?;
        Ok(())
    }

    /// Removes the tracker entry and the projection directory, then
    /// commits the removal.
    pub async fn untrack(&self, short_name: &str) -> AppResult<()> {
        self.ensure_initialized()?;
        let _guard = self.lock.lock().await;

        let mut state = self.load_state()?;
        let entry = state
            .remove(short_name)
            .ok_or_else(|| AppError::GitNotTracked(short_name.to_string()))?;
        self.save_state(&state)?;

        let dir = self.root.join(&entry.path);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }

        self.run(&["add", "-A"]).await?;
        self.commit_index(&format!("[{}] untracked", short_name))
            .await?;
        Ok(())
    }

    // ---- export / commit --------------------------------------------

    /// Rewrites the projection to match the live records: stale files
    /// deleted, new and changed files written, unchanged files left
    /// untouched so repeated exports produce no diff.
    pub async fn export(&self, pool: &SqlitePool, db: &DatabaseConfig) -> AppResult<()> {
        self.ensure_initialized()?;
        let short = db.short_name();
        if !self.load_state()?.is_tracked(short) {
            return Err(AppError::GitNotTracked(short.to_string()));
        }
        self.write_projection(pool, short).await
    }

    async fn write_projection(&self, pool: &SqlitePool, short: &str) -> AppResult<()> {
        let dir = self.root.join(short);
        std::fs::create_dir_all(&dir)?;

        let records = BookmarkService::all(pool).await?;
        let mut wanted: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for bookmark in &records {
            let record = BookmarkRecord::from(bookmark);
            wanted.insert(
                format!("{}.json", record.checksum),
                serde_json::to_vec_pretty(&record)?,
            );
        }

        // Delete projections whose record is gone.
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == SUMMARY_FILE || !name.ends_with(".json") {
                continue;
            }
            if !wanted.contains_key(&name) {
                std::fs::remove_file(entry.path())?;
            }
        }

        // Write new or changed projections only.
        for (name, bytes) in &wanted {
            let path = dir.join(name);
            let unchanged = matches!(std::fs::read(&path), Ok(existing) if existing == *bytes);
            if !unchanged {
                atomic_write(&path, bytes)?;
            }
        }

        self.write_summary(pool, &dir).await
    }

    /// The summary carries an `updated_at` stamp, so it is rewritten only
    /// when its counts actually changed; otherwise every export would
    /// dirty the tree.
    async fn write_summary(&self, pool: &SqlitePool, dir: &Path) -> AppResult<()> {
        let summary = SummaryService::summary(pool).await?;
        let path = dir.join(SUMMARY_FILE);

        if let Ok(bytes) = std::fs::read(&path) {
            if let Ok(existing) =
                serde_json::from_slice::<crate::models::summary::DatabaseSummary>(&bytes)
            {
                if existing.bookmarks == summary.bookmarks
                    && existing.tags == summary.tags
                    && existing.favorites == summary.favorites
                    && existing.version == summary.version
                {
                    return Ok(());
                }
            }
        }

        atomic_write(&path, &serde_json::to_vec_pretty(&summary)?)
    }

    /// Stages everything and commits. A clean index is `NothingToCommit`.
    pub async fn commit(&self, message: &str) -> AppResult<()> {
        self.ensure_initialized()?;
        let _guard = self.lock.lock().await;
        self.run(&["add", "-A"]).await?;
        self.commit_index(message).await
    }

    async fn commit_index(&self, message: &str) -> AppResult<()> {
        let status = self.run(&["status", "--porcelain"]).await?;
        if status.trim().is_empty() {
            return Err(AppError::NothingToCommit);
        }
        self.run(&["commit", "-m", message]).await?;
        tracing::info!("committed: {}", message);
        Ok(())
    }

    /// Post-mutation hook used by the orchestrator: export then commit,
    /// with `NothingToCommit` downgraded to a debug log.
    pub async fn export_and_commit(
        &self,
        pool: &SqlitePool,
        db: &DatabaseConfig,
        operation: &str,
    ) -> AppResult<()> {
        self.export(pool, db).await?;
        match self
            .commit(&format!("[{}] {}", db.short_name(), operation))
            .await
        {
            Err(AppError::NothingToCommit) => {
                tracing::debug!("projection unchanged after {}", operation);
                Ok(())
            }
            other => other,
        }
    }

    // ---- remotes -----------------------------------------------------

    pub async fn push(&self) -> AppResult<String> {
        self.ensure_initialized()?;
        let _guard = self.lock.lock().await;
        self.run(&["push", "origin", "HEAD"]).await
    }

    pub async fn pull(&self) -> AppResult<String> {
        self.ensure_initialized()?;
        let _guard = self.lock.lock().await;
        self.run(&["pull", "origin", "HEAD"]).await
    }

    pub async fn set_remote(&self, url: &str) -> AppResult<()> {
        self.ensure_initialized()?;
        if url.trim().is_empty() {
            return Err(AppError::GitRepoUrlEmpty);
        }
        // add, or replace an existing origin.
        if self.run(&["remote", "add", "origin", url]).await.is_err() {
            self.run(&["remote", "set-url", "origin", url]).await?;
        }
        Ok(())
    }

    pub async fn remote_url(&self) -> AppResult<String> {
        self.ensure_initialized()?;
        let url = self.run(&["remote", "get-url", "origin"]).await?;
        Ok(url.trim().to_string())
    }

    // ---- import ------------------------------------------------------

    /// Clones a tracked repository into a temp directory and decodes
    /// every projection back into candidate records. The temp directory
    /// is returned so it lives as long as the caller needs it.
    pub async fn import(
        clone_url: &str,
    ) -> AppResult<(tempfile::TempDir, Vec<CreateBookmark>)> {
        if clone_url.trim().is_empty() {
            return Err(AppError::GitRepoUrlEmpty);
        }

        let tmp = tempfile::tempdir()?;
        let output = tokio::process::Command::new("git")
            .args(["clone", "--depth", "1", clone_url])
            .arg(tmp.path())
            .output()
            .await
            .map_err(|e| AppError::GitExec(format!("failed to run git: {}", e)))?;
        if !output.status.success() {
            return Err(AppError::GitExec(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        let records = decode_working_tree(tmp.path())?;
        Ok((tmp, records))
    }
}

/// Reads every per-database projection directory named by the cloned
/// tracker state and decodes the record files.
pub fn decode_working_tree(root: &Path) -> AppResult<Vec<CreateBookmark>> {
    let state_path = root.join(STATE_FILE);
    if !state_path.exists() {
        return Err(AppError::GitNotTracked(STATE_FILE.to_string()));
    }
    let state: TrackerState = serde_json::from_slice(&std::fs::read(state_path)?)?;

    let mut records = Vec::new();
    for entry in state.0.values() {
        let dir = root.join(&entry.path);
        if !dir.is_dir() {
            continue;
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension().is_some_and(|ext| ext == "json")
                    && p.file_name().is_some_and(|n| n != SUMMARY_FILE)
            })
            .collect();
        files.sort();

        for file in files {
            let record: BookmarkRecord = match serde_json::from_slice(&std::fs::read(&file)?) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("skipping unreadable projection {}: {}", file.display(), e);
                    continue;
                }
            };
            let bookmark: crate::models::bookmark::Bookmark = record.into();
            records.push(CreateBookmark {
                url: bookmark.url,
                title: bookmark.title,
                desc: bookmark.desc,
                tags: bookmark.tags,
                favicon_url: bookmark.favicon_url,
            });
        }
    }
    Ok(records)
}

fn classify(stderr: &str, stdout: &str) -> AppError {
    let text = format!("{}\n{}", stderr, stdout).to_lowercase();
    if text.contains("not a git repository") {
        AppError::GitNotInitialized
    } else if text.contains("nothing to commit") {
        AppError::NothingToCommit
    } else if text.contains("already up to date") || text.contains("everything up-to-date") {
        AppError::UpToDate
    } else if text.contains("no configured push destination")
        || text.contains("'origin' does not appear to be a git repository")
        || text.contains("no such remote")
    {
        AppError::GitNoRemote
    } else {
        AppError::GitExec(stderr.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_errors() {
        assert!(matches!(
            classify("fatal: not a git repository", ""),
            AppError::GitNotInitialized
        ));
        assert!(matches!(
            classify("", "nothing to commit, working tree clean"),
            AppError::NothingToCommit
        ));
        assert!(matches!(
            classify("Already up to date.", ""),
            AppError::UpToDate
        ));
        assert!(matches!(
            classify("fatal: no configured push destination", ""),
            AppError::GitNoRemote
        ));
        assert!(matches!(
            classify("fatal: something else", ""),
            AppError::GitExec(_)
        ));
    }

    #[test]
    fn test_state_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let service = GitService::new(dir.path().to_path_buf());

        let mut state = TrackerState::default();
        state.insert("work".to_string(), "work".to_string());
        service.save_state(&state).unwrap();

        let loaded = service.load_state().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_load_state_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let service = GitService::new(dir.path().to_path_buf());
        assert_eq!(service.load_state().unwrap(), TrackerState::default());
    }

    #[test]
    fn test_decode_working_tree_requires_state() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            decode_working_tree(dir.path()),
            Err(AppError::GitNotTracked(_))
        ));
    }
}
