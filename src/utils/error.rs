use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // Validation
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid tag: {0}")]
    InvalidTag(String),

    #[error("invalid buffer: {0}")]
    BufferInvalid(String),

    // Conflict
    #[error("duplicate url, bookmark already exists with id {id}")]
    DuplicateUrl { id: i64 },

    #[error("database already initialized: {0}")]
    DbAlreadyInitialized(String),

    #[error("database already exists: {0}")]
    DbExists(String),

    // Absence
    #[error("database not found: {0}")]
    DbNotFound(String),

    #[error("bookmark not found: {0}")]
    RecordNotFound(i64),

    #[error("backup not found: {0}")]
    BackupNotFound(String),

    #[error("git repository not initialized")]
    GitNotInitialized,

    #[error("database not tracked: {0}")]
    GitNotTracked(String),

    #[error("no remote configured")]
    GitNoRemote,

    #[error("remote url is empty")]
    GitRepoUrlEmpty,

    // State
    #[error("database is locked: {0}")]
    DbLocked(String),

    #[error("database is encrypted: {0}")]
    DbEncrypted(String),

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("already up to date")]
    UpToDate,

    #[error("unchanged")]
    Unchanged,

    #[error("aborted")]
    Aborted,

    // Crypto. Messages are deliberately unspecific about the target file.
    #[error("wrong passphrase")]
    WrongPassphrase,

    #[error("corrupt ciphertext")]
    CorruptCiphertext,

    // IO / external
    #[error("storage error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git: {0}")]
    GitExec(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Exit status for the binary: 0 success, 1 typed error or user abort,
    /// 2 usage error (owned by clap).
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Errors that end a command without being failures worth reporting
    /// loudly: the user said no, or there was nothing to do.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            AppError::Aborted
                | AppError::Unchanged
                | AppError::NothingToCommit
                | AppError::UpToDate
        )
    }
}
