use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::utils::error::AppResult;

/// Write `bytes` to `path` through a sibling temp file and an atomic rename.
/// Readers never observe a partially written file.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    sync_dir(dir)?;
    Ok(())
}

/// Flush directory metadata so a rename survives a crash.
pub fn sync_dir(dir: &Path) -> AppResult<()> {
    // Directory fsync is a unix concept; on other platforms the rename
    // itself is the best we get.
    #[cfg(unix)]
    {
        File::open(dir)?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}
