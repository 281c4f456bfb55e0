// ABOUTME: Single-session lock: one orchestration run against the host at a time.
// ABOUTME: Atomic create-new file under the deploy root; stale locks auto-break.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Information about who holds the session lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn new() -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
        }
    }

    /// A lock older than an hour belongs to a crashed run; sessions do not
    /// legitimately take that long.
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }
}

impl Default for LockInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// A held session lock. Removed on release, and best-effort on drop so a
/// panicking session does not wedge the next run for an hour.
#[derive(Debug)]
pub struct SessionLock {
    path: PathBuf,
}

impl SessionLock {
    /// Acquire the lock at `path` with atomic create-new semantics (no
    /// TOCTOU race). Stale locks are auto-broken with a warning; `force`
    /// breaks a live one.
    pub fn acquire(path: &Path, force: bool) -> Result<Self, Error> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        match Self::try_create(path) {
            Ok(()) => return Ok(Self { path: path.to_path_buf() }),
            Err(e) if e.kind() != std::io::ErrorKind::AlreadyExists => {
                return Err(Error::Lock(format!("failed to create lock file: {e}")));
            }
            Err(_) => {}
        }

        // Lock exists: decide whether to break it.
        let should_break = match Self::read_info(path) {
            Ok(existing) => {
                if force {
                    tracing::warn!(
                        holder = %existing.holder,
                        pid = existing.pid,
                        "breaking live session lock (--force-lock)"
                    );
                    true
                } else if existing.is_stale() {
                    tracing::warn!(
                        holder = %existing.holder,
                        pid = existing.pid,
                        since = %existing.started_at,
                        "auto-breaking stale session lock"
                    );
                    true
                } else {
                    return Err(Error::Lock(format!(
                        "another session is running: held by {} (pid {}) since {}",
                        existing.holder, existing.pid, existing.started_at
                    )));
                }
            }
            Err(_) => {
                tracing::warn!("session lock unreadable, breaking it");
                true
            }
        };

        if should_break {
            let _ = std::fs::remove_file(path);
        }

        Self::try_create(path)
            .map_err(|e| Error::Lock(format!("lock acquired by another process during break: {e}")))?;

        Ok(Self { path: path.to_path_buf() })
    }

    fn try_create(path: &Path) -> std::io::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        let info = LockInfo::new();
        let json = serde_json::to_string(&info).unwrap_or_default();
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn read_info(path: &Path) -> Result<LockInfo, Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Lock(format!("corrupt lock file: {e}")))
    }

    /// Release the lock explicitly.
    pub fn release(self) {
        // Drop does the removal.
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "lock already gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_info_records_current_process() {
        let info = LockInfo::new();
        assert_eq!(info.pid, std::process::id());
        assert!(!info.holder.is_empty());
        assert!(!info.is_stale());
    }

    #[test]
    fn old_lock_is_stale() {
        let mut info = LockInfo::new();
        info.started_at = Utc::now() - chrono::Duration::hours(2);
        assert!(info.is_stale());
    }

    #[test]
    fn acquire_then_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lock");

        let lock = SessionLock::acquire(&path, false).unwrap();
        let err = SessionLock::acquire(&path, false).unwrap_err();
        assert!(matches!(err, Error::Lock(_)));
        assert!(err.to_string().contains("another session is running"));

        lock.release();
        assert!(!path.exists());
    }

    #[test]
    fn force_breaks_live_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lock");

        let first = SessionLock::acquire(&path, false).unwrap();
        let second = SessionLock::acquire(&path, true).unwrap();

        // Keep the first alive until the second is held; dropping it
        // afterwards removes the file the second holder wrote, which is
        // the documented hazard of --force-lock.
        drop(second);
        drop(first);
    }

    #[test]
    fn stale_lock_is_auto_broken() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lock");

        let stale = LockInfo {
            holder: "old-host".to_string(),
            pid: 1,
            started_at: Utc::now() - chrono::Duration::hours(3),
        };
        std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        let lock = SessionLock::acquire(&path, false).unwrap();
        lock.release();
    }

    #[test]
    fn corrupt_lock_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lock");
        std::fs::write(&path, "not json at all").unwrap();

        let lock = SessionLock::acquire(&path, false).unwrap();
        lock.release();
    }
}
