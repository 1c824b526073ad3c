use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
    time::Duration,
};

use fs2::FileExt;
use tokio::time::sleep;

/// Exclusive advisory lock guarding the MTProto session file.
///
/// The session file may be touched by the scheduled refresher and by a
/// concurrent `login` run; both take this lock first. Released on drop.
#[derive(Debug)]
pub struct SessionLock {
    file: File,
    path: PathBuf,
}

#[derive(Clone, Copy, Debug)]
pub struct LockPolicy {
    pub attempts: u32,
    /// Wait before the second attempt; doubles after each failure.
    pub base_delay: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// `<session>.lock` next to the session file.
pub fn lock_path(session_file: &Path) -> PathBuf {
    let mut name = session_file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "session".into());
    name.push(".lock");
    session_file.with_file_name(name)
}

impl SessionLock {
    /// Try to take the lock, backing off between attempts. `None` when every
    /// attempt found it held or the lock file could not be opened.
    pub async fn acquire(session_file: &Path, policy: LockPolicy) -> Option<Self> {
        let path = lock_path(session_file);
        let file = match OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot open session lock file");
                return None;
            }
        };

        let mut delay = policy.base_delay;
        for attempt in 1..=policy.attempts.max(1) {
            match file.try_lock_exclusive() {
                Ok(()) => return Some(Self { file, path }),
                Err(e) if attempt < policy.attempts => {
                    tracing::warn!(
                        attempt,
                        attempts = policy.attempts,
                        wait_ms = delay.as_millis() as u64,
                        error = %e,
                        "session file is locked, retrying"
                    );
                    sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => {
                    tracing::error!(
                        attempts = policy.attempts,
                        error = %e,
                        "session file still locked, another process may be using it"
                    );
                }
            }
        }
        None
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
