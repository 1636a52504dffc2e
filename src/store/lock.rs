use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::{Result, TodoError};

/// Acquire an exclusive lock on a file, returning the locked File handle.
/// The lock is released when the File is dropped.
///
/// With no timeout this blocks until the lock is free. With a timeout it
/// retries with exponential backoff (1ms doubling up to 512ms per sleep) and
/// fails with `Locked` once the deadline passes.
pub fn acquire_lock(path: &Path, timeout: Option<Duration>) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    let Some(timeout) = timeout else {
        file.lock_exclusive()?;
        return Ok(file);
    };

    let deadline = Instant::now() + timeout;
    let mut delay = Duration::from_millis(1);
    let max_delay = Duration::from_millis(512);

    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(file),
            Err(_) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(TodoError::Locked(path.display().to_string()));
                }
                std::thread::sleep(delay.min(deadline - now));
                delay = (delay * 2).min(max_delay);
            }
        }
    }
}

/// Release lock explicitly (normally handled by Drop).
pub fn release_lock(file: File) -> Result<()> {
    FileExt::unlock(&file)?;
    Ok(())
}
