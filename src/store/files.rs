use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Result, TodoError};
use crate::model::Store;
use crate::store::lock;

/// What a locked closure did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<T> {
    /// The store changed; persist it before returning.
    Commit(T),
    /// Nothing changed; skip the write.
    Skip(T),
}

struct Loaded {
    store: Store,
    corrupt: bool,
}

/// The single JSON file holding every user's tasks.
///
/// Every operation reads the whole file and every mutation rewrites it. Access
/// is serialized by an in-process mutex plus an exclusive advisory lock on
/// `<file>.lock`, so other handles on the same file wait their turn too.
pub struct TaskStore {
    path: PathBuf,
    lock_timeout: Option<Duration>,
    guard: Mutex<()>,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: None,
            guard: Mutex::new(()),
        }
    }

    pub fn open(config: &Config) -> Self {
        let mut store = Self::new(&config.data_file);
        store.lock_timeout = config.lock_timeout;
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Read the whole store. A missing, empty, or unparsable file (bad JSON or
    /// bad UTF-8) is an empty store; only genuine read failures are errors.
    /// Lists from a parsed file are renumbered so ids are always `1..=n`.
    pub fn load(&self) -> Result<Store> {
        Ok(self.load_checked()?.store)
    }

    fn load_checked(&self) -> Result<Loaded> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no data file, starting empty");
                return Ok(Loaded {
                    store: Store::new(),
                    corrupt: false,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let data = match String::from_utf8(bytes) {
            Ok(data) => data,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "data file is not valid UTF-8, treating as empty"
                );
                return Ok(Loaded {
                    store: Store::new(),
                    corrupt: true,
                });
            }
        };

        if data.trim().is_empty() {
            return Ok(Loaded {
                store: Store::new(),
                corrupt: false,
            });
        }

        match serde_json::from_str::<Store>(&data) {
            Ok(mut store) => {
                store.renumber();
                Ok(Loaded {
                    store,
                    corrupt: false,
                })
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "data file is not valid task data, treating as empty"
                );
                Ok(Loaded {
                    store: Store::new(),
                    corrupt: true,
                })
            }
        }
    }

    /// Replace the file with `store`. Writes a sibling temp file, syncs it,
    /// then renames it over the target, so readers see the old or the new
    /// content and never a partial write.
    pub fn save(&self, store: &Store) -> Result<()> {
        self.ensure_parent()?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        store.serialize(&mut ser)?;
        buf.push(b'\n');

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_string());
        let temp_path = self
            .path
            .with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

        let written = File::create(&temp_path).and_then(|mut file| {
            file.write_all(&buf)?;
            file.sync_all()
        });
        let result = written.and_then(|()| fs::rename(&temp_path, &self.path));

        if let Err(source) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(TodoError::Persist {
                path: self.path.clone(),
                source,
            });
        }

        debug!(path = %self.path.display(), bytes = buf.len(), "saved store");
        Ok(())
    }

    /// Copy an unreadable data file aside before it gets overwritten.
    fn preserve_corrupt(&self) -> Result<()> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt-{stamp}"));
        let backup = self.path.with_file_name(name);
        fs::copy(&self.path, &backup)?;
        warn!(backup = %backup.display(), "kept a copy of the unreadable data file");
        Ok(())
    }

    /// Run one load-mutate-save cycle while holding the store lock.
    ///
    /// The store is saved only when `f` returns `Mutation::Commit`. If `f`
    /// fails (or panics) nothing is written and the lock is still released.
    pub fn with_lock<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Store) -> Result<Mutation<T>>,
    {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.ensure_parent()?;
        let lock_file = lock::acquire_lock(&self.lock_path(), self.lock_timeout)?;

        let Loaded { mut store, corrupt } = self.load_checked()?;
        let value = match f(&mut store)? {
            Mutation::Commit(value) => {
                if corrupt {
                    self.preserve_corrupt()?;
                }
                self.save(&store)?;
                value
            }
            Mutation::Skip(value) => value,
        };

        lock::release_lock(lock_file)?;
        Ok(value)
    }

    /// Read-only variant of [`with_lock`](Self::with_lock); never writes.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> T,
    {
        self.with_lock(|store| Ok(Mutation::Skip(f(store))))
    }
}
