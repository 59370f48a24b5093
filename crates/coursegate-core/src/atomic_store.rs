//! Lock-scoped atomic mutation of a JSONL catalog.
//!
//! Cross-process writers (several CLI invocations against one file) are
//! serialized by a sibling `<file>.lock` created with `create_new`.
//! A held lock fails fast with `LockBusy`; there is no waiting or retry.
//! The completion log takes the same kind of lock for its appends.

use crate::catalog::{Catalog, CatalogError};
use chrono::Utc;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub fn catalog_lock_path(catalog_path: &Path) -> PathBuf {
    lock_path_for(catalog_path)
}

pub(crate) fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock: OsString = path.as_os_str().to_os_string();
    lock.push(".lock");
    PathBuf::from(lock)
}

/// Failure to take a `.lock` file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    #[error("lock busy: {lock_path}")]
    Busy { lock_path: String },

    #[error("failed to acquire lock {lock_path}: {message}")]
    Io { lock_path: String, message: String },
}

impl LockError {
    fn io(lock_path: &Path, message: impl Into<String>) -> Self {
        Self::Io {
            lock_path: lock_path.display().to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum AtomicCatalogMutationError<E> {
    LockBusy { lock_path: String },
    LockIo { lock_path: String, message: String },
    Catalog(CatalogError),
    Mutation(E),
}

impl<E> From<LockError> for AtomicCatalogMutationError<E> {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Busy { lock_path } => Self::LockBusy { lock_path },
            LockError::Io { lock_path, message } => Self::LockIo { lock_path, message },
        }
    }
}

impl<E: Display> Display for AtomicCatalogMutationError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LockBusy { lock_path } => write!(f, "catalog lock busy: {lock_path}"),
            Self::LockIo { lock_path, message } => {
                write!(f, "failed to acquire catalog lock {lock_path}: {message}")
            }
            Self::Catalog(err) => write!(f, "{err}"),
            Self::Mutation(err) => write!(f, "{err}"),
        }
    }
}

impl<E> std::error::Error for AtomicCatalogMutationError<E> where
    E: Display + std::fmt::Debug + std::error::Error + 'static
{
}

/// Execute one lock-scoped catalog mutation against a JSONL path.
///
/// The mutator returns `(value, changed)`; `changed == true` persists the
/// catalog before the lock is released. A missing catalog file starts empty.
pub fn mutate_catalog_jsonl<T, E, F>(
    path: impl AsRef<Path>,
    mutator: F,
) -> Result<T, AtomicCatalogMutationError<E>>
where
    F: FnOnce(&mut Catalog) -> Result<(T, bool), E>,
{
    let path = path.as_ref();
    let _guard = FileLockGuard::acquire(catalog_lock_path(path))?;

    let mut catalog = if path.exists() {
        Catalog::load_jsonl(path).map_err(AtomicCatalogMutationError::Catalog)?
    } else {
        Catalog::new()
    };
    let (value, changed) = mutator(&mut catalog).map_err(AtomicCatalogMutationError::Mutation)?;
    if changed {
        catalog
            .save_jsonl(path)
            .map_err(AtomicCatalogMutationError::Catalog)?;
        debug!(path = %path.display(), "catalog persisted");
    }
    Ok(value)
}

/// Held `.lock` file, removed on drop.
pub(crate) struct FileLockGuard {
    lock_path: PathBuf,
    _file: File,
}

impl FileLockGuard {
    pub(crate) fn acquire(lock_path: PathBuf) -> Result<Self, LockError> {
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| LockError::io(&lock_path, e.to_string()))?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                Ok(Self {
                    lock_path,
                    _file: file,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(LockError::Busy {
                    lock_path: lock_path.display().to_string(),
                })
            }
            Err(err) => Err(LockError::io(&lock_path, err.to_string())),
        }
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
