//! File-backed session store
//!
//! Behaves like browser local storage: a flat JSON object of string values that
//! survives restarts. The file is re-read on every access so that several
//! processes sharing one data directory observe each other's logins, and every
//! write goes through a temporary file and a rename.

use super::{SessionStore, TokenKey};
use crate::{CoreError, CoreResult};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Default file name inside the state directory
pub const SESSION_FILE_NAME: &str = "session.json";

/// Session store persisted as a JSON file
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileSessionStore {
    /// Create a store backed by the given file; the file need not exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Create a store at `<state_dir>/session.json`
    pub fn in_dir(state_dir: impl AsRef<Path>) -> Self {
        Self::new(state_dir.as_ref().join(SESSION_FILE_NAME))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_values(&self) -> CoreResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(CoreError::storage(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn write_values(&self, values: &BTreeMap<String, String>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let mut tmp = create_private(&tmp_path)?;
        tmp.write_all(serde_json::to_string_pretty(values)?.as_bytes())?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), "Session file updated");
        Ok(())
    }

    fn guard(&self) -> CoreResult<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| CoreError::storage("session lock poisoned"))
    }
}

/// Create `path` afresh, readable by the owner only from the moment it exists.
/// A leftover file from an interrupted write is removed first so its mode is
/// not inherited.
fn create_private(path: &Path) -> CoreResult<fs::File> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    Ok(options.open(path)?)
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: TokenKey) -> CoreResult<Option<String>> {
        let _guard = self.guard()?;
        Ok(self.read_values()?.remove(key.as_str()))
    }

    fn set(&self, key: TokenKey, value: &str) -> CoreResult<()> {
        let _guard = self.guard()?;
        let mut values = self.read_values()?;
        values.insert(key.as_str().to_string(), value.to_string());
        self.write_values(&values)
    }

    fn clear(&self) -> CoreResult<()> {
        let _guard = self.guard()?;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
