//! Resume-state persistence.
use crate::error::SoakError;
use soak_core::{RunState, STATE_VERSION};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// JSON snapshot of [`RunState`], overwritten after every completed batch round.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` means start fresh: no file, or a file that does not hold a usable state.
    pub fn load(&self) -> Result<Option<RunState>, SoakError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SoakError::io(&self.path)(err)),
        };

        let value: serde_json::Value = match serde_json::from_slice(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!("Ignoring unreadable run state {}: {err}", self.path.display());
                return Ok(None);
            }
        };

        // Check the version before the layout so a newer file is not misread.
        let version = value.get("version").and_then(serde_json::Value::as_u64);
        if version != Some(STATE_VERSION as u64) {
            warn!(
                "Ignoring run state {} with unsupported version {version:?}",
                self.path.display()
            );
            return Ok(None);
        }

        match serde_json::from_value::<RunState>(value) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                warn!("Ignoring malformed run state {}: {err}", self.path.display());
                Ok(None)
            }
        }
    }

    /// Writes a temporary sibling and renames it over the target, so readers only ever see a
    /// complete snapshot.
    pub fn save(&self, state: &RunState) -> Result<(), SoakError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(SoakError::io(parent))?;
        }

        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.tmp_path();
        {
            let mut file = fs::File::create(&tmp).map_err(SoakError::io(&tmp))?;
            file.write_all(&json)
                .and_then(|_| file.sync_all())
                .map_err(SoakError::io(&tmp))?;
        }
        fs::rename(&tmp, &self.path).map_err(SoakError::io(&self.path))
    }

    pub fn clear(&self) -> Result<(), SoakError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SoakError::io(&self.path)(err)),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("run_state.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_starts_fresh() {
        let (_dir, store) = store();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn save_then_load() {
        let (_dir, store) = store();
        let mut state = RunState::fresh(datetime!(2026-10-19 00:00 UTC));
        state.current_concurrency_index = 1;
        state.begin_level(datetime!(2026-10-19 01:00 UTC));
        state.next_batch();

        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), Some(state));
        assert!(!store.tmp_path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
    }

    #[tracing_test::traced_test]
    #[test]
    fn corrupt_file_is_ignored() {
        let (_dir, store) = store();
        fs::write(store.path(), b"{\"version\":1,\"batch_cou").unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(logs_contain("Ignoring"));
    }

    #[test]
    fn unknown_version_is_ignored() {
        let (_dir, store) = store();
        let state = RunState::fresh(datetime!(2026-10-19 00:00 UTC));
        let mut value = serde_json::to_value(&state).unwrap();
        value["version"] = serde_json::json!(STATE_VERSION + 1);
        fs::write(store.path(), serde_json::to_vec(&value).unwrap()).unwrap();

        assert!(store.load().unwrap().is_none());
    }
}
