//! On-disk profile storage.
//!
//! Pure persistence of the profile-name to saved-account mapping; all
//! validation lives with the account types. The file is re-read on every
//! operation, so the disk copy is always the source of truth.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;

/// Directory under the user home holding client configuration.
const CONFIG_DIR: &str = ".quantline";

/// File name of the account profile store.
const ACCOUNTS_FILE: &str = "accounts.json";

/// Reads and writes the JSON profile store at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the well-known default location
    /// (`~/.quantline/accounts.json`).
    ///
    /// # Errors
    ///
    /// Returns an error when the user home directory cannot be determined.
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| io::Error::other("user home directory not found"))?;
        Ok(Self::new(home.join(CONFIG_DIR).join(ACCOUNTS_FILE)))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the full profile map. A missing file reads as an empty map.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or is not a JSON
    /// object.
    pub fn load(&self) -> Result<Map<String, Value>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No profile store at {}, treating as empty", self.path.display());
                return Ok(Map::new());
            }
            Err(err) => return Err(err.into()),
        };
        let profiles: Map<String, Value> = serde_json::from_str(&contents)?;
        debug!(
            "Loaded {} profile(s) from {}",
            profiles.len(),
            self.path.display()
        );
        Ok(profiles)
    }

    /// Writes the full profile map, creating parent directories as needed.
    /// On Unix the file is restricted to owner read/write.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory or file cannot be written.
    pub fn save(&self, profiles: &Map<String, Value>) -> Result<()> {
        use std::io::Write;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(profiles)?;
        let mut file = open_owner_only(&self.path)?;
        file.write_all(contents.as_bytes())?;
        #[cfg(unix)]
        {
            // Tightens files that predate the store or were created with
            // looser permissions; new files are already 0600 from open.
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        debug!(
            "Wrote {} profile(s) to {}",
            profiles.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Opens the store file for writing. On Unix a newly created file is born
/// owner-only, so the token is never readable to other users, even briefly.
#[cfg(unix)]
fn open_owner_only(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_owner_only(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join(ACCOUNTS_FILE));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let (_dir, store) = temp_store();
        let mut profiles = Map::new();
        profiles.insert(
            "acct-1".to_string(),
            json!({"channel": "ibm_quantum", "token": "token-x"}),
        );
        store.save(&profiles).unwrap();
        assert_eq!(store.load().unwrap(), profiles);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested").join(ACCOUNTS_FILE));
        store.save(&Map::new()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_preserves_insertion_order() {
        let (_dir, store) = temp_store();
        let mut profiles = Map::new();
        for name in ["zeta", "alpha", "mid"] {
            profiles.insert(name.to_string(), json!({"token": "t"}));
        }
        store.save(&profiles).unwrap();
        let names: Vec<String> = store.load().unwrap().keys().cloned().collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, store) = temp_store();
        store.save(&Map::new()).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_tightens_pre_existing_loose_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "{}").unwrap();
        std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

        store.save(&Map::new()).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
