// ABOUTME: Persisted secret store: one env-format file, restrictive permissions.
// ABOUTME: Existing values are never regenerated, so reruns are byte-identical.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;

use super::ProvisionError;

const SECRET_LEN: usize = 32;

/// Key-value secret store backed by a single `KEY=value` file.
///
/// Single-writer (the provisioner), many-reader thereafter. The map is
/// sorted, so repeated persists with unchanged values produce identical
/// bytes.
#[derive(Debug)]
pub struct SecretStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl SecretStore {
    /// Open the store, loading existing entries if the file is present.
    pub fn open(path: &Path) -> Result<Self, ProvisionError> {
        let mut values = BTreeMap::new();

        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|source| ProvisionError::SecretStore {
                    path: path.display().to_string(),
                    source,
                })?;

            for (lineno, line) in content.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    return Err(ProvisionError::SecretStoreMalformed {
                        path: path.display().to_string(),
                        detail: format!("line {} has no '='", lineno + 1),
                    });
                };
                values.insert(key.trim().to_string(), value.to_string());
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    /// Guarantee each named slot has a value, generating random ones only
    /// for absent slots. Returns the slots that were newly created.
    pub fn ensure_slots(&mut self, slots: &[String]) -> Vec<String> {
        let mut created = Vec::new();
        for slot in slots {
            if !self.values.contains_key(slot) {
                self.values.insert(slot.clone(), random_value());
                created.push(slot.clone());
            }
        }
        created
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full set atomically: temp file in the same directory,
    /// permissions tightened before the rename makes it visible.
    pub fn persist(&self) -> Result<(), ProvisionError> {
        let io_err = |source| ProvisionError::SecretStore {
            path: self.path.display().to_string(),
            source,
        };

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(io_err)?;

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&tmp_path).map_err(io_err)?;
            restrict_permissions(&file).map_err(io_err)?;
            for (key, value) in &self.values {
                writeln!(file, "{key}={value}").map_err(io_err)?;
            }
            file.sync_all().map_err(io_err)?;
        }

        std::fs::rename(&tmp_path, &self.path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

/// Cryptographically random alphanumeric value from the OS generator.
fn random_value() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn generates_values_for_new_slots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.env");

        let mut store = SecretStore::open(&path).unwrap();
        let created = store.ensure_slots(&slot_names(&["A", "B"]));

        assert_eq!(created, vec!["A", "B"]);
        assert_eq!(store.get("A").unwrap().len(), SECRET_LEN);
        assert_ne!(store.get("A"), store.get("B"));
    }

    #[test]
    fn rerun_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.env");

        let mut store = SecretStore::open(&path).unwrap();
        store.ensure_slots(&slot_names(&["PASSWORD", "API_KEY"]));
        store.persist().unwrap();
        let first = std::fs::read(&path).unwrap();

        let mut store = SecretStore::open(&path).unwrap();
        let created = store.ensure_slots(&slot_names(&["PASSWORD", "API_KEY"]));
        store.persist().unwrap();
        let second = std::fs::read(&path).unwrap();

        assert!(created.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn new_slots_leave_existing_values_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.env");

        let mut store = SecretStore::open(&path).unwrap();
        store.ensure_slots(&slot_names(&["KEEP"]));
        store.persist().unwrap();
        let kept = store.get("KEEP").unwrap().to_string();

        let mut store = SecretStore::open(&path).unwrap();
        let created = store.ensure_slots(&slot_names(&["KEEP", "FRESH"]));
        store.persist().unwrap();

        assert_eq!(created, vec!["FRESH"]);
        assert_eq!(store.get("KEEP").unwrap(), kept);
    }

    #[test]
    fn unknown_keys_survive_a_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.env");
        std::fs::write(&path, "# operator note\nMANUAL_ENTRY=kept-by-hand\n").unwrap();

        let mut store = SecretStore::open(&path).unwrap();
        store.ensure_slots(&slot_names(&["NEW"]));
        store.persist().unwrap();

        let store = SecretStore::open(&path).unwrap();
        assert_eq!(store.get("MANUAL_ENTRY"), Some("kept-by-hand"));
        assert!(store.get("NEW").is_some());
    }

    #[test]
    fn malformed_store_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.env");
        std::fs::write(&path, "NO_EQUALS_SIGN\n").unwrap();

        let err = SecretStore::open(&path).unwrap_err();
        assert!(matches!(err, ProvisionError::SecretStoreMalformed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn store_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.env");

        let mut store = SecretStore::open(&path).unwrap();
        store.ensure_slots(&slot_names(&["X"]));
        store.persist().unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
