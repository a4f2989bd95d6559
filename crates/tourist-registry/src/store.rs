//! JSON file store
//!
//! The whole [`Store`] is one pretty-printed JSON document. Loading a missing
//! file creates it with the zero-value store. Saves go through a sibling
//! temporary file and a rename so a crash mid-write never leaves a truncated
//! document behind.

use crate::model::Store;
use crate::{RegistryError, Result};
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{error, info, warn};

/// What to do when the store file exists but does not parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorruptionPolicy {
    /// Move the bad file aside and start over with an empty store
    #[default]
    Reinitialize,
    /// Fail every load until an operator repairs the file
    Refuse,
}

impl FromStr for CorruptionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reinitialize" | "reinit" | "reset" => Ok(Self::Reinitialize),
            "refuse" | "fail" => Ok(Self::Refuse),
            other => Err(format!("unknown corruption policy: {other}")),
        }
    }
}

impl fmt::Display for CorruptionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reinitialize => f.write_str("reinitialize"),
            Self::Refuse => f.write_str("refuse"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    policy: CorruptionPolicy,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, policy: CorruptionPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> CorruptionPolicy {
        self.policy
    }

    pub fn load(&self) -> Result<Store> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let store = Store::default();
                self.save(&store)?;
                info!("Created empty store at {}", self.path.display());
                return Ok(store);
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<Store>(&bytes) {
            Ok(store) => Ok(store),
            Err(source) => match self.policy {
                CorruptionPolicy::Reinitialize => {
                    error!(
                        "Failed reading store {}, reinitializing: {}",
                        self.path.display(),
                        source
                    );
                    self.quarantine()?;
                    let store = Store::default();
                    self.save(&store)?;
                    Ok(store)
                }
                CorruptionPolicy::Refuse => {
                    error!("Store {} is corrupt: {}", self.path.display(), source);
                    Err(RegistryError::Corrupt {
                        path: self.path.clone(),
                        source,
                    })
                }
            },
        }
    }

    pub fn save(&self, store: &Store) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(store)?;
        let tmp = self.sibling(".tmp");
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            warn!("Store rename failed for {}: {}", self.path.display(), e);
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Rename an unparsable store file to `<file>.corrupt-<millis>`
    fn quarantine(&self) -> Result<PathBuf> {
        let suffix = format!(".corrupt-{}", chrono::Utc::now().timestamp_millis());
        let target = self.sibling(&suffix);
        fs::rename(&self.path, &target)?;
        warn!("Corrupt store moved to {}", target.display());
        Ok(target)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }
}
