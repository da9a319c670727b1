//! The persisted game document and the stores that hold it.
//!
//! The whole game lives in one JSON document:
//!
//! ```json
//! { "profiles": { "Mia": { "level": 1, "stats": {}, "lastPlayed": "...", "sessions": [], "quizzes": [] } },
//!   "currentProfile": "Mia" }
//! ```
//!
//! Every write replaces the whole document.
use crate::constants::STORAGE_KEY;
use crate::error::GameError;
use crate::profiles::Profile;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDocument {
    #[serde(default)]
    pub(crate) profiles: BTreeMap<String, Profile>,
    #[serde(default)]
    pub(crate) current_profile: Option<String>,
}

impl GameDocument {
    /// Parse a stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a game document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Opaque get/set of the single game document.
/// Platform-specific backends implement this.
pub trait DocumentStore {
    /// Load the document; `Ok(None)` when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored document cannot be read or parsed.
    fn load(&self) -> Result<Option<GameDocument>, GameError>;

    /// Replace the stored document. Must not partially apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized or written.
    fn save(&self, document: &GameDocument) -> Result<(), GameError>;
}

/// In-process store keeping the serialized JSON text. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    raw: Rc<RefCell<Option<String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw JSON, e.g. a document written by another tool.
    #[must_use]
    pub fn with_raw(json: impl Into<String>) -> Self {
        Self {
            raw: Rc::new(RefCell::new(Some(json.into()))),
        }
    }

    /// The stored JSON text, if any.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.raw.borrow().clone()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self) -> Result<Option<GameDocument>, GameError> {
        self.raw
            .borrow()
            .as_deref()
            .map(GameDocument::from_json)
            .transpose()
            .map_err(GameError::from)
    }

    fn save(&self, document: &GameDocument) -> Result<(), GameError> {
        let json = document.to_json()?;
        *self.raw.borrow_mut() = Some(json);
        Ok(())
    }
}

/// Single-file JSON store. Writes land in a sibling temp file that is then
/// renamed over the target, so readers never observe a torn document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store named after [`STORAGE_KEY`] inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{STORAGE_KEY}.json")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self) -> Result<Option<GameDocument>, GameError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(Some(GameDocument::from_json(&json)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(GameError::Storage(format!(
                "failed to read {}: {err}",
                self.path.display()
            ))),
        }
    }

    fn save(&self, document: &GameDocument) -> Result<(), GameError> {
        let json = serde_json::to_string_pretty(document)?;
        let staging = self.staging_path();
        let written = fs::File::create(&staging).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&staging, &self.path)
        });
        if let Err(err) = written {
            if let Err(cleanup) = fs::remove_file(&staging) {
                log::debug!("no staging file to clean up at {}: {cleanup}", staging.display());
            }
            return Err(GameError::Storage(format!(
                "failed to write {}: {err}",
                self.path.display()
            )));
        }
        Ok(())
    }
}
