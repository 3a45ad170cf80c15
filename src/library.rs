use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Key under which the document list is stored. The browser shell uses the
/// same key in `localStorage`.
pub const DOCUMENTS_KEY: &str = "documents";

/// An input/output pair saved by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDocument {
    pub input_text: String,
    pub generated_text: String,
    pub saved_at: DateTime<Utc>,
}

impl SavedDocument {
    /// Stamp a new record with the current time.
    pub fn new(input_text: &str, generated_text: &str) -> Self {
        Self {
            input_text: input_text.to_string(),
            generated_text: generated_text.to_string(),
            saved_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("stored documents are not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String key-value store scoped to one user, like browser `localStorage`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, LibraryError>;
    fn set(&self, key: &str, value: &str) -> Result<(), LibraryError>;
}

/// Volatile store. The page session seeds one per request with the page's
/// `localStorage` value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        Self {
            entries: Mutex::new(HashMap::from([(key.to_string(), value.to_string())])),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, LibraryError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| LibraryError::Unavailable(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LibraryError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| LibraryError::Unavailable(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Append-only list of [`SavedDocument`]s under [`DOCUMENTS_KEY`].
#[derive(Debug)]
pub struct DocumentLibrary<S> {
    store: S,
}

impl<S: KeyValueStore> DocumentLibrary<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All documents in insertion order. A missing key is an empty list.
    pub fn load(&self) -> Result<Vec<SavedDocument>, LibraryError> {
        match self.store.get(DOCUMENTS_KEY)? {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => Ok(Vec::new()),
        }
    }

    /// Read-modify-write append. Returns the new list.
    pub fn append(&self, document: SavedDocument) -> Result<Vec<SavedDocument>, LibraryError> {
        let mut documents = self.load()?;
        documents.push(document);
        self.store
            .set(DOCUMENTS_KEY, &serde_json::to_string(&documents)?)?;
        log::info!("Saved document #{}", documents.len());
        Ok(documents)
    }

    /// The serialized list as stored, if any.
    pub fn raw(&self) -> Result<Option<String>, LibraryError> {
        self.store.get(DOCUMENTS_KEY)
    }
}
