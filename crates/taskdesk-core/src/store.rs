//! Durable key-value storage for the credential mirror.
//!
//! The session core only needs `get` / `set` / `remove` / `save`. [`SledStore`] keeps the
//! values on the host filesystem so a later process start can rehydrate the credential;
//! [`MemoryStore`] is the ephemeral variant used by tests and by shells run with `ephemeral = true`.

use crate::error::StoreError;
use dashmap::DashMap;
use std::path::Path;

/// Key under which the bearer credential is mirrored.
pub const CREDENTIAL_KEY: &str = "token";

const DEFAULT_STORE_PATH: &str = "./data/taskdesk/session";
const SESSION_TREE: &str = "session";

/// Contract consumed by the session store and the HTTP transport.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    /// Flush pending writes to durable media.
    fn save(&self) -> Result<(), StoreError>;
}

/// Sled-backed store. One tree (`session`) inside the database at `path`.
pub struct SledStore {
    tree: sled::Tree,
}

impl SledStore {
    /// Open the store at the given path, or `./data/taskdesk/session` when `None`.
    pub fn open(path: Option<impl AsRef<Path>>) -> Result<Self, StoreError> {
        let p = path
            .map(|x| x.as_ref().to_path_buf())
            .unwrap_or_else(|| Path::new(DEFAULT_STORE_PATH).to_path_buf());
        let db = sled::open(p)?;
        let tree = db.open_tree(SESSION_TREE)?;
        Ok(Self { tree })
    }
}

impl DurableStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.tree.get(key.as_bytes())? {
            Some(v) => String::from_utf8(v.to_vec())
                .map(Some)
                .map_err(|_| StoreError::Encoding { key: key.to_string() }),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.tree.insert(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.tree.remove(key.as_bytes())?;
        Ok(())
    }

    fn save(&self) -> Result<(), StoreError> {
        self.tree.flush()?;
        Ok(())
    }
}

/// In-memory store; `save` is a no-op.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a credential, as if a previous run had logged in.
    pub fn with_credential(token: &str) -> Self {
        let store = Self::new();
        store.entries.insert(CREDENTIAL_KEY.to_string(), token.to_string());
        store
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn save(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
