//! Key/value storage for the persisted session token.
//!
//! On a phone this would be the platform's secure storage; here the trait
//! is the seam, with an in-memory store for tests and ephemeral clients and
//! a single-file JSON store for desktop and CLI use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::TransportError;

/// A string key/value store.
///
/// Methods are synchronous: implementations are expected to be small and
/// local. `dyn`-compatible so a backend can hold `Box<dyn TokenStore>`.
pub trait TokenStore: Send + Sync + 'static {
    fn get_item(&self, key: &str) -> Result<Option<String>, TransportError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), TransportError>;
    fn remove_item(&self, key: &str) -> Result<(), TransportError>;
}

macro_rules! forward_token_store {
    ($wrapper:ident) => {
        impl<T: TokenStore + ?Sized> TokenStore for $wrapper<T> {
            fn get_item(&self, key: &str) -> Result<Option<String>, TransportError> {
                (**self).get_item(key)
            }

            fn set_item(&self, key: &str, value: &str) -> Result<(), TransportError> {
                (**self).set_item(key, value)
            }

            fn remove_item(&self, key: &str) -> Result<(), TransportError> {
                (**self).remove_item(key)
            }
        }
    };
}

// A shared store lets the caller keep a handle to what the backend persists.
forward_token_store!(Arc);
forward_token_store!(Box);

fn poisoned<T>(_: T) -> TransportError {
    TransportError::Storage("token store lock poisoned".into())
}

// ---------------------------------------------------------------------------
// MemoryTokenStore
// ---------------------------------------------------------------------------

/// Keeps items in a `HashMap` for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, TransportError> {
        Ok(self.items.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), TransportError> {
        self.items
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), TransportError> {
        self.items.lock().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileTokenStore
// ---------------------------------------------------------------------------

/// Persists all items as one JSON object in a file.
///
/// Every write rewrites the whole file. The mutex serializes writers
/// within the process; nothing guards against a second process.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    /// Uses `path` as the backing file. It is created on first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, TransportError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| TransportError::Storage(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(TransportError::Storage(format!("{}: {e}", self.path.display()))),
        }
    }

    fn write_all(&self, items: &HashMap<String, String>) -> Result<(), TransportError> {
        let bytes = serde_json::to_vec_pretty(items)
            .map_err(|e| TransportError::Storage(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| TransportError::Storage(format!("{}: {e}", parent.display())))?;
            }
        }
        std::fs::write(&self.path, bytes)
            .map_err(|e| TransportError::Storage(format!("{}: {e}", self.path.display())))
    }
}

impl TokenStore for FileTokenStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, TransportError> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), TransportError> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut items = self.read_all()?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), TransportError> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut items = self.read_all()?;
        if items.remove(key).is_some() {
            self.write_all(&items)?;
        }
        Ok(())
    }
}
