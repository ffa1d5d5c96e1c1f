use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

pub const LANGUAGE_KEY: &str = "language";
pub const THEME_KEY: &str = "theme";
pub const USER_EMAIL_KEY: &str = "userEmail";
pub const AUTH_TOKEN_KEY: &str = "authToken";

#[derive(Debug, Error, PartialEq)]
pub enum StorageError {
    #[error("local storage is not available")]
    Unavailable,
    #[error("failed to write {0}")]
    Write(String),
}

/// String key/value persistence shared by the providers and the auth flow.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str);

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }
}

/// `window.localStorage`. Every call re-resolves the storage object, so a
/// browser with storage disabled just reads as empty.
#[derive(Clone, Copy, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let storage = Self::storage().ok_or(StorageError::Unavailable)?;
        storage
            .set_item(key, value)
            .map_err(|_| StorageError::Write(key.to_string()))
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// In-memory store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

/// Shared handle passed through props. Two handles are equal when they
/// point at the same store.
#[derive(Clone)]
pub struct StorageHandle(pub Rc<dyn KeyValueStore>);

impl StorageHandle {
    pub fn browser() -> Self {
        Self(Rc::new(BrowserStorage))
    }
}

impl Default for StorageHandle {
    fn default() -> Self {
        Self::browser()
    }
}

impl PartialEq for StorageHandle {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.0) as *const (),
            Rc::as_ptr(&other.0) as *const (),
        )
    }
}

impl std::ops::Deref for StorageHandle {
    type Target = dyn KeyValueStore;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_removes() {
        let store = MemoryStorage::new();
        assert_eq!(store.get(THEME_KEY), None);
        store.set(THEME_KEY, "dark").unwrap();
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));
        store.remove(THEME_KEY);
        assert_eq!(store.get_or(THEME_KEY, "light"), "light");
    }

    #[test]
    fn clones_share_items() {
        let store = MemoryStorage::new();
        let other = store.clone();
        store.set(AUTH_TOKEN_KEY, "tok").unwrap();
        assert_eq!(other.get(AUTH_TOKEN_KEY).as_deref(), Some("tok"));
    }

    #[test]
    fn handles_compare_by_identity() {
        let shared: Rc<dyn KeyValueStore> = Rc::new(MemoryStorage::new());
        let a = StorageHandle(shared.clone());
        let b = StorageHandle(shared);
        let c = StorageHandle(Rc::new(MemoryStorage::new()));
        assert!(a == b);
        assert!(a != c);
    }
}
