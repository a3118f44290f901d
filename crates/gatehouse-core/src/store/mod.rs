//! Durable key/value persistence for the session records.
//!
//! The session is persisted as exactly two independent string records:
//! - `user`: the JSON-serialized `UserIdentity`
//! - `accessToken`: the raw credential string
//!
//! Backends:
//! - `MemoryStore`: process-local, used in tests and as an ephemeral store
//! - `FileStore`: a JSON map file scoped to the application origin
//! - `KeyringStore`: OS keychain entries scoped to the application origin

pub mod file;
pub mod keyring;
pub mod memory;

use std::fmt;

use thiserror::Error;

pub use file::FileStore;
pub use keyring::KeyringStore;
pub use memory::MemoryStore;

/// The fixed record names a session store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    User,
    AccessToken,
}

impl StoreKey {
    pub const ALL: [StoreKey; 2] = [StoreKey::User, StoreKey::AccessToken];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::User => "user",
            StoreKey::AccessToken => "accessToken",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage is disabled")]
    Disabled,

    #[error("Storage quota exceeded writing '{key}' ({bytes} bytes)")]
    QuotaExceeded { key: StoreKey, bytes: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is unreadable: {0}")]
    Malformed(String),

    #[error("Keychain error: {0}")]
    Keychain(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Origin-scoped persistence for the two session records.
pub trait SessionStore {
    /// Last written value, or `None` if never written or cleared.
    fn read(&self, key: StoreKey) -> StorageResult<Option<String>>;

    fn write(&mut self, key: StoreKey, value: &str) -> StorageResult<()>;

    /// Remove the value. Clearing an absent key succeeds.
    fn clear(&mut self, key: StoreKey) -> StorageResult<()>;
}

impl<S: SessionStore + ?Sized> SessionStore for Box<S> {
    fn read(&self, key: StoreKey) -> StorageResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&mut self, key: StoreKey, value: &str) -> StorageResult<()> {
        (**self).write(key, value)
    }

    fn clear(&mut self, key: StoreKey) -> StorageResult<()> {
        (**self).clear(key)
    }
}

/// Encode an origin such as `http://localhost:5173` as a name that is safe
/// to use as a directory or keychain service component.
///
/// Surrounding whitespace, a trailing `/` and letter case are normalized
/// away; everything else is percent-encoded, so distinct origins never share
/// a store. The empty origin encodes as `%`, which percent-encoding never
/// produces on its own.
pub fn sanitize_origin(origin: &str) -> String {
    let normalized = origin.trim().trim_end_matches('/').to_ascii_lowercase();
    if normalized.is_empty() {
        return "%".to_string();
    }
    urlencoding::encode(&normalized).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_names() {
        assert_eq!(StoreKey::User.as_str(), "user");
        assert_eq!(StoreKey::AccessToken.as_str(), "accessToken");
        assert_eq!(StoreKey::AccessToken.to_string(), "accessToken");
    }

    #[test]
    fn test_sanitize_origin() {
        assert_eq!(sanitize_origin("http://localhost:5173"), "http%3A%2F%2Flocalhost%3A5173");
        assert_eq!(sanitize_origin("https://App.Example.com/"), "https%3A%2F%2Fapp.example.com");
        assert_eq!(sanitize_origin(""), "%");
    }

    #[test]
    fn test_sanitize_origin_keeps_origins_apart() {
        let origins = ["http://a:1", "http_//a_1", "http://a_1", "_", "%", "default", ""];
        let encoded: std::collections::HashSet<String> =
            origins.iter().map(|o| sanitize_origin(o)).collect();
        assert_eq!(encoded.len(), origins.len());

        for origin in origins.iter().filter(|o| !o.is_empty()) {
            let decoded = urlencoding::decode(&sanitize_origin(origin)).unwrap().into_owned();
            assert_eq!(&decoded, origin);
        }
    }

    #[test]
    fn test_boxed_store_delegates() {
        let inner = MemoryStore::new();
        let mut boxed: Box<dyn SessionStore> = Box::new(inner.clone());
        boxed.write(StoreKey::User, "{}").unwrap();
        assert_eq!(inner.read(StoreKey::User).unwrap().as_deref(), Some("{}"));
        boxed.clear(StoreKey::User).unwrap();
        assert_eq!(inner.read(StoreKey::User).unwrap(), None);
    }
}
