use keyring::Entry;
use tracing::debug;

use super::{sanitize_origin, SessionStore, StorageError, StorageResult, StoreKey};

/// Keychain service name prefix; the origin is appended.
const SERVICE_PREFIX: &str = "gatehouse";

/// Session store backed by the OS keychain.
///
/// Each record is a keychain entry whose service is `gatehouse:<origin>`
/// and whose account name is the record key. Records persist through the
/// platform store enabled on the `keyring` dependency: macOS Keychain,
/// Windows Credential Manager, or the Linux kernel keyring (which lasts for
/// the login session). Unit tests never reach the real keychain.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn for_origin(origin: &str) -> Self {
        Self {
            service: format!("{}:{}", SERVICE_PREFIX, sanitize_origin(origin)),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: StoreKey) -> StorageResult<Entry> {
        Entry::new(&self.service, key.as_str())
            .map_err(|e| StorageError::Keychain(format!("Failed to create keyring entry: {}", e)))
    }
}

impl SessionStore for KeyringStore {
    fn read(&self, key: StoreKey) -> StorageResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::Keychain(e.to_string())),
        }
    }

    fn write(&mut self, key: StoreKey, value: &str) -> StorageResult<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| StorageError::Keychain(e.to_string()))?;
        debug!(%key, service = %self.service, "Stored session record in keychain");
        Ok(())
    }

    fn clear(&mut self, key: StoreKey) -> StorageResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::Keychain(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_is_origin_scoped() {
        let store = KeyringStore::for_origin("http://localhost:5173");
        assert_eq!(store.service(), "gatehouse:http%3A%2F%2Flocalhost%3A5173");
    }
}
