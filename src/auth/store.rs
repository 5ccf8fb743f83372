use super::provider::Identity;
use keyring::Entry;
use serde::{Deserialize, Serialize};

pub const KEYRING_SERVICE_NAME: &str = "tuigallery-session";
pub const KEYRING_USERNAME: &str = "default_user";

/// What survives a restart: enough to mint a new ID token without asking for a password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub identity: Identity,
    pub refresh_token: String,
}

// Define a trait for Keyring operations to allow mocking
#[cfg_attr(test, mockall::automock)]
pub trait KeyringEntry: Send + Sync {
    fn get_password(&self) -> Result<String, keyring::Error>;
    fn set_password(&self, password: &str) -> Result<(), keyring::Error>;
    fn delete_password(&self) -> Result<(), keyring::Error>;
}

// Implement the trait for the real keyring::Entry
impl KeyringEntry for Entry {
    fn get_password(&self) -> Result<String, keyring::Error> {
        self.get_password()
    }
    fn set_password(&self, password: &str) -> Result<(), keyring::Error> {
        self.set_password(password)
    }
    fn delete_password(&self) -> Result<(), keyring::Error> {
        self.delete_password()
    }
}

pub fn default_entry() -> Result<Entry, keyring::Error> {
    Entry::new(KEYRING_SERVICE_NAME, KEYRING_USERNAME)
}

pub fn load_stored_session<K: KeyringEntry + ?Sized>(
    entry: &K,
) -> Result<Option<StoredSession>, Box<dyn std::error::Error + Send + Sync>> {
    match entry.get_password() {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_stored_session<K: KeyringEntry + ?Sized>(
    entry: &K,
    session: &StoredSession,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let json = serde_json::to_string(session)?;
    entry.set_password(&json)?;
    Ok(())
}

/// Removing an entry that does not exist is not an error.
pub fn clear_stored_session<K: KeyringEntry + ?Sized>(entry: &K) -> Result<(), keyring::Error> {
    match entry.delete_password() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e),
    }
}
