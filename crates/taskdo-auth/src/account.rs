use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use taskdo_core::{keys, StorageError, SyncStore, SyncStoreExt};

/// A signed-in Google account. The email doubles as the id.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAccount")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("picture", &self.picture)
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

impl UserAccount {
    /// Up to two initials from the display name, for avatar placeholders.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect()
    }
}

/// Account list persisted under the `accounts` key.
///
/// Writes go through one lock shared by all clones, so concurrent
/// read-modify-write cycles never drop each other's changes.
#[derive(Clone)]
pub struct AccountStore {
    store: Arc<dyn SyncStore>,
    write_lock: Arc<Mutex<()>>,
}

impl AccountStore {
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn load(&self) -> Result<Vec<UserAccount>, StorageError> {
        Ok(self
            .store
            .get_json::<Vec<UserAccount>>(keys::ACCOUNTS)?
            .unwrap_or_default())
    }

    pub fn save_all(&self, accounts: &[UserAccount]) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        self.store.set_json(keys::ACCOUNTS, accounts)
    }

    /// Insert or replace by email; a replaced account moves to the end.
    pub fn upsert(&self, account: &UserAccount) -> Result<(), StorageError> {
        self.modify(|accounts| {
            accounts.retain(|acc| acc.email != account.email);
            accounts.push(account.clone());
        })
    }

    /// Replace the stored account with the same id, if present.
    pub fn update(&self, account: &UserAccount) -> Result<(), StorageError> {
        self.modify(|accounts| {
            if let Some(existing) = accounts.iter_mut().find(|acc| acc.id == account.id) {
                *existing = account.clone();
            }
        })
    }

    pub fn remove(&self, account_id: &str) -> Result<(), StorageError> {
        self.modify(|accounts| accounts.retain(|acc| acc.id != account_id))
    }

    fn modify(&self, change: impl FnOnce(&mut Vec<UserAccount>)) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let mut accounts = self.load()?;
        change(&mut accounts);
        self.store.set_json(keys::ACCOUNTS, &accounts)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use taskdo_core::MemorySyncStore;

    fn account(email: &str, token: &str) -> UserAccount {
        UserAccount {
            id: email.to_string(),
            email: email.to_string(),
            name: "Ada Lovelace".to_string(),
            picture: None,
            access_token: token.to_string(),
            refresh_token: Some("refresh".to_string()),
        }
    }

    #[test]
    fn test_initials() {
        assert_eq!(account("a@x.com", "t").initials(), "AL");
        let mut single = account("b@x.com", "t");
        single.name = "grace".into();
        assert_eq!(single.initials(), "G");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(account("a@x.com", "tok")).unwrap();
        assert_eq!(json["accessToken"], "tok");
        assert_eq!(json["refreshToken"], "refresh");
        assert!(json.get("picture").is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug = format!("{:?}", account("a@x.com", "secret-token"));
        assert!(debug.contains("a@x.com"));
        assert!(!debug.contains("secret-token"));
        assert!(!debug.contains("\"refresh\""));
    }

    #[test]
    fn test_upsert_replaces_same_email() {
        let store = AccountStore::new(Arc::new(MemorySyncStore::new()));
        store.upsert(&account("a@x.com", "one")).unwrap();
        store.upsert(&account("b@x.com", "two")).unwrap();
        store.upsert(&account("a@x.com", "three")).unwrap();

        let accounts = store.load().unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].email, "b@x.com");
        assert_eq!(accounts[1].access_token, "three");
    }

    #[test]
    fn test_update_keeps_position() {
        let store = AccountStore::new(Arc::new(MemorySyncStore::new()));
        store
            .save_all(&[account("a@x.com", "one"), account("b@x.com", "two")])
            .unwrap();
        store.update(&account("a@x.com", "fresh")).unwrap();

        let accounts = store.load().unwrap();
        assert_eq!(accounts[0].access_token, "fresh");
        assert_eq!(accounts[1].access_token, "two");
    }

    /// Delays reads so overlapping writers would interleave without the lock.
    struct SlowReads(MemorySyncStore);

    impl SyncStore for SlowReads {
        fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
            let value = self.0.get(key);
            std::thread::sleep(std::time::Duration::from_millis(50));
            value
        }

        fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.0.remove(key)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_updates_keep_both_tokens() {
        let store = AccountStore::new(Arc::new(SlowReads(MemorySyncStore::new())));
        store
            .save_all(&[account("a@x.com", "old"), account("b@x.com", "old")])
            .unwrap();

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.update(&account("a@x.com", "fresh")) })
        };
        let second = {
            let store = store.clone();
            tokio::spawn(async move { store.update(&account("b@x.com", "fresh")) })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let tokens: Vec<String> = store
            .load()
            .unwrap()
            .into_iter()
            .map(|acc| acc.access_token)
            .collect();
        assert_eq!(tokens, vec!["fresh", "fresh"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_remove_is_not_undone_by_update() {
        let store = AccountStore::new(Arc::new(SlowReads(MemorySyncStore::new())));
        store
            .save_all(&[account("a@x.com", "old"), account("b@x.com", "old")])
            .unwrap();

        let removal = {
            let store = store.clone();
            tokio::spawn(async move { store.remove("a@x.com") })
        };
        let refresh = {
            let store = store.clone();
            tokio::spawn(async move { store.update(&account("b@x.com", "fresh")) })
        };
        removal.await.unwrap().unwrap();
        refresh.await.unwrap().unwrap();

        let accounts = store.load().unwrap();
        assert_eq!(accounts, vec![account("b@x.com", "fresh")]);
    }

    #[test]
    fn test_remove() {
        let store = AccountStore::new(Arc::new(MemorySyncStore::new()));
        store.upsert(&account("a@x.com", "one")).unwrap();
        store.remove("a@x.com").unwrap();
        assert!(store.load().unwrap().is_empty());
    }
}
