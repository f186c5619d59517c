use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{UserRecord, role_set};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to load user records: {0}")]
    Load(String),
}

/// UserStore
///
/// The external user store the credential validator reads from. Implementations own their I/O
/// and retry policy; callers perform a single lookup per login attempt.
///
/// **Send + Sync + async_trait** make `Arc<dyn UserStore>` shareable across request tasks.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the record for `username`, or `None` when no such user exists.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
}

pub type UserStoreState = Arc<dyn UserStore>;

/// MemoryUserStore
///
/// Read-only in-memory store keyed by username. Built once at startup, either from a JSON
/// array of [`UserRecord`]s or from records supplied by the caller.
#[derive(Debug, Default, Clone)]
pub struct MemoryUserStore {
    users: HashMap<String, UserRecord>,
}

impl MemoryUserStore {
    pub fn new(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let users = records
            .into_iter()
            .map(|record| (record.username.clone(), record))
            .collect();
        Self { users }
    }

    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        let records: Vec<UserRecord> =
            serde_json::from_str(raw).map_err(|e| StoreError::Load(e.to_string()))?;
        Ok(Self::new(records))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Load(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Local-only seed: `user`, `moderator` and `admin`, each holding the matching role and
    /// sharing `password`.
    pub fn with_demo_users(password: &str) -> Result<Self, StoreError> {
        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| StoreError::Load(e.to_string()))?;
        let records = [("user", "USER"), ("moderator", "MODERATOR"), ("admin", "ADMIN")]
            .into_iter()
            .map(|(username, role)| UserRecord {
                id: Uuid::new_v4(),
                username: username.to_string(),
                password_hash: hash.clone(),
                roles: role_set([role]),
            });
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_records_from_json() {
        let store = MemoryUserStore::from_json(
            r#"[
                {"id": "00000000-0000-0000-0000-000000000001", "username": "alice",
                 "password_hash": "$2b$04$x", "roles": ["ADMIN", "USER"]},
                {"id": "00000000-0000-0000-0000-000000000002", "username": "bob",
                 "password_hash": "$2b$04$y"}
            ]"#,
        )
        .unwrap();

        assert_eq!(store.len(), 2);
        let bob = store.find_by_username("bob").await.unwrap().unwrap();
        assert!(bob.roles.is_empty());
        assert!(store.find_by_username("carol").await.unwrap().is_none());
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            MemoryUserStore::from_json("{not json"),
            Err(StoreError::Load(_))
        ));
    }
}
