use crate::storage::{load_from_disk, save_to_disk, Result, StorageError};
use crate::user_models::User;
use std::path::PathBuf;
use tokio::sync::RwLock;

pub const USERS_FILE: &str = "users.json";

pub struct UserStorage {
    users: RwLock<Vec<User>>,
    path: Option<PathBuf>,
}

impl UserStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let users: Vec<User> = load_from_disk(&path)?;
        tracing::debug!(count = users.len(), path = %path.display(), "Loaded users");

        Ok(Self {
            users: RwLock::new(users),
            path: Some(path),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            path: None,
        }
    }

    /// Inserts a user, rejecting a name or email that is already taken.
    pub async fn create_user(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;

        if users.iter().any(|u| u.email == user.email) {
            return Err(StorageError::Duplicate("email"));
        }
        if users.iter().any(|u| u.name == user.name) {
            return Err(StorageError::Duplicate("name"));
        }

        let mut next = users.clone();
        next.push(user.clone());
        if let Some(path) = &self.path {
            save_to_disk(path, &next)?;
        }
        *users = next;
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str) -> User {
        User::new(name.to_string(), email.to_string(), "hash".to_string())
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let storage = UserStorage::in_memory();
        let alice = storage.create_user(user("alice", "a@x.com")).await.unwrap();

        let by_id = storage.get_user(&alice.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "alice");
        let by_email = storage.get_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, alice.id);
        assert!(storage.get_user("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_or_email_rejected() {
        let storage = UserStorage::in_memory();
        storage.create_user(user("alice", "a@x.com")).await.unwrap();

        let err = storage.create_user(user("other", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate("email")));

        let err = storage.create_user(user("alice", "b@x.com")).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate("name")));
    }

    #[tokio::test]
    async fn test_users_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(USERS_FILE);

        let id = {
            let storage = UserStorage::open(&path).unwrap();
            storage.create_user(user("alice", "a@x.com")).await.unwrap().id
        };

        let reopened = UserStorage::open(&path).unwrap();
        assert_eq!(reopened.get_user(&id).await.unwrap().unwrap().email, "a@x.com");
    }

    #[tokio::test]
    async fn test_failed_write_does_not_register_user() {
        let dir = tempfile::tempdir().unwrap();
        let storage = UserStorage::open(dir.path().join("missing").join(USERS_FILE)).unwrap();

        assert!(storage.create_user(user("alice", "a@x.com")).await.is_err());
        assert!(storage.get_user_by_email("a@x.com").await.unwrap().is_none());
    }
}
