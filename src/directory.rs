// User directory seam
// Account persistence is an external collaborator; this crate only reads
// records by identifier and writes back password hashes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::User;

/// Directory errors
#[derive(Debug)]
pub enum DirectoryError {
    UserNotFound,
    Backend(String),
}

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectoryError::UserNotFound => write!(f, "User not found"),
            DirectoryError::Backend(msg) => write!(f, "Directory backend error: {}", msg),
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Trait for user directory implementations
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by email
    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError>;

    /// Look up a user by ID
    async fn find_by_id(&self, user_id: Uuid) -> Result<User, DirectoryError>;

    /// Replace the stored password hash for a user
    async fn set_password_hash(&self, user_id: Uuid, hash: &str) -> Result<(), DirectoryError>;
}

/// In-memory directory, for tests and embedding
pub struct MemoryDirectory {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        let users = self.users.read().await;

        users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DirectoryError::UserNotFound)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<User, DirectoryError> {
        let users = self.users.read().await;

        users.get(&user_id).cloned().ok_or(DirectoryError::UserNotFound)
    }

    async fn set_password_hash(&self, user_id: Uuid, hash: &str) -> Result<(), DirectoryError> {
        let mut users = self.users.write().await;

        match users.get_mut(&user_id) {
            Some(user) => {
                user.password_hash = hash.to_string();
                Ok(())
            }
            None => Err(DirectoryError::UserNotFound),
        }
    }
}
