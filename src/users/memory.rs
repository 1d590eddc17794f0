use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::UserDirectory;
use crate::domain::{normalize_email, User};
use crate::error::AppError;

/// Process-local directory for tests and local runs
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn remove(&self, id: Uuid) -> Option<User> {
        self.users.write().await.remove(&id)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn add(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        let email = normalize_email(&user.email);
        if users.values().any(|u| u.email == email) {
            return Err(AppError::Conflict("Email is already registered.".to_string()));
        }
        let mut stored = user.clone();
        stored.email = email;
        users.insert(stored.id, stored);
        Ok(())
    }

    async fn save(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("User not found.".to_string())),
        }
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }
}
