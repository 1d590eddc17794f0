/// User directory
///
/// Persistence boundary for accounts. Implementations must treat emails
/// case- and whitespace-insensitively; callers pass normalized emails but
/// lookups normalize again.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::User;
use crate::error::AppError;

mod memory;
mod postgres;

pub use memory::InMemoryUserDirectory;
pub use postgres::PgUserDirectory;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Insert a new account. A taken email is a `Conflict`.
    async fn add(&self, user: &User) -> Result<(), AppError>;

    /// Persist changes to an existing account.
    async fn save(&self, user: &User) -> Result<(), AppError>;

    /// All accounts ordered by email.
    async fn list(&self) -> Result<Vec<User>, AppError>;
}
