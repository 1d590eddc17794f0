mod role;
mod user;

pub use role::{UserRole, ADMIN_ONLY, EDITOR_OR_ADMIN};
pub use user::{normalize_email, User};
