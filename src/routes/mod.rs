mod auth;
mod health_check;
mod users;

pub use auth::{logout, refresh, signin, signup};
pub use health_check::health_check;
pub use users::{current_user, get_user, list_users, update_user_role};
