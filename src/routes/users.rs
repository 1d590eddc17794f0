/// User Routes
///
/// `GET /me` for any authenticated caller; the rest is Admin-only account
/// management. A role update is visible to the affected user only after
/// their next refresh or signin.

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::auth::Claims;
use crate::contracts::{UpdateUserRoleRequest, UserResponse};
use crate::domain::UserRole;
use crate::error::AppError;
use crate::users::UserDirectory;

/// GET /me
pub async fn current_user(
    claims: web::ReqData<Claims>,
    users: web::Data<dyn UserDirectory>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let user = users
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

/// GET /users
pub async fn list_users(users: web::Data<dyn UserDirectory>) -> Result<HttpResponse, AppError> {
    let all: Vec<UserResponse> = users.list().await?.iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(all))
}

/// GET /users/{id}
pub async fn get_user(
    path: web::Path<Uuid>,
    users: web::Data<dyn UserDirectory>,
) -> Result<HttpResponse, AppError> {
    let user = users
        .get_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

/// PATCH /users/{id}/role
pub async fn update_user_role(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    form: web::Json<UpdateUserRoleRequest>,
    users: web::Data<dyn UserDirectory>,
) -> Result<HttpResponse, AppError> {
    let role = UserRole::parse_required(&form.role)?;

    let mut user = users
        .get_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    let previous = user.role;
    user.change_role(role);
    users.save(&user).await?;

    tracing::info!(
        admin_id = %claims.sub,
        user_id = %user.id,
        from = %previous,
        to = %role,
        "User role updated"
    );

    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}
