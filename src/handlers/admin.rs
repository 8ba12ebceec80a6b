// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::user::{CreateAdminRequest, Role, User},
    state::AppState,
    utils::hash::hash_password,
};

const USER_COLUMNS: &str = "u.user_id, u.name, u.email, c.username, u.role, u.registration_date";

async fn list_users_with_role(state: &AppState, role: Role) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS}
         FROM users u
         JOIN credentials c ON c.user_id = u.user_id
         WHERE u.role = $1
         ORDER BY u.user_id DESC"
    ))
    .bind(role.as_str())
    .fetch_all(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list {} accounts: {:?}", role, e);
        AppError::Internal(e.to_string())
    })?;

    Ok(users)
}

async fn delete_user_with_role(
    state: &AppState,
    id: i64,
    role: Role,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE user_id = $1 AND role = $2")
        .bind(id)
        .bind(role.as_str())
        .execute(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete {} {}: {:?}", role, id, e);
            AppError::Internal(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::DataNotFound(format!(
            "No {role} account with id {id}"
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists all admin accounts.
/// Super admin only.
pub async fn list_admins(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(list_users_with_role(&state, Role::Admin).await?))
}

/// Creates a new admin account with a seeded password.
/// Super admin only. The account starts with `is_password_changed = FALSE`,
/// forcing a password change on the admin's first login.
pub async fn create_admin(
    State(state): State<AppState>,
    Json(payload): Json<CreateAdminRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::InvalidInput(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = state.pool.begin().await?;

    let (user_id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (name, email, role) VALUES ($1, $2, 'admin') RETURNING user_id",
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::DuplicateEntry(format!("Email '{}' is already registered", payload.email))
        } else {
            tracing::error!("Failed to create admin: {:?}", e);
            AppError::from(e)
        }
    })?;

    sqlx::query(
        "INSERT INTO credentials (user_id, username, password, is_password_changed)
         VALUES ($1, $2, $3, FALSE)",
    )
    .bind(user_id)
    .bind(&payload.username)
    .bind(&hashed_password)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::DuplicateEntry(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to store admin credentials: {:?}", e);
            AppError::from(e)
        }
    })?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "user_id": user_id }))))
}

/// Deletes an admin account by id. Cascades remove its credentials.
/// Super admin only.
pub async fn delete_admin(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    delete_user_with_role(&state, id, Role::Admin).await
}

/// Lists all player accounts.
/// Admin only.
pub async fn list_players(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(list_users_with_role(&state, Role::Player).await?))
}

/// Deletes a player account by id; their score records cascade away with it.
/// Admin only.
pub async fn delete_player(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    delete_user_with_role(&state, id, Role::Player).await
}
