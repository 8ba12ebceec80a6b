// src/handlers/auth.rs

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::user::{ChangePasswordRequest, LoginRequest, LoginRow, RegisterRequest, Role},
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, bearer_token, sign_jwt},
    },
};

/// Registers a new player account.
///
/// Inserts the user row and its credential row in one transaction; the
/// password is hashed with Argon2 before storing.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::InvalidInput(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = state.pool.begin().await?;

    let (user_id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (name, email, role) VALUES ($1, $2, 'player') RETURNING user_id",
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::DuplicateEntry(format!("Email '{}' is already registered", payload.email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    sqlx::query(
        "INSERT INTO credentials (user_id, username, password, is_password_changed)
         VALUES ($1, $2, $3, TRUE)",
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
            tracing::error!("Failed to store credentials: {:?}", e);
            AppError::from(e)
        }
    })?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user_id": user_id,
            "username": payload.username,
            "role": Role::Player,
        })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// `must_change_password` is set for admin accounts still on their seeded
/// password; such an admin is expected to call /change-password next.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::InvalidInput(validation_errors.to_string()));
    }

    let row = sqlx::query_as::<_, LoginRow>(
        "SELECT u.user_id, c.username, u.role, c.password, c.is_password_changed
         FROM users u
         JOIN credentials c ON c.user_id = u.user_id
         WHERE c.username = $1",
    )
    .bind(&payload.username)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    let row = row.ok_or_else(|| {
        AppError::InvalidCredentials("Invalid username or password".to_string())
    })?;

    let is_valid = verify_password(&payload.password, &row.password)?;
    if !is_valid {
        return Err(AppError::InvalidCredentials(
            "Invalid username or password".to_string(),
        ));
    }

    let token = sign_jwt(
        row.user_id,
        &row.username,
        &row.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    let must_change_password = row.role == Role::Admin.as_str() && !row.is_password_changed;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": row.role,
        "must_change_password": must_change_password,
    })))
}

/// Revokes the presented token. Subsequent requests with it are rejected by
/// the auth middleware.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = bearer_token(&headers)?;
    state.blocklist.revoke(token);

    Ok(Json(json!({ "message": "Logged out" })))
}

/// Issues a fresh token from still-valid claims and revokes the old one.
pub async fn refresh(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = sign_jwt(
        claims.user_id()?,
        &claims.username,
        &claims.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    state.blocklist.revoke(bearer_token(&headers)?);

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
    })))
}

/// Changes the caller's password after verifying the current one, and clears
/// the forced-change flag seeded admin accounts start with.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::InvalidInput(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    let stored: Option<(String,)> =
        sqlx::query_as("SELECT password FROM credentials WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&state.pool)
            .await?;

    let (stored_hash,) = stored
        .ok_or_else(|| AppError::DataNotFound("Credential record not found".to_string()))?;

    if !verify_password(&payload.old_password, &stored_hash)? {
        return Err(AppError::InvalidCredentials(
            "Current password is incorrect".to_string(),
        ));
    }

    let new_hash = hash_password(&payload.new_password)?;

    sqlx::query(
        "UPDATE credentials SET password = $1, is_password_changed = TRUE WHERE user_id = $2",
    )
    .bind(&new_hash)
    .bind(user_id)
    .execute(&state.pool)
    .await?;

    Ok(Json(json!({ "message": "Password updated" })))
}
