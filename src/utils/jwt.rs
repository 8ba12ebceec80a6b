// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::user::Role, state::AppState};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - stores the user ID (as string).
    pub sub: String,
    /// Username, carried so catalog writes can record the acting admin.
    pub username: String,
    /// Capability claim: 'super_admin', 'admin' or 'player'.
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::InvalidCredentials("Malformed token subject".to_string()))
    }

    pub fn role(&self) -> Result<Role, AppError> {
        Role::parse(&self.role)
            .ok_or_else(|| AppError::InvalidCredentials("Unknown role claim".to_string()))
    }
}

/// Signs a new JWT for the user.
pub fn sign_jwt(
    id: i64,
    username: &str,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(),
        username: username.to_owned(),
        role: role.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidCredentials("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Pulls the bearer token out of the Authorization header.
pub fn bearer_token(req_headers: &axum::http::HeaderMap) -> Result<&str, AppError> {
    let auth_header = req_headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match auth_header {
        Some(header) if header.starts_with("Bearer ") => Ok(&header[7..]),
        _ => Err(AppError::InvalidCredentials(
            "Missing bearer token".to_string(),
        )),
    }
}

/// Axum middleware: authentication.
///
/// Validates the 'Authorization: Bearer <token>' header against the signing
/// secret and the revocation blocklist, then injects `Claims` into the request
/// extensions for handlers and the role guards below.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?.to_string();

    if state.blocklist.is_revoked(&token) {
        return Err(AppError::InvalidCredentials(
            "Token has been revoked".to_string(),
        ));
    }

    let claims = verify_jwt(&token, &state.config.jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn claims_from_extensions(req: &Request<Body>) -> Result<&Claims, AppError> {
    req.extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::InvalidCredentials("Authentication required".to_string()))
}

/// Axum middleware: requires the 'admin' or 'super_admin' role.
/// Must be layered after `auth_middleware`.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let role = claims_from_extensions(&req)?.role()?;

    if !role.is_admin() {
        return Err(AppError::Forbidden(
            "Administrator privileges required".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

/// Axum middleware: requires the 'super_admin' role.
/// Must be layered after `auth_middleware`.
pub async fn super_admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let role = claims_from_extensions(&req)?.role()?;

    if role != Role::SuperAdmin {
        return Err(AppError::Forbidden(
            "Super administrator privileges required".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

/// Axum middleware: requires the 'player' role. Quizzes and score history are
/// player-facing; admin accounts do not take quizzes.
pub async fn player_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let role = claims_from_extensions(&req)?.role()?;

    if role != Role::Player {
        return Err(AppError::Forbidden(
            "Only players may access this resource".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let token = sign_jwt(42, "quizzer", "player", "unit-test-secret", 600).unwrap();
        let claims = verify_jwt(&token, "unit-test-secret").unwrap();

        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.username, "quizzer");
        assert_eq!(claims.role().unwrap(), Role::Player);
    }

    #[test]
    fn verify_fails_with_wrong_secret() {
        let token = sign_jwt(42, "quizzer", "player", "unit-test-secret", 600).unwrap();
        assert!(verify_jwt(&token, "other-secret").is_err());
    }
}
