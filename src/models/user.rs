// src/models/user.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::LazyLock;
use validator::Validate;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{3,30}$").expect("valid username regex"));

/// Permission level carried by a user record and by the token's role claim.
/// SuperAdmin > Admin > Player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Player,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Player => "player",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "super_admin" => Some(Role::SuperAdmin),
            "admin" => Some(Role::Admin),
            "player" => Some(Role::Player),
            _ => None,
        }
    }

    /// Admins and super admins both clear an 'admin required' check.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the 'users' table joined with 'credentials' for listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: String,
    pub registration_date: chrono::DateTime<chrono::Utc>,
}

/// Row fetched at login time: user identity plus stored credential.
#[derive(Debug, FromRow)]
pub struct LoginRow {
    pub user_id: i64,
    pub username: String,
    pub role: String,

    /// Argon2 password hash. Never serialized.
    pub password: String,

    /// False for admin accounts that still must change their seeded password.
    pub is_password_changed: bool,
}

fn validate_username(username: &str) -> Result<(), validator::ValidationError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_username"))
    }
}

/// DTO for player self-registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters."))]
    pub name: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(custom(function = validate_username))]
    pub username: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for changing one's own password.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 128))]
    pub old_password: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub new_password: String,
}

/// DTO for a super admin creating an admin account.
/// The account is seeded with `is_password_changed = false`, which forces a
/// password change on the admin's first login.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(custom(function = validate_username))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_strings() {
        for role in [Role::SuperAdmin, Role::Admin, Role::Player] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn admin_check_covers_both_admin_tiers() {
        assert!(Role::SuperAdmin.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Player.is_admin());
    }

    #[test]
    fn register_rejects_bad_username() {
        let req = RegisterRequest {
            name: "Pat".to_string(),
            email: "pat@example.com".to_string(),
            username: "no spaces!".to_string(),
            password: "password123".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn register_accepts_valid_payload() {
        let req = RegisterRequest {
            name: "Pat".to_string(),
            email: "pat@example.com".to_string(),
            username: "pat_42".to_string(),
            password: "password123".to_string(),
        };
        assert!(req.validate().is_ok());
    }
}
