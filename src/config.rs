// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Points awarded per correctly answered question before normalization.
pub const POINTS_PER_QUESTION: u32 = 10;

/// Number of distinct players shown on the leaderboard.
pub const LEADERBOARD_SIZE: i64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    /// Questions per quiz; also the minimum available count required to start one.
    pub quiz_question_count: i64,
    /// Wall-clock budget for a whole quiz attempt, in seconds.
    pub quiz_time_limit_secs: i64,
    pub super_admin_name: Option<String>,
    pub super_admin_email: Option<String>,
    pub super_admin_username: Option<String>,
    pub super_admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let quiz_question_count = positive_or(env::var("QUIZ_QUESTION_COUNT").ok(), 10);

        let quiz_time_limit_secs = positive_or(env::var("QUIZ_TIME_LIMIT_SECS").ok(), 300);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            quiz_question_count,
            quiz_time_limit_secs,
            super_admin_name: env::var("SUPER_ADMIN_NAME").ok(),
            super_admin_email: env::var("SUPER_ADMIN_EMAIL").ok(),
            super_admin_username: env::var("SUPER_ADMIN_USERNAME").ok(),
            super_admin_password: env::var("SUPER_ADMIN_PASSWORD").ok(),
        }
    }
}

/// Parses a tuning knob that must stay at least 1; anything unset, unparseable,
/// zero or negative falls back to the default.
fn positive_or(value: Option<String>, default: i64) -> i64 {
    value
        .and_then(|v| v.parse().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuning_knobs_reject_non_positive_values() {
        assert_eq!(positive_or(Some("-5".to_string()), 10), 10);
        assert_eq!(positive_or(Some("0".to_string()), 10), 10);
        assert_eq!(positive_or(Some("lots".to_string()), 300), 300);
        assert_eq!(positive_or(None, 300), 300);
        assert_eq!(positive_or(Some("25".to_string()), 10), 25);
    }
}
