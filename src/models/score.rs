// src/models/score.rs

use serde::Serialize;
use sqlx::FromRow;

/// Represents the 'scores' table in the database.
/// One immutable row per completed quiz attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScoreRecord {
    pub score_id: i64,
    pub player_id: i64,
    pub score: f64,

    /// UTC timestamp in `YYYY-MM-DD HH:MM:SS` form, second resolution.
    pub timestamp: String,
}

/// Aggregated row for the leaderboard: a player's best score and when it was
/// first achieved.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub player_id: i64,
    pub name: String,
    pub username: String,
    pub best_score: f64,
    pub achieved_at: String,
}

/// A player's own score history, newest first, with the derived best score.
#[derive(Debug, Serialize)]
pub struct ScoreHistory {
    pub best_score: f64,
    pub attempts: Vec<ScoreRecord>,
}
