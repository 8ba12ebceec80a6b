// src/handlers/leaderboard.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use sqlx::PgPool;

use crate::{
    config::LEADERBOARD_SIZE,
    error::AppError,
    models::score::{LeaderboardEntry, ScoreHistory, ScoreRecord},
    state::AppState,
    utils::jwt::Claims,
};

/// Persists one immutable score record for a completed quiz attempt.
/// Timestamps are UTC at second resolution, regardless of caller locale.
pub async fn record_score(pool: &PgPool, player_id: i64, score: f64) -> Result<(), AppError> {
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    sqlx::query(r#"INSERT INTO scores (player_id, score, "timestamp") VALUES ($1, $2, $3)"#)
        .bind(player_id)
        .bind(score)
        .bind(&timestamp)
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record score for player {}: {:?}", player_id, e);
            AppError::Internal(e.to_string())
        })?;

    Ok(())
}

/// Retrieves the top distinct players ranked by their best score, ties broken
/// by who reached that score first.
pub async fn get_leaderboard(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let leaderboard = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT b.player_id,
               u.name,
               c.username,
               b.best_score,
               MIN(s."timestamp") AS achieved_at
        FROM (
            SELECT player_id, MAX(score) AS best_score
            FROM scores
            GROUP BY player_id
        ) b
        JOIN scores s ON s.player_id = b.player_id AND s.score = b.best_score
        JOIN users u ON u.user_id = b.player_id
        JOIN credentials c ON c.user_id = b.player_id
        GROUP BY b.player_id, u.name, c.username, b.best_score
        ORDER BY b.best_score DESC, achieved_at ASC
        LIMIT $1
        "#,
    )
    .bind(LEADERBOARD_SIZE)
    .fetch_all(&state.pool)
    .await
    .unwrap_or_else(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        Vec::new()
    });

    if leaderboard.is_empty() {
        return Err(AppError::DataNotFound("No scores recorded yet".to_string()));
    }

    Ok(Json(leaderboard))
}

/// Returns the calling player's score history, newest first, with the best
/// score derived from the returned set.
/// Player only.
pub async fn my_scores(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let player_id = claims.user_id()?;

    let attempts = sqlx::query_as::<_, ScoreRecord>(
        r#"SELECT score_id, player_id, score, "timestamp"
           FROM scores
           WHERE player_id = $1
           ORDER BY "timestamp" DESC"#,
    )
    .bind(player_id)
    .fetch_all(&state.pool)
    .await
    .unwrap_or_else(|e| {
        tracing::error!("Failed to fetch score history: {:?}", e);
        Vec::new()
    });

    if attempts.is_empty() {
        return Err(AppError::DataNotFound(
            "No quiz attempts recorded yet".to_string(),
        ));
    }

    let best_score = attempts.iter().map(|a| a.score).fold(0.0_f64, f64::max);

    Ok(Json(ScoreHistory { best_score, attempts }))
}
