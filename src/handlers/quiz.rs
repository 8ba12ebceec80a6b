// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    engine::{self, PlayerAnswer, QuizSession, SessionQuestion},
    error::AppError,
    handlers::leaderboard::record_score,
    models::question::QuestionKind,
    state::AppState,
    utils::jwt::Claims,
};

/// Candidate question joined with its correct-answer option text, already
/// randomized at the storage layer.
#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    question_id: i64,
    question_text: String,
    question_type: String,
    correct_answer: String,
}

#[derive(Debug, sqlx::FromRow)]
struct OptionTextRow {
    question_id: i64,
    option_text: String,
}

#[derive(Debug, Deserialize)]
pub struct StartQuizParams {
    pub category_id: Option<i64>,
}

/// A question as shown to the player: no correct answer, options in the
/// fixed display order the session will grade against.
#[derive(Debug, Serialize)]
pub struct QuizQuestionView {
    pub question_id: i64,
    pub question_text: String,
    pub question_type: QuestionKind,
    pub options: Vec<String>,
}

/// DTO for submitting a quiz attempt. Keys are question ids; values are
/// numeric picks (MCQ, true/false) or free text (one-word).
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub session_id: Uuid,
    pub answers: HashMap<i64, PlayerAnswer>,
}

const CANDIDATE_QUERY_ALL: &str = "SELECT q.question_id, q.question_text, q.question_type, o.option_text AS correct_answer
     FROM questions q
     JOIN options o ON o.question_id = q.question_id AND o.is_correct
     ORDER BY RANDOM()
     LIMIT $1";

const CANDIDATE_QUERY_BY_CATEGORY: &str = "SELECT q.question_id, q.question_text, q.question_type, o.option_text AS correct_answer
     FROM questions q
     JOIN options o ON o.question_id = q.question_id AND o.is_correct
     WHERE q.category_id = $1
     ORDER BY RANDOM()
     LIMIT $2";

/// Starts a timed quiz for the calling player.
///
/// Selects a randomized question set (within one category, or across all),
/// enforces the minimum-count precondition, fixes the MCQ option display
/// order, and parks the session in the in-memory store. The response carries
/// the session id, the remaining budget and the answer-free question views.
/// Player only.
pub async fn start_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<StartQuizParams>,
) -> Result<impl IntoResponse, AppError> {
    let player_id = claims.user_id()?;
    let count = state.config.quiz_question_count;

    let candidates: Vec<CandidateRow> = match params.category_id {
        Some(category_id) => {
            sqlx::query_as(CANDIDATE_QUERY_BY_CATEGORY)
                .bind(category_id)
                .bind(count)
                .fetch_all(&state.pool)
                .await
        }
        None => {
            sqlx::query_as(CANDIDATE_QUERY_ALL)
                .bind(count)
                .fetch_all(&state.pool)
                .await
        }
    }
    .unwrap_or_else(|e| {
        tracing::error!("Failed to fetch quiz questions: {:?}", e);
        Vec::new()
    });

    engine::ensure_enough_questions(candidates.len(), count)?;

    // Fetch MCQ option texts in storage-randomized order; that order is
    // frozen into the session so numeric picks stay unambiguous.
    let mcq_ids: Vec<i64> = candidates
        .iter()
        .filter(|c| c.question_type == QuestionKind::Mcq.as_str())
        .map(|c| c.question_id)
        .collect();

    let mut mcq_options: HashMap<i64, Vec<String>> = HashMap::new();
    if !mcq_ids.is_empty() {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT question_id, option_text FROM options WHERE question_id IN (",
        );
        let mut separated = builder.separated(",");
        for id in &mcq_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY RANDOM()");

        let rows: Vec<OptionTextRow> = builder
            .build_query_as()
            .fetch_all(&state.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch quiz options: {:?}", e);
                AppError::Internal(e.to_string())
            })?;

        for row in rows {
            mcq_options.entry(row.question_id).or_default().push(row.option_text);
        }
    }

    let mut questions = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let kind = QuestionKind::parse(&candidate.question_type).ok_or_else(|| {
            AppError::Internal(format!(
                "Unknown question type '{}' for question {}",
                candidate.question_type, candidate.question_id
            ))
        })?;

        let options = match kind {
            QuestionKind::Mcq => mcq_options.remove(&candidate.question_id).unwrap_or_default(),
            QuestionKind::TrueFalse => vec!["true".to_string(), "false".to_string()],
            QuestionKind::OneWord => Vec::new(),
        };

        questions.push(SessionQuestion {
            question_id: candidate.question_id,
            text: candidate.question_text,
            kind,
            options,
            correct_answer: candidate.correct_answer,
        });
    }

    let session = QuizSession::start(
        player_id,
        questions,
        Duration::seconds(state.config.quiz_time_limit_secs),
    );

    let now = Utc::now();
    let expires_in = session.expires_in_secs(now);
    let views: Vec<QuizQuestionView> = session
        .questions()
        .iter()
        .map(|q| QuizQuestionView {
            question_id: q.question_id,
            question_text: q.text.clone(),
            question_type: q.kind,
            options: q.options.clone(),
        })
        .collect();

    let session_id = state.sessions.insert(session);
    tracing::info!("Started quiz session {} for player {}", session_id, player_id);

    Ok(Json(json!({
        "session_id": session_id,
        "expires_in": expires_in,
        "question_count": views.len(),
        "questions": views,
    })))
}

/// Submits a player's answers for an in-progress session.
///
/// Iterates the session's question order, polling the wall-clock budget once
/// per question; an exhausted budget abandons the session and scoring
/// proceeds with whatever was collected. Malformed answers reject the request
/// and leave the session in place for a retry. On finalization the normalized
/// score is persisted and the full graded response list is returned.
/// Player only.
pub async fn submit_answers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let player_id = claims.user_id()?;

    let mut session = state.sessions.take(&req.session_id).ok_or_else(|| {
        AppError::DataNotFound("Quiz session not found or already finished".to_string())
    })?;

    if session.player_id != player_id {
        state.sessions.put(session);
        return Err(AppError::Forbidden(
            "Quiz session belongs to another player".to_string(),
        ));
    }

    for question_id in session.question_ids() {
        if session.is_expired(Utc::now()) {
            session.abandon();
            break;
        }

        if let Some(answer) = req.answers.get(&question_id) {
            if let Err(e) = session.submit_answer(question_id, answer) {
                // Rejected input is a local retry, not a session failure.
                state.sessions.put(session);
                return Err(e);
            }
        }
    }

    let session_id = session.id;
    let outcome = session.finalize();

    record_score(&state.pool, player_id, outcome.score).await?;
    tracing::info!(
        "Quiz session {} finalized as {:?} with score {}",
        session_id,
        outcome.state,
        outcome.score
    );

    Ok(Json(json!({
        "state": outcome.state,
        "score": outcome.score,
        "correct_count": outcome.correct_count,
        "total_questions": outcome.total_questions,
        "responses": outcome.responses,
    })))
}
