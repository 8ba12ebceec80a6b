// src/handlers/catalog.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::{Postgres, QueryBuilder, Transaction};
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        category::{Category, CreateCategoryRequest, UpdateCategoryRequest, normalize_category_name},
        question::{
            CreateQuestionRequest, Question, QuestionOption, QuestionWithOptions,
            UpdateQuestionRequest,
        },
    },
    state::AppState,
    utils::jwt::Claims,
};

/// Lists all categories.
/// A transient read failure is logged and folded into an empty result, which
/// surfaces like any other empty catalog.
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT category_id, admin_id, admin_username, category_name
         FROM categories
         ORDER BY category_name",
    )
    .fetch_all(&state.pool)
    .await
    .unwrap_or_else(|e| {
        tracing::error!("Failed to list categories: {:?}", e);
        Vec::new()
    });

    if categories.is_empty() {
        return Err(AppError::DataNotFound("No categories found".to_string()));
    }

    Ok(Json(categories))
}

/// Creates a new category owned by the acting admin. Names are normalized to
/// title case before the uniqueness check, so casing variants collide.
/// Admin only.
pub async fn create_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::InvalidInput(validation_errors.to_string()));
    }

    let name = normalize_category_name(&payload.name);

    let (category_id,): (i64,) = sqlx::query_as(
        "INSERT INTO categories (admin_id, admin_username, category_name)
         VALUES ($1, $2, $3)
         RETURNING category_id",
    )
    .bind(claims.user_id()?)
    .bind(&claims.username)
    .bind(&name)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::DuplicateEntry(format!("Category '{name}' already exists"))
        } else {
            tracing::error!("Failed to create category: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "category_id": category_id, "category_name": name })),
    ))
}

/// Renames a category, applying the same normalization as creation.
/// Admin only.
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::InvalidInput(validation_errors.to_string()));
    }

    let name = normalize_category_name(&payload.name);

    let result = sqlx::query("UPDATE categories SET category_name = $1 WHERE category_id = $2")
        .bind(&name)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateEntry(format!("Category '{name}' already exists"))
            } else {
                tracing::error!("Failed to update category: {:?}", e);
                AppError::from(e)
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::DataNotFound("Category not found".to_string()));
    }

    Ok(Json(json!({ "category_id": id, "category_name": name })))
}

/// Deletes a category; its questions and their options cascade away at the
/// storage layer.
/// Admin only.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM categories WHERE category_id = $1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete category: {:?}", e);
            AppError::Internal(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::DataNotFound("Category not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ListQuestionsParams {
    pub category_id: Option<i64>,
}

/// Lists questions with their full option sets, optionally filtered by
/// category.
/// Admin only (option rows expose the correct answer).
pub async fn list_questions(
    State(state): State<AppState>,
    Query(params): Query<ListQuestionsParams>,
) -> Result<impl IntoResponse, AppError> {
    let questions = match params.category_id {
        Some(category_id) => sqlx::query_as::<_, Question>(
            "SELECT question_id, category_id, admin_id, admin_username, question_text, question_type
             FROM questions
             WHERE category_id = $1
             ORDER BY question_id",
        )
        .bind(category_id)
        .fetch_all(&state.pool)
        .await,
        None => sqlx::query_as::<_, Question>(
            "SELECT question_id, category_id, admin_id, admin_username, question_text, question_type
             FROM questions
             ORDER BY question_id",
        )
        .fetch_all(&state.pool)
        .await,
    }
    .unwrap_or_else(|e| {
        tracing::error!("Failed to list questions: {:?}", e);
        Vec::new()
    });

    if questions.is_empty() {
        return Err(AppError::DataNotFound("No questions found".to_string()));
    }

    // One IN-clause query for all option rows, grouped back per question.
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT option_id, question_id, option_text, is_correct FROM options WHERE question_id IN (",
    );
    let mut separated = builder.separated(",");
    for q in &questions {
        separated.push_bind(q.question_id);
    }
    separated.push_unseparated(") ORDER BY option_id");

    let option_rows: Vec<QuestionOption> = builder
        .build_query_as()
        .fetch_all(&state.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch options: {:?}", e);
            Vec::new()
        });

    let mut by_question: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
    for option in option_rows {
        by_question.entry(option.question_id).or_default().push(option);
    }

    let listing: Vec<QuestionWithOptions> = questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.question_id).unwrap_or_default();
            QuestionWithOptions { question, options }
        })
        .collect();

    Ok(Json(listing))
}

async fn category_exists(state: &AppState, category_id: i64) -> Result<(), AppError> {
    sqlx::query("SELECT 1 FROM categories WHERE category_id = $1")
        .bind(category_id)
        .fetch_optional(&state.pool)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::DataNotFound("Category not found".to_string()))
}

async fn insert_question(
    tx: &mut Transaction<'_, Postgres>,
    category_id: i64,
    claims: &Claims,
    payload: &CreateQuestionRequest,
) -> Result<i64, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::InvalidInput(validation_errors.to_string()));
    }

    let options = payload.build_options()?;

    let (question_id,): (i64,) = sqlx::query_as(
        "INSERT INTO questions (category_id, admin_id, admin_username, question_text, question_type)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING question_id",
    )
    .bind(category_id)
    .bind(claims.user_id()?)
    .bind(&claims.username)
    .bind(payload.text.trim())
    .bind(payload.question_type.as_str())
    .fetch_one(&mut **tx)
    .await?;

    for (text, is_correct) in &options {
        sqlx::query("INSERT INTO options (question_id, option_text, is_correct) VALUES ($1, $2, $3)")
            .bind(question_id)
            .bind(text)
            .bind(is_correct)
            .execute(&mut **tx)
            .await?;
    }

    Ok(question_id)
}

/// Creates one question with its options in a single transaction.
/// Admin only.
pub async fn create_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(category_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    category_exists(&state, category_id).await?;

    let mut tx = state.pool.begin().await?;
    let question_id = insert_question(&mut tx, category_id, &claims, &payload).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "question_id": question_id }))))
}

/// Bulk-loads a JSON array of questions into one category, all or nothing.
/// Admin only.
pub async fn bulk_create_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(category_id): Path<i64>,
    Json(payload): Json<Vec<CreateQuestionRequest>>,
) -> Result<impl IntoResponse, AppError> {
    if payload.is_empty() {
        return Err(AppError::InvalidInput(
            "Bulk load requires at least one question".to_string(),
        ));
    }

    category_exists(&state, category_id).await?;

    let mut tx = state.pool.begin().await?;
    let mut question_ids = Vec::with_capacity(payload.len());
    for question in &payload {
        question_ids.push(insert_question(&mut tx, category_id, &claims, question).await?);
    }
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "created": question_ids.len(), "question_ids": question_ids })),
    ))
}

/// Updates a question's text.
/// Admin only.
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::InvalidInput(validation_errors.to_string()));
    }

    let result = sqlx::query("UPDATE questions SET question_text = $1 WHERE question_id = $2")
        .bind(payload.text.trim())
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update question: {:?}", e);
            AppError::Internal(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::DataNotFound("Question not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a question; its options cascade away.
/// Admin only.
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE question_id = $1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::Internal(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::DataNotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
