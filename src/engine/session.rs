// src/engine/session.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::POINTS_PER_QUESTION;
use crate::error::AppError;
use crate::models::question::QuestionKind;

/// A question as presented inside one quiz session. The option order is fixed
/// when the session starts; numeric picks map back through it for the whole
/// session lifetime.
#[derive(Debug, Clone)]
pub struct SessionQuestion {
    pub question_id: i64,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// Lifecycle of a quiz attempt. A session is created in `InProgress` (the
/// NOT_STARTED phase never leaves the start handler) and ends in one of the
/// two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    InProgress,
    Completed,
    Abandoned,
}

/// One graded response, kept for the post-quiz review display.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    pub question_id: i64,
    pub question: String,
    pub player_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// A player's answer to one question: a 1-based numeric pick for MCQ and
/// true/false, or free text for one-word questions.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlayerAnswer {
    Choice(u8),
    Text(String),
}

/// Result of finalizing a session, returned to the player for review.
#[derive(Debug, Serialize)]
pub struct QuizOutcome {
    pub state: SessionState,
    /// Percentage of presented questions answered correctly, in [0, 100].
    pub score: f64,
    pub correct_count: usize,
    pub total_questions: usize,
    pub responses: Vec<ResponseRecord>,
}

/// One player's timed attempt at a selected question set. Ephemeral: lives in
/// the in-memory store until finalized, never persisted itself.
#[derive(Debug)]
pub struct QuizSession {
    pub id: Uuid,
    pub player_id: i64,
    questions: Vec<SessionQuestion>,
    end_time: DateTime<Utc>,
    raw_score: u32,
    responses: Vec<ResponseRecord>,
    state: SessionState,
}

impl QuizSession {
    pub fn start(player_id: i64, questions: Vec<SessionQuestion>, time_limit: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            questions,
            end_time: Utc::now() + time_limit,
            raw_score: 0,
            responses: Vec::new(),
            state: SessionState::InProgress,
        }
    }

    pub fn questions(&self) -> &[SessionQuestion] {
        &self.questions
    }

    pub fn question_ids(&self) -> Vec<i64> {
        self.questions.iter().map(|q| q.question_id).collect()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    /// Remaining budget in whole seconds, clamped at zero.
    pub fn expires_in_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.end_time - now).num_seconds().max(0)
    }

    /// Marks the session abandoned; already-collected responses keep counting.
    pub fn abandon(&mut self) {
        if self.state == SessionState::InProgress {
            self.state = SessionState::Abandoned;
        }
    }

    /// Grades one answer immediately. The numeric pick is mapped back to the
    /// displayed option text before comparison, so correctness is judged
    /// against the answer text and never against a position. A response record
    /// is appended whether or not the answer was correct; resubmitting a
    /// question replaces its earlier record and grade.
    pub fn submit_answer(
        &mut self,
        question_id: i64,
        answer: &PlayerAnswer,
    ) -> Result<bool, AppError> {
        if self.state != SessionState::InProgress {
            return Err(AppError::InvalidInput(
                "Quiz session is no longer accepting answers".to_string(),
            ));
        }

        let question = self
            .questions
            .iter()
            .find(|q| q.question_id == question_id)
            .ok_or_else(|| {
                AppError::DataNotFound(format!("Question {question_id} is not part of this quiz"))
            })?;

        let answer_text = resolve_answer(question, answer)?;
        let is_correct = answer_text.to_lowercase() == question.correct_answer.to_lowercase();

        // A resubmission replaces the earlier grade for this question, so a
        // question never counts twice.
        if let Some(pos) = self
            .responses
            .iter()
            .position(|r| r.question_id == question_id)
        {
            if self.responses[pos].is_correct {
                self.raw_score -= POINTS_PER_QUESTION;
            }
            self.responses.remove(pos);
        }

        if is_correct {
            self.raw_score += POINTS_PER_QUESTION;
        }

        self.responses.push(ResponseRecord {
            question_id: question.question_id,
            question: question.text.clone(),
            player_answer: answer_text,
            correct_answer: question.correct_answer.clone(),
            is_correct,
        });

        Ok(is_correct)
    }

    /// Closes the session and normalizes the accumulated score to [0, 100].
    /// An in-progress session finalizing here has answered everything it will
    /// answer, so it counts as completed. Zero presented questions yields a
    /// zero score instead of dividing by zero.
    pub fn finalize(mut self) -> QuizOutcome {
        if self.state == SessionState::InProgress {
            self.state = SessionState::Completed;
        }

        let total_questions = self.questions.len();
        let score = if total_questions == 0 {
            0.0
        } else {
            let max_raw = (total_questions as u32 * POINTS_PER_QUESTION) as f64;
            (f64::from(self.raw_score) / max_raw * 100.0).clamp(0.0, 100.0)
        };

        let correct_count = self.responses.iter().filter(|r| r.is_correct).count();

        QuizOutcome {
            state: self.state,
            score,
            correct_count,
            total_questions,
            responses: self.responses,
        }
    }
}

/// Maps a raw player answer to the answer text it denotes for this question.
/// Out-of-range or mismatched input is rejected without touching the session,
/// so the caller can ask the player to retry.
fn resolve_answer(question: &SessionQuestion, answer: &PlayerAnswer) -> Result<String, AppError> {
    match (question.kind, answer) {
        (QuestionKind::Mcq, PlayerAnswer::Choice(n)) => {
            if !(1..=4).contains(n) || question.options.len() < *n as usize {
                return Err(AppError::InvalidInput(
                    "Pick an option between 1 and 4".to_string(),
                ));
            }
            Ok(question.options[*n as usize - 1].clone())
        }
        (QuestionKind::Mcq, PlayerAnswer::Text(_)) => Err(AppError::InvalidInput(
            "MCQ answers are numeric picks between 1 and 4".to_string(),
        )),
        (QuestionKind::TrueFalse, PlayerAnswer::Choice(1)) => Ok("true".to_string()),
        (QuestionKind::TrueFalse, PlayerAnswer::Choice(2)) => Ok("false".to_string()),
        (QuestionKind::TrueFalse, PlayerAnswer::Text(t))
            if t.eq_ignore_ascii_case("true") || t.eq_ignore_ascii_case("false") =>
        {
            Ok(t.to_lowercase())
        }
        (QuestionKind::TrueFalse, _) => Err(AppError::InvalidInput(
            "Answer 1 for true or 2 for false".to_string(),
        )),
        (QuestionKind::OneWord, PlayerAnswer::Text(t)) => {
            let trimmed = t.trim();
            if trimmed.is_empty() {
                return Err(AppError::InvalidInput("Answer must not be empty".to_string()));
            }
            Ok(trimmed.to_string())
        }
        (QuestionKind::OneWord, PlayerAnswer::Choice(_)) => Err(AppError::InvalidInput(
            "One-word answers are free text".to_string(),
        )),
    }
}
