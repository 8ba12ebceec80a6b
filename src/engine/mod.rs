// src/engine/mod.rs
//
// The quiz engine: session lifecycle, grading and score normalization live in
// `session`, the in-memory single-owner store in `store`.

pub mod session;
pub mod store;

pub use session::{PlayerAnswer, QuizOutcome, QuizSession, ResponseRecord, SessionQuestion, SessionState};
pub use store::SessionStore;

use crate::error::AppError;

/// Minimum-count precondition: a quiz must not start with fewer questions than
/// the configured length.
pub fn ensure_enough_questions(available: usize, required: i64) -> Result<(), AppError> {
    if (available as i64) < required {
        return Err(AppError::InsufficientQuestions(format!(
            "Quiz requires {required} questions but only {available} are available"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_available_out_of_ten_required_fails() {
        assert!(matches!(
            ensure_enough_questions(9, 10),
            Err(AppError::InsufficientQuestions(_))
        ));
    }

    #[test]
    fn exactly_the_required_count_passes() {
        assert!(ensure_enough_questions(10, 10).is_ok());
    }
}
