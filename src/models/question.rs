// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// Question type: multiple choice (4 options, 1 correct), binary, or
/// free-text exact match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Mcq,
    TrueFalse,
    OneWord,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Mcq => "mcq",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::OneWord => "one_word",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mcq" => Some(QuestionKind::Mcq),
            "true_false" => Some(QuestionKind::TrueFalse),
            "one_word" => Some(QuestionKind::OneWord),
            _ => None,
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub question_id: i64,
    pub category_id: i64,
    pub admin_id: i64,
    pub admin_username: String,
    pub question_text: String,
    pub question_type: String,
}

/// Represents the 'options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionOption {
    pub option_id: i64,
    pub question_id: i64,
    pub option_text: String,
    pub is_correct: bool,
}

/// Admin view of a question together with its option set.
#[derive(Debug, Serialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

/// DTO for creating a new question.
/// MCQ supplies exactly three distractors in `other_options`; the other types
/// supply only the correct answer.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000, message = "Question text must be between 1 and 1000 characters."))]
    pub text: String,
    pub question_type: QuestionKind,
    #[validate(length(max = 500))]
    pub correct_answer: String,
    pub other_options: Option<Vec<String>>,
}

/// DTO for updating a question's text.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 1000, message = "Question text must be between 1 and 1000 characters."))]
    pub text: String,
}

impl CreateQuestionRequest {
    /// Assembles the `(text, is_correct)` option set to persist, enforcing the
    /// per-type shape rules. An empty resulting set is reported as missing data.
    pub fn build_options(&self) -> Result<Vec<(String, bool)>, AppError> {
        let correct = self.correct_answer.trim();
        if correct.is_empty() {
            return Err(AppError::DataNotFound(
                "Question has no options: correct answer is empty".to_string(),
            ));
        }

        let distractors: Vec<String> = self
            .other_options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|o| o.trim().to_string())
            .collect();

        match self.question_type {
            QuestionKind::Mcq => {
                if distractors.len() != 3 {
                    return Err(AppError::InvalidInput(
                        "MCQ questions require exactly 3 incorrect options".to_string(),
                    ));
                }
                if distractors.iter().any(|d| d.is_empty()) {
                    return Err(AppError::InvalidInput(
                        "MCQ options must not be empty".to_string(),
                    ));
                }
                if distractors
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(correct))
                {
                    return Err(AppError::InvalidInput(
                        "Incorrect options must differ from the correct answer".to_string(),
                    ));
                }

                let mut options = vec![(correct.to_string(), true)];
                options.extend(distractors.into_iter().map(|d| (d, false)));
                Ok(options)
            }
            QuestionKind::TrueFalse => {
                if !distractors.is_empty() {
                    return Err(AppError::InvalidInput(
                        "True/false questions take no extra options".to_string(),
                    ));
                }
                let normalized = correct.to_lowercase();
                if normalized != "true" && normalized != "false" {
                    return Err(AppError::InvalidInput(
                        "True/false answer must be 'true' or 'false'".to_string(),
                    ));
                }
                Ok(vec![(normalized, true)])
            }
            QuestionKind::OneWord => {
                if !distractors.is_empty() {
                    return Err(AppError::InvalidInput(
                        "One-word questions take no extra options".to_string(),
                    ));
                }
                Ok(vec![(correct.to_string(), true)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: QuestionKind, answer: &str, others: Option<Vec<&str>>) -> CreateQuestionRequest {
        CreateQuestionRequest {
            text: "What is the boiling point of water at sea level?".to_string(),
            question_type: kind,
            correct_answer: answer.to_string(),
            other_options: others.map(|o| o.into_iter().map(String::from).collect()),
        }
    }

    #[test]
    fn mcq_builds_four_options_with_one_correct() {
        let req = request(QuestionKind::Mcq, "100C", Some(vec!["90C", "80C", "120C"]));
        let options = req.build_options().unwrap();

        assert_eq!(options.len(), 4);
        assert_eq!(options.iter().filter(|(_, correct)| *correct).count(), 1);
        assert!(options.contains(&("100C".to_string(), true)));
    }

    #[test]
    fn mcq_requires_exactly_three_distractors() {
        let req = request(QuestionKind::Mcq, "100C", Some(vec!["90C", "80C"]));
        assert!(matches!(req.build_options(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn true_false_normalizes_and_takes_single_option() {
        let req = request(QuestionKind::TrueFalse, "True", None);
        let options = req.build_options().unwrap();
        assert_eq!(options, vec![("true".to_string(), true)]);
    }

    #[test]
    fn true_false_rejects_non_boolean_answer() {
        let req = request(QuestionKind::TrueFalse, "maybe", None);
        assert!(matches!(req.build_options(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn one_word_rejects_extra_options() {
        let req = request(QuestionKind::OneWord, "oxygen", Some(vec!["hydrogen"]));
        assert!(matches!(req.build_options(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn empty_answer_surfaces_as_missing_data() {
        let req = request(QuestionKind::OneWord, "   ", None);
        assert!(matches!(req.build_options(), Err(AppError::DataNotFound(_))));
    }
}
