// src/models/category.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'categories' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub category_id: i64,
    pub admin_id: i64,
    pub admin_username: String,
    pub category_name: String,
}

/// DTO for creating a category.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Category name must be between 1 and 100 characters."))]
    pub name: String,
}

/// DTO for renaming a category.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Category name must be between 1 and 100 characters."))]
    pub name: String,
}

/// Normalizes a category name to title case, so names that differ only in
/// casing collapse onto the same unique row ("science" and "SCIENCE" both
/// become "Science").
pub fn normalize_category_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
