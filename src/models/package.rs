// src/models/package.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::question::PublicQuestion;

/// Represents the 'question_packages' table.
/// A named bundle of questions reused when assembling an olympiad round or class test.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPackage {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_by: i64,
    pub question_count: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a package.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePackageRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200), custom(function = validate_unique_ids))]
    pub question_ids: Vec<i64>,
}

/// A package together with its questions, in package order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDetail {
    #[serde(flatten)]
    pub package: QuestionPackage,
    pub questions: Vec<PublicQuestion>,
}

fn validate_unique_ids(ids: &[i64]) -> Result<(), validator::ValidationError> {
    let mut seen = std::collections::HashSet::new();
    if ids.iter().any(|id| !seen.insert(*id)) {
        return Err(validator::ValidationError::new("duplicate_question_id"));
    }
    Ok(())
}
