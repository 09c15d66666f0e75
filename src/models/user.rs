// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::AuthorKind;

/// Account roles, stored as plain text in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn is_staff(self) -> bool {
        matches!(self, Role::Teacher | Role::Admin)
    }

    /// Authorship discriminant for questions written by this role.
    pub fn author_kind(self) -> Option<AuthorKind> {
        match self {
            Role::Admin => Some(AuthorKind::Admin),
            Role::Teacher => Some(AuthorKind::Teacher),
            Role::Student => None,
        }
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'student', 'teacher' or 'admin'.
    pub role: String,

    /// Teachers must be verified by an administrator before authoring questions.
    pub is_verified: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    /// 'student' (default) or 'teacher'. Admins are seeded or created by admins.
    #[validate(custom(function = validate_self_service_role))]
    pub role: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for an administrator verifying or un-verifying a teacher.
#[derive(Debug, Deserialize)]
pub struct VerifyTeacherRequest {
    pub verified: bool,
}

fn validate_self_service_role(role: &str) -> Result<(), validator::ValidationError> {
    match Role::parse(role) {
        Some(Role::Student | Role::Teacher) => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_role")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_text() {
        for role in [Role::Student, Role::Teacher, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn only_staff_author_questions() {
        assert_eq!(Role::Teacher.author_kind(), Some(AuthorKind::Teacher));
        assert_eq!(Role::Student.author_kind(), None);
        assert!(!Role::Student.is_staff());
    }

    #[test]
    fn registration_cannot_claim_admin() {
        let req = CreateUserRequest {
            username: "mallory".into(),
            password: "secret1".into(),
            role: Some("admin".into()),
        };
        assert!(req.validate().is_err());

        let req = CreateUserRequest {
            role: Some("teacher".into()),
            ..req
        };
        assert!(req.validate().is_ok());
    }
}
