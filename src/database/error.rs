use serde_json::{json, Value};
use thiserror::Error;
use warp::http::StatusCode;

#[derive(Error, Debug)]
pub enum FoodgramError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("You can't subscribe to yourself")]
    InvalidSelfReference,

    #[error("You don't have permission to perform this action")]
    Forbidden,

    #[error("Authentication credentials were not provided")]
    Unauthenticated,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FoodgramError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::NotFound(message.to_string())
    }

    pub fn already_exists(message: &str) -> Self {
        Self::AlreadyExists(message.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::AlreadyExists(_) | Self::InvalidSelfReference => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::Migrate(_) | Self::Cache(_) | Self::Io(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Response body. Validation errors are keyed by the offending field.
    pub fn body(&self) -> Value {
        match self {
            Self::Validation { field, message } => json!({ field.as_str(): [message] }),
            e if e.status().is_server_error() => json!({ "errors": "Internal server error" }),
            e => json!({ "errors": e.to_string() }),
        }
    }
}

impl From<sqlx::Error> for FoodgramError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::not_found("Not found"),
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Self::already_exists("Entry already exists")
            }
            sqlx::Error::Database(e)
                if e.is_check_violation() && e.constraint() == Some("prevent_self_follow") =>
            {
                Self::InvalidSelfReference
            }
            sqlx::Error::Database(e) if e.is_check_violation() => Self::validation(
                e.constraint().unwrap_or("non_field_errors"),
                e.message().to_string(),
            ),
            sqlx::Error::Database(e) if e.is_foreign_key_violation() => {
                Self::not_found("Referenced entry doesn't exist")
            }
            e => Self::Database(e),
        }
    }
}

impl warp::reject::Reject for FoodgramError {}

#[cfg(test)]
mod tests {
    use std::{borrow::Cow, error::Error as StdError, fmt};

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug, Clone, Copy)]
    enum Violation {
        Unique,
        Check,
        ForeignKey,
    }

    #[derive(Debug)]
    struct FakeDatabaseError {
        kind: Violation,
        constraint: &'static str,
    }

    impl fmt::Display for FakeDatabaseError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "violates constraint {}", self.constraint)
        }
    }

    impl StdError for FakeDatabaseError {}

    impl DatabaseError for FakeDatabaseError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.constraint)
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            None
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.kind {
                Violation::Unique => ErrorKind::UniqueViolation,
                Violation::Check => ErrorKind::CheckViolation,
                Violation::ForeignKey => ErrorKind::ForeignKeyViolation,
            }
        }
    }

    fn database_error(kind: Violation, constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeDatabaseError { kind, constraint }))
    }

    #[test]
    fn unique_violation_becomes_already_exists() {
        let error = FoodgramError::from(database_error(
            Violation::Unique,
            "unique_user_recipe_shopping_cart",
        ));
        assert!(matches!(error, FoodgramError::AlreadyExists(_)));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn self_follow_check_becomes_invalid_self_reference() {
        let error = FoodgramError::from(database_error(
            Violation::Check,
            "prevent_self_follow",
        ));
        assert!(matches!(error, FoodgramError::InvalidSelfReference));
    }

    #[test]
    fn other_check_violations_are_field_scoped() {
        let error = FoodgramError::from(database_error(
            Violation::Check,
            "recipes_cooking_time_check",
        ));
        assert_eq!(
            error.body(),
            json!({ "recipes_cooking_time_check": ["constraint violated"] })
        );
    }

    #[test]
    fn missing_rows_become_not_found() {
        let error = FoodgramError::from(sqlx::Error::RowNotFound);
        assert_eq!(error.status(), StatusCode::NOT_FOUND);

        let error = FoodgramError::from(database_error(
            Violation::ForeignKey,
            "favorites_recipe_id_fkey",
        ));
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_errors_hide_details() {
        let error = FoodgramError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.body(), json!({ "errors": "Internal server error" }));
    }
}
