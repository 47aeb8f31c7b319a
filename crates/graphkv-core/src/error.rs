use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{origin}:{class}: {message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    pub fn not_found(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, origin, message)
    }

    pub fn bad_request(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::BadRequest, origin, message)
    }

    pub fn delete_failed(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::DeleteFailed, origin, message)
    }

    pub fn unknown_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::UnknownOperation, ErrorOrigin::Interface, message)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification. Maps 1:1 onto the
/// public error kinds callers see — there is no hidden internal-only class
/// that the facade crate has to collapse or reinterpret.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    BadRequest,
    NotFound,
    DeleteFailed,
    UnknownOperation,
    Unexpected,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BadRequest => "bad_request",
            Self::NotFound => "not_found",
            Self::DeleteFailed => "delete_failed",
            Self::UnknownOperation => "unknown_operation",
            Self::Unexpected => "unexpected",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy: which subsystem raised the error.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Kv,
    Cache,
    Index,
    Relation,
    Entity,
    Backup,
    Interface,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Kv => "kv",
            Self::Cache => "cache",
            Self::Index => "index",
            Self::Relation => "relation",
            Self::Entity => "entity",
            Self::Backup => "backup",
            Self::Interface => "interface",
        };
        write!(f, "{label}")
    }
}

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, InternalError>;
