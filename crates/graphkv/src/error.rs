use graphkv_core::error::{ErrorClass as CoreErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type returned at the `graphkv` facade boundary (spec §7).
/// `graphkv_core::error::InternalError` already carries exactly these five
/// kinds, so there is no separate internal taxonomy to collapse here —
/// this type exists to give callers a `serde`-stable, facade-owned shape
/// independent of the engine crate's internals.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    #[must_use]
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        Self {
            class: err.class.into(),
            origin: err.origin.into(),
            message: err.message,
        }
    }
}

///
/// ErrorClass
/// Public error taxonomy for callers (spec §7): `BadRequest`, `NotFound`,
/// `DeleteFailed`, `UnknownOperation`, `Unexpected`. The (external) HTTP
/// transport maps `BadRequest`/`UnknownOperation`/`DeleteFailed` to 400,
/// `NotFound` to 404, `Unexpected` to 500.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorClass {
    BadRequest,
    NotFound,
    DeleteFailed,
    UnknownOperation,
    Unexpected,
}

impl From<CoreErrorClass> for ErrorClass {
    fn from(class: CoreErrorClass) -> Self {
        match class {
            CoreErrorClass::BadRequest => Self::BadRequest,
            CoreErrorClass::NotFound => Self::NotFound,
            CoreErrorClass::DeleteFailed => Self::DeleteFailed,
            CoreErrorClass::UnknownOperation => Self::UnknownOperation,
            CoreErrorClass::Unexpected => Self::Unexpected,
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy: which subsystem raised the error.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Kv,
    Cache,
    Index,
    Relation,
    Entity,
    Backup,
    Interface,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Kv => Self::Kv,
            CoreErrorOrigin::Cache => Self::Cache,
            CoreErrorOrigin::Index => Self::Index,
            CoreErrorOrigin::Relation => Self::Relation,
            CoreErrorOrigin::Entity => Self::Entity,
            CoreErrorOrigin::Backup => Self::Backup,
            CoreErrorOrigin::Interface => Self::Interface,
        }
    }
}

/// Convenience alias used throughout the facade.
pub type Result<T> = std::result::Result<T, Error>;
