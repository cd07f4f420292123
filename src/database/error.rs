use std::fmt::{self, Display};

use potion::HtmlError;
use warp::reject::Rejection;

/// Constraint class of a database error, used to turn storage failures back
/// into structured errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    Unique,
    ForeignKey,
    Check,
}

#[derive(Debug, thiserror::Error)]
#[error("{info}")]
pub struct QueryError {
    info: String,
    violation: Option<Violation>,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            violation: None,
        }
    }

    pub fn violation(&self) -> Option<Violation> {
        self.violation
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                let violation = if e.is_unique_violation() {
                    Some(Violation::Unique)
                } else if e.is_foreign_key_violation() {
                    Some(Violation::ForeignKey)
                } else if e.is_check_violation() {
                    Some(Violation::Check)
                } else {
                    None
                };

                Self {
                    info: format!("{e}"),
                    violation,
                }
            }
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new("RowNotFound".to_owned()),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new("Pool timed out".to_owned()),
            sqlx::Error::PoolClosed => Self::new("Pool closed".to_owned()),
            sqlx::Error::WorkerCrashed => Self::new("Worker crashed".to_owned()),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new("Unknown error".to_owned()),
        }
    }
}

impl From<QueryError> for potion::Error {
    fn from(value: QueryError) -> Self {
        log::error!("Query failed: {}", value.info);
        potion::Error {
            code: 500,
            info: Some(String::from("Internal server error")),
            redirect: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{info}")]
pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<CacheError> for potion::Error {
    fn from(value: CacheError) -> Self {
        log::error!("Cache failed: {}", value.info);
        potion::Error {
            code: 500,
            info: Some(String::from("Internal server error")),
            redirect: None,
        }
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for potion::Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

impl From<TypeError> for CoreError {
    fn from(value: TypeError) -> Self {
        CoreError::ValidationFailed(value.info)
    }
}

/// Errors raised by the recipe composer, the cart aggregator and the
/// membership guards.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    DuplicateAssociation(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("You cannot subscribe to yourself")]
    SelfReferenceNotAllowed,
    #[error("{0}")]
    ValidationFailed(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    InvalidSession(String),
    #[error("Fatal configuration error: {0}")]
    Fatal(String),
    #[error("Storage error: {0}")]
    Storage(#[from] QueryError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl CoreError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn validation(info: &str) -> Self {
        Self::ValidationFailed(info.to_owned())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::NotFound(_) => 404,
            CoreError::InvalidSession(_) => 401,
            CoreError::PermissionDenied(_) => 403,
            CoreError::DuplicateAssociation(_)
            | CoreError::AlreadyExists(_)
            | CoreError::SelfReferenceNotAllowed
            | CoreError::ValidationFailed(_) => 400,
            CoreError::Fatal(_) | CoreError::Storage(_) | CoreError::Cache(_) => 500,
        }
    }
}

impl From<CoreError> for potion::Error {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::Storage(e) => e.into(),
            CoreError::Cache(e) => e.into(),
            CoreError::InvalidSession(info) => HtmlError::InvalidSession.new(&info),
            CoreError::Fatal(info) => {
                log::error!("Fatal: {info}");
                potion::Error {
                    code: 500,
                    info: Some(String::from("Internal server error")),
                    redirect: None,
                }
            }
            CoreError::NotFound(info) => potion::Error {
                code: 404,
                info: Some(info),
                redirect: None,
            },
            CoreError::PermissionDenied(info) => potion::Error {
                code: 403,
                info: Some(info),
                redirect: None,
            },
            other => potion::Error {
                code: 400,
                info: Some(other.to_string()),
                redirect: None,
            },
        }
    }
}

impl From<CoreError> for Rejection {
    fn from(value: CoreError) -> Self {
        let error: potion::Error = value.into();
        error.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_map_to_client_codes() {
        assert_eq!(CoreError::not_found("Recipe").status_code(), 404);
        assert_eq!(CoreError::SelfReferenceNotAllowed.status_code(), 400);
        assert_eq!(
            CoreError::AlreadyExists("Recipe is already in favorites".to_owned()).status_code(),
            400
        );
        assert_eq!(
            CoreError::PermissionDenied("nope".to_owned()).status_code(),
            403
        );
        assert_eq!(
            CoreError::InvalidSession("Token expired".to_owned()).status_code(),
            401
        );
    }

    #[test]
    fn storage_details_are_not_exposed() {
        let error: potion::Error =
            CoreError::Storage(QueryError::new("relation \"recipes\" does not exist".to_owned()))
                .into();

        assert_eq!(error.info.as_deref(), Some("Internal server error"));
    }
}
