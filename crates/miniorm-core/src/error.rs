//! Error types shared by every miniorm crate.
//!
//! Callers only ever see these types. Driver failures enter the system as
//! [`Error::Engine`] at the [`Connection`](crate::Connection) boundary and are
//! logged, then re-signaled as a [`QueryError`] with a generic message before
//! they reach application code, so driver internals never leak past the core.

use std::error::Error as StdError;
use std::fmt;

/// Result alias used throughout miniorm.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed or unsafe identifier, disallowed operator, or a value whose
    /// shape does not fit the operator. Raised before anything is executed.
    InvalidArgument(String),
    /// The engine could not be reached when establishing the connection.
    Connection(ConnectionError),
    /// A compiled statement failed inside the engine.
    Query(QueryError),
    /// Raw failure reported by a driver. Only produced by `Connection`
    /// implementations; the query layer converts it into [`Error::Query`].
    Engine(EngineError),
    /// Invalid configuration.
    Config(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Shorthand for a raw driver failure.
    pub fn engine(message: impl Into<String>) -> Self {
        Error::Engine(EngineError {
            message: message.into(),
        })
    }

    /// Build a typed query error of the given kind.
    pub fn query(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            kind,
            message: message.into(),
        })
    }

    /// True for [`Error::InvalidArgument`].
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    /// The query error kind, if this is a query error.
    #[must_use]
    pub fn query_kind(&self) -> Option<QueryErrorKind> {
        match self {
            Error::Query(q) => Some(q.kind),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::Connection(err) => write!(f, "{}", err),
            Error::Query(err) => write!(f, "{}", err),
            Error::Engine(err) => write!(f, "{}", err),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Connection(err) => Some(err),
            Error::Query(err) => Some(err),
            Error::Engine(err) => Some(err),
            Error::InvalidArgument(_) | Error::Config(_) => None,
        }
    }
}

/// Failure to establish the engine connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    /// Generic, user-presentable message.
    pub message: String,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection error: {}", self.message)
    }
}

impl StdError for ConnectionError {}

/// Which phase of data access failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Reading a record (`find`).
    Read,
    /// Writing a record (`create`, `update`, `delete`).
    Write,
    /// Executing a built query or a relation load.
    Execution,
}

impl QueryErrorKind {
    /// Category label used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            QueryErrorKind::Read => "persistence read",
            QueryErrorKind::Write => "persistence write",
            QueryErrorKind::Execution => "query execution",
        }
    }
}

/// A statement failed in the engine. The message is generic; the engine's own
/// error text is only written to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    /// Failure category.
    pub kind: QueryErrorKind,
    /// Generic message such as `"Insert operation failed."`.
    pub message: String,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind.as_str(), self.message)
    }
}

impl StdError for QueryError {}

/// Error text reported by a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    /// Driver message, for logs only.
    pub message: String,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine error: {}", self.message)
    }
}

impl StdError for EngineError {}
