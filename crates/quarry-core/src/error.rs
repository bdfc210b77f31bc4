use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable classification.
/// Leaf failures travel through combinators unchanged; callers branch on
/// `class` to decide between retrying, surfacing, or aborting.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError with optional origin-specific detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        let message = message.into();

        let detail = match (class, origin) {
            (ErrorClass::StoreRead, ErrorOrigin::Store) => {
                Some(ErrorDetail::Store(StoreError::ReadFailed {
                    message: message.clone(),
                }))
            }
            (ErrorClass::Corruption, ErrorOrigin::Store | ErrorOrigin::Index) => {
                Some(ErrorDetail::Store(StoreError::Corrupt {
                    message: message.clone(),
                }))
            }
            _ => None,
        };

        Self {
            class,
            origin,
            message,
            detail,
        }
    }

    /// Construct a store read failure (retryable by the caller).
    pub fn store_read(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::StoreRead, ErrorOrigin::Store, message)
    }

    /// Construct a store read timeout, surfaced as a read failure.
    pub fn store_timeout(row: impl fmt::Display) -> Self {
        let message = format!("range scan timed out for row {row}");

        Self {
            class: ErrorClass::StoreRead,
            origin: ErrorOrigin::Store,
            message: message.clone(),
            detail: Some(ErrorDetail::Store(StoreError::Timeout { message })),
        }
    }

    /// Construct a malformed-cursor error.
    pub(crate) fn malformed_cursor(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::MalformedCursor, ErrorOrigin::Cursor, message)
    }

    /// Construct an iterator-origin unsupported-operation error.
    pub(crate) fn iterator_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Iterator, message)
    }

    /// Construct a query-origin unsupported error (invalid query shape).
    pub(crate) fn query_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Query, message)
    }

    /// Construct an iterator-origin invariant violation.
    pub(crate) fn iterator_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Iterator, message)
    }

    /// Construct an index-origin invariant violation.
    pub(crate) fn index_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Index, message)
    }

    /// Construct an index-origin corruption error.
    pub(crate) fn index_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Index, message)
    }

    /// Construct a serialize-origin internal error.
    pub(crate) fn serialize_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Serialize, message)
    }

    /// Whether the caller may retry the request unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.class, ErrorClass::StoreRead)
    }

    /// Whether this error reflects caller misuse that must never be retried.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self.class,
            ErrorClass::Unsupported | ErrorClass::InvariantViolation | ErrorClass::Corruption
        )
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Store(StoreError),
}

///
/// StoreError
///
/// Store-specific structured error detail.
/// Never returned directly; always wrapped in [`ErrorDetail::Store`].
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("store read failed: {message}")]
    ReadFailed { message: String },

    #[error("store read timed out: {message}")]
    Timeout { message: String },

    #[error("store corruption: {message}")]
    Corrupt { message: String },
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    StoreRead,
    MalformedCursor,
    Unsupported,
    InvariantViolation,
    Corruption,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::StoreRead => "store_read",
            Self::MalformedCursor => "malformed_cursor",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
            Self::Corruption => "corruption",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Config,
    Cursor,
    Index,
    Iterator,
    Query,
    Serialize,
    Store,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::Cursor => "cursor",
            Self::Index => "index",
            Self::Iterator => "iterator",
            Self::Query => "query",
            Self::Serialize => "serialize",
            Self::Store => "store",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
