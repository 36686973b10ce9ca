//! Result and error types for Esperar.
//!
//! Two layers of failure live here. `DriverError` is what the browser
//! protocol client raises; every variant classifies into a [`FailureKind`]
//! so the wait engine can decide whether a failure is transient.
//! `EsperarError` is what this crate surfaces to test code: timeouts with
//! their triggering cause attached, assertion failures, and the fatal
//! configuration/resolution errors.

use thiserror::Error;

/// Result type for Esperar operations
pub type EsperarResult<T> = Result<T, EsperarError>;

/// Result type for operations on the driver seam
pub type DriverResult<T> = Result<T, DriverError>;

/// Classification of driver-level failures.
///
/// The wait engine filters on these kinds: a kind in a policy's ignored
/// set is swallowed and treated as "condition not yet true".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// No element matched the locator
    NotFound,
    /// The element handle refers to a DOM node that was removed or replaced
    Stale,
    /// The locator expression itself was rejected by the client
    InvalidSelector,
    /// The session is unusable (connection lost, browser crashed, ...)
    Session,
}

impl FailureKind {
    /// Whether this kind is expected during page transitions.
    ///
    /// Transient kinds mean "not currently present", never a fault.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NotFound | Self::Stale)
    }
}

/// Failures raised by the browser protocol client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// No element matched the locator
    #[error("no element found for {locator}")]
    NotFound {
        /// Rendered locator expression
        locator: String,
    },

    /// The referenced DOM node is gone
    #[error("stale element reference: {subject}")]
    Stale {
        /// What the handle pointed at
        subject: String,
    },

    /// The selector expression was rejected
    #[error("invalid selector {selector}: {message}")]
    InvalidSelector {
        /// Rendered locator expression
        selector: String,
        /// Client-supplied detail
        message: String,
    },

    /// The session itself failed
    #[error("session error: {message}")]
    Session {
        /// Client-supplied detail
        message: String,
    },
}

impl DriverError {
    /// Classify this failure for wait filtering
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Stale { .. } => FailureKind::Stale,
            Self::InvalidSelector { .. } => FailureKind::InvalidSelector,
            Self::Session { .. } => FailureKind::Session,
        }
    }
}

/// Errors that can occur in Esperar
#[derive(Debug, Error)]
pub enum EsperarError {
    /// A condition wait exhausted its timeout budget
    #[error("timed out after {timeout_ms}ms waiting for {condition}")]
    WaitTimedOut {
        /// Description of the awaited condition
        condition: String,
        /// Configured timeout in milliseconds
        timeout_ms: u64,
        /// Last failure observed while polling, if any
        #[source]
        cause: Option<DriverError>,
    },

    /// An element wait for visibility/availability timed out
    #[error("element {subject} was not visible after {timeout_ms}ms")]
    ElementNotVisible {
        /// Rendered locator of the awaited element
        subject: String,
        /// Configured timeout in milliseconds
        timeout_ms: u64,
        /// Last failure observed while polling, if any
        #[source]
        cause: Option<DriverError>,
    },

    /// An element expected to disappear was still visible at timeout
    #[error("element {subject} was still visible after {timeout_ms}ms")]
    UnexpectedElementVisible {
        /// Rendered locator of the offending element
        subject: String,
        /// Configured timeout in milliseconds
        timeout_ms: u64,
    },

    /// A `should_*` expectation did not hold
    #[error("assertion failed: {message}")]
    AssertionFailed {
        /// Human-readable expectation, naming the element and expected state
        message: String,
    },

    /// Session realization failed (unsupported configuration, construction error)
    #[error("unsupported driver: {message}")]
    UnsupportedDriver {
        /// What went wrong during realization
        message: String,
    },

    /// The requested page type cannot be used against the current session
    #[error("wrong page for {page}: {cause}")]
    WrongPage {
        /// Name of the requested page type
        page: String,
        /// Underlying cause (URL mismatch, constructor failure, ...)
        cause: String,
    },

    /// A non-ignorable driver failure aborted an operation
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl EsperarError {
    /// Whether this error belongs to the wait-timeout family
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::WaitTimedOut { .. }
                | Self::ElementNotVisible { .. }
                | Self::UnexpectedElementVisible { .. }
        )
    }
}
