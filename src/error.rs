//! Error types for the subscribe-on operator.
//!
//! Errors in this crate fall into three groups:
//!
//! - **Protocol**: misuse of the consumer protocol by a caller
//!   (`IllegalDemand`) or by an upstream source (`DuplicateSubscription`)
//! - **Scheduling**: a scheduler refused a submitted task (`Rejected`)
//! - **Relay**: failures produced by an upstream source (`Upstream`) that are
//!   forwarded to the consumer unchanged
//!
//! Nothing in the operator throws across a concurrency boundary. Failures that
//! happen on a scheduler thread reach the consumer only through
//! [`Subscriber::on_error`](crate::flow::Subscriber::on_error).

use core::fmt;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Protocol ===
    /// Demand of zero was requested.
    IllegalDemand,
    /// An upstream source tried to establish its link more than once.
    DuplicateSubscription,

    // === Scheduling ===
    /// The scheduler refused to accept a task.
    Rejected,

    // === Relay ===
    /// Failure signalled by an upstream source.
    Upstream,

    // === Configuration ===
    /// Invalid configuration value.
    Config,
}

impl ErrorKind {
    /// Returns true for kinds caused by a consumer or source breaking the
    /// protocol rules rather than by a runtime condition.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::IllegalDemand | Self::DuplicateSubscription)
    }
}

/// The main error type for subscribe-on operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Creates an illegal demand error for a request of `n`.
    #[must_use]
    pub fn illegal_demand(n: u64) -> Self {
        Self::new(ErrorKind::IllegalDemand)
            .with_message(format!("demand must be positive, got {n}"))
    }

    /// Creates a duplicate subscription error.
    #[must_use]
    pub fn duplicate_subscription() -> Self {
        Self::new(ErrorKind::DuplicateSubscription)
            .with_message("upstream link already established")
    }

    /// Creates an upstream failure carrying a description.
    #[must_use]
    pub fn upstream(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream).with_message(detail)
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config).with_message(detail)
    }

    /// Returns true if this is an illegal demand error.
    #[must_use]
    pub const fn is_illegal_demand(&self) -> bool {
        matches!(self.kind, ErrorKind::IllegalDemand)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

impl Eq for Error {}

impl From<crate::scheduler::Rejected> for Error {
    fn from(_: crate::scheduler::Rejected) -> Self {
        Self::new(ErrorKind::Rejected).with_message("scheduler refused the task")
    }
}

/// A specialized Result type for subscribe-on operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Underlying;

    impl fmt::Display for Underlying {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "underlying")
        }
    }

    impl std::error::Error for Underlying {}

    #[test]
    fn display_without_message() {
        let err = Error::new(ErrorKind::Upstream);
        assert_eq!(err.to_string(), "Upstream");
    }

    #[test]
    fn display_with_message() {
        let err = Error::illegal_demand(0);
        assert_eq!(err.to_string(), "IllegalDemand: demand must be positive, got 0");
        assert!(err.is_illegal_demand());
        assert!(err.kind().is_protocol_violation());
    }

    #[test]
    fn source_chain_is_exposed() {
        let err = Error::upstream("boom").with_source(Underlying);
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "underlying");
    }

    #[test]
    fn equality_ignores_source() {
        let a = Error::upstream("boom").with_source(Underlying);
        let b = Error::upstream("boom");
        assert_eq!(a, b);
        assert_ne!(a, Error::upstream("other"));
    }

    #[test]
    fn rejected_converts() {
        let rejected = crate::scheduler::Rejected::new(Box::new(|| {}));
        let err: Error = rejected.into();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert!(!err.kind().is_protocol_violation());
    }
}
