//! Closed description of what an operator wraps.

use std::fmt;
use std::sync::Arc;

use super::Publisher;

/// The source wrapped by an operator.
///
/// Whether a source is a pre-resolved value is decided once, when the source
/// is built, so that operators can take a fast path without inspecting the
/// publisher at subscription time.
pub enum Source<T> {
    /// A general publisher with its own signalling behaviour.
    Publisher(Arc<dyn Publisher<T>>),
    /// A single value known up front.
    Value(T),
    /// A source known to complete without emitting.
    Empty,
}

impl<T> Source<T> {
    /// Wraps a general publisher.
    pub fn publisher(publisher: impl Publisher<T> + 'static) -> Self {
        Self::Publisher(Arc::new(publisher))
    }

    /// Wraps a single known value.
    pub fn value(value: T) -> Self {
        Self::Value(value)
    }

    /// Builds a scalar source from an optional value.
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Self::Value)
    }

    /// Returns true for the value and empty variants.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Value(_) | Self::Empty)
    }
}

impl<T: Clone> Clone for Source<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Publisher(p) => Self::Publisher(Arc::clone(p)),
            Self::Value(v) => Self::Value(v.clone()),
            Self::Empty => Self::Empty,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publisher(_) => f.write_str("Source::Publisher(..)"),
            Self::Value(v) => f.debug_tuple("Source::Value").field(v).finish(),
            Self::Empty => f.write_str("Source::Empty"),
        }
    }
}

impl<T> From<Arc<dyn Publisher<T>>> for Source<T> {
    fn from(publisher: Arc<dyn Publisher<T>>) -> Self {
        Self::Publisher(publisher)
    }
}
