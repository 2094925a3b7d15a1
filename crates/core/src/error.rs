use std::fmt::{self, Display};

pub use daytrip_model::ErrorKind;

/// A run-level failure.
///
/// Only losing the planning agent in the discovery phase fails a run, every
/// other failure degrades the plan instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    #[inline]
    pub(crate) fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the kind of the agent failure.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "planning agent failed ({}): {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}
