use std::borrow::Cow;
use std::fmt::{self, Display};

use serde_json::{Value, json};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The arguments provided by the agent were invalid.
    InvalidInput,
    /// The tool ran but its provider failed.
    ExecutionError,
    /// The agent asked for a tool that doesn't exist.
    UnknownTool,
}

impl ErrorKind {
    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::ExecutionError => "execution_error",
            ErrorKind::UnknownTool => "unknown_tool",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidInput => write!(f, "Invalid input"),
            ErrorKind::ExecutionError => write!(f, "Execution error"),
            ErrorKind::UnknownTool => write!(f, "Unknown tool"),
        }
    }
}

/// Describes a tool call error.
///
/// Tool errors never abort a planning run. They are reported back to the
/// agent as the result of the call, see [`Error::to_value`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
    status: Option<u16>,
}

impl Error {
    /// Creates a new error with the `InvalidInput` kind.
    #[inline]
    pub fn invalid_input() -> Self {
        Self::with_kind(ErrorKind::InvalidInput)
    }

    /// Creates a new error with the `ExecutionError` kind.
    #[inline]
    pub fn execution_error() -> Self {
        Self::with_kind(ErrorKind::ExecutionError)
    }

    /// Creates a new error with the `UnknownTool` kind.
    #[inline]
    pub fn unknown_tool(name: &str) -> Self {
        Self::with_kind(ErrorKind::UnknownTool)
            .with_reason(format!("no tool named `{name}`"))
    }

    #[inline]
    fn with_kind(kind: ErrorKind) -> Self {
        Self {
            kind,
            reason: None,
            status: None,
        }
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the status code the provider answered with.
    #[inline]
    pub fn with_status(mut self, status: Option<u16>) -> Self {
        self.status = status;
        self
    }

    /// Returns the kind of the error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the status code the provider answered with, if any.
    #[inline]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the reason for the error.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match self.reason.as_deref() {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }

    /// Returns the structured payload shown to the agent.
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "error": true,
            "kind": self.kind.as_str(),
            "message": self.reason(),
        });
        if let Some(status) = self.status {
            value["status"] = status.into();
        }
        value
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason())
    }
}

impl std::error::Error for Error {}

impl From<daytrip_services::Error> for Error {
    fn from(err: daytrip_services::Error) -> Self {
        Error::execution_error()
            .with_reason(err.message())
            .with_status(err.status_code())
    }
}
