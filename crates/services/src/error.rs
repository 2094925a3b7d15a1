use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No API key was configured for the provider.
    MissingCredentials,
    /// The request could not be sent or the connection failed.
    Transport,
    /// The provider answered with a non-success status.
    Status,
    /// The provider answered with an unexpected payload.
    Decode,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MissingCredentials => write!(f, "Missing credentials"),
            ErrorKind::Transport => write!(f, "Transport error"),
            ErrorKind::Status => write!(f, "Unexpected status"),
            ErrorKind::Decode => write!(f, "Malformed response"),
        }
    }
}

/// Describes a failed provider call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    status: Option<u16>,
    message: String,
}

impl Error {
    /// Creates a new error with the `MissingCredentials` kind.
    #[inline]
    pub fn missing_credentials<S: Into<String>>(variable: S) -> Self {
        Self {
            kind: ErrorKind::MissingCredentials,
            status: None,
            message: format!("Missing {}", variable.into()),
        }
    }

    /// Creates a new error with the `Transport` kind.
    #[inline]
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self {
            kind: ErrorKind::Transport,
            status: None,
            message: message.into(),
        }
    }

    /// Creates a new error with the `Status` kind, keeping the body as the
    /// message.
    #[inline]
    pub fn status<S: Into<String>>(status: u16, body: S) -> Self {
        Self {
            kind: ErrorKind::Status,
            status: Some(status),
            message: body.into(),
        }
    }

    /// Creates a new error with the `Decode` kind.
    #[inline]
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self {
            kind: ErrorKind::Decode,
            status: None,
            message: message.into(),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the HTTP status code, if the provider answered at all.
    #[inline]
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    /// Returns the error message, or the response body for `Status` errors.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} {status}: {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    #[inline]
    fn from(err: reqwest::Error) -> Self {
        Error::transport(format!("{err}"))
    }
}

impl From<serde_json::Error> for Error {
    #[inline]
    fn from(err: serde_json::Error) -> Self {
        Error::decode(format!("{err}"))
    }
}

/// Reads the body of a response, mapping non-success statuses to
/// [`ErrorKind::Status`].
pub(crate) async fn read_body(resp: reqwest::Response) -> Result<String, Error> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(Error::status(status.as_u16(), body));
    }
    Ok(body)
}
