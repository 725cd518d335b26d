use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Malformed or missing request fields. Raised before any work is done.
    Validation(String),
    /// Every requested package ID failed to resolve.
    NoValidPackages,
    /// A single-package lookup (QR route) found nothing.
    PackageNotFound(String),
    /// The QR encoder rejected the payload (empty, or too long for the EC level).
    Encoding(String),
    /// Document assembly failed or ran past `render_timeout`.
    Rendering(String),
    /// The assembled document came out with zero bytes.
    EmptyDocument,
    /// Grid geometry or other configuration is unusable.
    Config(String),
    /// The package store could not be read.
    Store(String),
    Io(std::io::Error),
}

impl Error {
    /// HTTP-equivalent status class for the failure.
    pub fn status(&self) -> u16 {
        match self {
            Error::Validation(_) | Error::NoValidPackages => 400,
            Error::PackageNotFound(_) => 404,
            Error::Encoding(_)
            | Error::Rendering(_)
            | Error::EmptyDocument
            | Error::Config(_)
            | Error::Store(_)
            | Error::Io(_) => 500,
        }
    }

    /// Structured `{ "error": ... }` body returned to callers instead of a document.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "invalid request: {msg}"),
            Error::NoValidPackages => write!(f, "No valid packages found to generate labels."),
            Error::PackageNotFound(id) => write!(f, "Package not found: {id}"),
            Error::Encoding(msg) => write!(f, "QR encoding failed: {msg}"),
            Error::Rendering(msg) => write!(f, "rendering failed: {msg}"),
            Error::EmptyDocument => write!(f, "generated document is empty"),
            Error::Config(msg) => write!(f, "invalid configuration: {msg}"),
            Error::Store(msg) => write!(f, "package store error: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
