//! Error types for the AccuLynx client and job cache.

use std::fmt;

/// Result type for client and cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types returned by the client.
///
/// The remote variants mirror the HTTP status classes the AccuLynx API
/// answers with. Each carries the status code when one was observed.
#[derive(Debug, Clone)]
pub enum Error {
    /// The API key was rejected (HTTP 401).
    Authentication {
        message: String,
        status: Option<u16>,
    },

    /// The requested resource does not exist (HTTP 404).
    NotFound {
        message: String,
        status: Option<u16>,
    },

    /// The request body or parameters were refused (HTTP 422).
    ///
    /// Also raised locally when a request cannot be built, e.g. an upload
    /// without a file name.
    Validation {
        message: String,
        status: Option<u16>,
    },

    /// The account exceeded its request quota (HTTP 429).
    RateLimited {
        message: String,
        status: Option<u16>,
    },

    /// Any other remote failure (HTTP >= 400 not covered above).
    ///
    /// `message` holds the response body as returned by the server.
    Api {
        message: String,
        status: Option<u16>,
    },

    /// The request never produced a response.
    ///
    /// Common causes:
    /// - DNS or connection failure
    /// - Transport timeout
    /// - TLS handshake failure
    Transport(String),

    /// A response body could not be decoded into the expected model.
    Deserialization(String),

    /// Invalid or missing configuration.
    ///
    /// **Recovery:** Fix configuration and restart.
    Config(String),

    /// Local I/O failure (reading an upload, etc).
    Io(String),

    /// Generic error with custom message.
    Other(String),
}

impl Error {
    /// Map an HTTP error status and body onto the error taxonomy.
    pub fn from_status(status: u16, body: &str) -> Self {
        let status_code = Some(status);
        match status {
            401 => Error::Authentication {
                message: "Invalid authentication credentials".to_string(),
                status: status_code,
            },
            404 => Error::NotFound {
                message: "Resource not found".to_string(),
                status: status_code,
            },
            422 => Error::Validation {
                message: "Invalid request data".to_string(),
                status: status_code,
            },
            429 => Error::RateLimited {
                message: "API rate limit exceeded".to_string(),
                status: status_code,
            },
            _ => Error::Api {
                message: format!("API request failed: {}", body),
                status: status_code,
            },
        }
    }

    /// HTTP status code attached to a remote failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Authentication { status, .. }
            | Error::NotFound { status, .. }
            | Error::Validation { status, .. }
            | Error::RateLimited { status, .. }
            | Error::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the error came back from the remote API (as opposed to
    /// transport, decoding or local failures).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Authentication { .. }
                | Error::NotFound { .. }
                | Error::Validation { .. }
                | Error::RateLimited { .. }
                | Error::Api { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Authentication { message, status }
            | Error::NotFound { message, status }
            | Error::Validation { message, status }
            | Error::RateLimited { message, status }
            | Error::Api { message, status } => match status {
                Some(code) => write!(f, "{} (status {})", message, code),
                None => write!(f, "{}", message),
            },
            Error::Transport(msg) => write!(f, "Transport error: {}", msg),
            Error::Deserialization(msg) => write!(f, "Deserialization error: {}", msg),
            Error::Config(msg) => write!(f, "Config error: {}", msg),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Deserialization(e.to_string())
        } else if let Some(status) = e.status() {
            Error::from_status(status.as_u16(), &e.to_string())
        } else {
            Error::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::Io(e.to_string())
        } else {
            Error::Deserialization(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}
