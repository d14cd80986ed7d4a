use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

/// Upper-cased fragments that identify a certificate-verification failure
/// inside a generic TLS error message.
const CERTIFICATE_MARKERS: [&str; 5] = [
    "CERTIFICATE_VERIFY_FAILED",
    "CERTIFICATE VERIFY FAILED",
    "INVALID PEER CERTIFICATE",
    "UNKNOWNISSUER",
    "SELF SIGNED CERTIFICATE",
];

/// Failure of a single remote attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("certificate verification failed: {0}")]
    Certificate(String),

    #[error("tls error: {0}")]
    Tls(String),

    #[error("network error: {0}")]
    Network(String),

    /// The request could not be prepared (unreadable CA bundle, client build).
    #[error("transport setup failed: {0}")]
    Setup(String),
}

impl TransportError {
    /// Setup failures are the caller's to fix, everything else may be transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Setup(_))
    }

    pub fn is_certificate_failure(&self) -> bool {
        match self {
            TransportError::Certificate(_) => true,
            TransportError::Tls(msg) => has_certificate_marker(msg),
            _ => false,
        }
    }
}

pub(crate) fn has_certificate_marker(text: &str) -> bool {
    let upper = text.to_ascii_uppercase();
    CERTIFICATE_MARKERS
        .iter()
        .any(|marker| upper.contains(marker))
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// Local reads surface untouched.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("source must not be empty")]
    EmptySource,

    #[error("invalid fetch options: {0}")]
    InvalidOptions(String),

    #[error("unknown parser {0:?} (expected \"fragment\" or \"document\")")]
    UnknownParser(String),

    #[error(transparent)]
    Setup(TransportError),

    #[error("could not fetch {source_id:?} after {attempts} attempt(s)")]
    Exhausted {
        source_id: String,
        attempts: u32,
        #[source]
        last: TransportError,
    },
}

impl FetchError {
    /// Last remote error for exhausted fetches.
    pub fn last_transport_error(&self) -> Option<&TransportError> {
        match self {
            FetchError::Exhausted { last, .. } => Some(last),
            FetchError::Setup(e) => Some(e),
            _ => None,
        }
    }
}
