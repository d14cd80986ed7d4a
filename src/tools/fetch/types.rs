use super::tls::TlsContext;
use crate::error::{FetchError, Result};
use crate::tools::normalize::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.0;

/// Options for a single fetch call.
///
/// Loadable from JSON; the timeout is whole seconds and `tls_context` is
/// programmatic only.
///
/// # Examples
/// ```
/// use pagegrab::tools::fetch::FetchOptions;
/// use std::time::Duration;
///
/// let opts = FetchOptions::default()
///     .with_max_retries(5)
///     .with_timeout(Duration::from_secs(10))
///     .with_insecure_fallback(true);
/// assert!(opts.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub parser: Parser,
    #[serde(skip)]
    pub tls_context: Option<TlsContext>,
    pub ca_file: Option<PathBuf>,
    pub allow_insecure_fallback: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            parser: Parser::default(),
            tls_context: None,
            ca_file: None,
            allow_insecure_fallback: false,
        }
    }
}

impl FetchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    pub fn with_parser(mut self, parser: Parser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_tls_context(mut self, ctx: TlsContext) -> Self {
        self.tls_context = Some(ctx);
        self
    }

    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    pub fn with_insecure_fallback(mut self, allow: bool) -> Self {
        self.allow_insecure_fallback = allow;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(FetchError::InvalidOptions("timeout must be positive".into()));
        }
        if self.max_retries == 0 {
            return Err(FetchError::InvalidOptions(
                "max_retries must be at least 1".into(),
            ));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 0.0 {
            return Err(FetchError::InvalidOptions(format!(
                "backoff_factor must be a non-negative number, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }
}

/// Where the returned HTML came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Local,
    Remote,
}

/// Result of a fetch including telemetry metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    /// Raw file text for local sources, normalized HTML for remote ones
    pub html: String,
    pub origin: Origin,
    /// Transport calls made, including a fallback replay (0 for local reads)
    pub attempts: u32,
    pub insecure_fallback_used: bool,
    pub duration_ms: u64,
}

impl FetchResult {
    /// Consume the result and return just the HTML.
    pub fn into_html(self) -> String {
        self.html
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
