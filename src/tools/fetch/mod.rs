mod client;
mod retry;
mod tls;
mod utils;

pub mod types;

pub use client::{RemoteBody, ReqwestTransport, Transport};
pub use tls::{
    select_tls_context, EnvTrustSource, NoTrustSource, TlsContext, TrustSource, CERT_FILE_ENV,
};
pub use types::*;

use crate::error::{FetchError, Result};
use crate::tools::normalize::normalize;
use retry::{AttemptState, NextStep};
use std::fs;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use utils::{decode_body, is_local_source};

type SleepFn = Box<dyn Fn(Duration) + Send + Sync>;

/// Fetch HTML from a local path or a URL.
///
/// Existing paths are read as UTF-8 and returned verbatim, whatever the
/// retry settings. Anything else is
/// fetched over HTTP(S) with up to `opts.max_retries` attempts, then
/// normalized with `opts.parser`.
///
/// # Examples
/// ```no_run
/// use pagegrab::tools::fetch::{fetch, FetchOptions};
///
/// # fn example() -> pagegrab::Result<()> {
/// let html = fetch("https://example.com", &FetchOptions::default())?;
/// let local = fetch("./saved/page.html", &FetchOptions::default())?;
/// # Ok(())
/// # }
/// ```
pub fn fetch(source: &str, opts: &FetchOptions) -> Result<String> {
    ContentFetcher::new().fetch(source, opts)
}

/// Like [`fetch`] but also reports origin, attempt count and whether the
/// insecure fallback was used.
pub fn fetch_report(source: &str, opts: &FetchOptions) -> Result<FetchResult> {
    ContentFetcher::new().fetch_report(source, opts)
}

/// Content fetcher over a pluggable [`Transport`].
///
/// Holds no per-call state, so one instance can serve concurrent callers.
pub struct ContentFetcher<T: Transport = ReqwestTransport> {
    transport: T,
    trust: Box<dyn TrustSource>,
    sleep: SleepFn,
}

impl ContentFetcher<ReqwestTransport> {
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::new())
    }
}

impl Default for ContentFetcher<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> ContentFetcher<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            trust: Box::new(EnvTrustSource),
            sleep: Box::new(thread::sleep),
        }
    }

    pub fn with_trust_source(mut self, trust: impl TrustSource + 'static) -> Self {
        self.trust = Box::new(trust);
        self
    }

    /// Replace the backoff sleep (tests, or callers with their own clock).
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn fetch(&self, source: &str, opts: &FetchOptions) -> Result<String> {
        self.fetch_report(source, opts).map(FetchResult::into_html)
    }

    pub fn fetch_report(&self, source: &str, opts: &FetchOptions) -> Result<FetchResult> {
        if source.trim().is_empty() {
            return Err(FetchError::EmptySource);
        }
        let start = Instant::now();

        if is_local_source(source) {
            debug!(source, "reading local content");
            let html = fs::read_to_string(source)?;
            return Ok(FetchResult {
                html,
                origin: Origin::Local,
                attempts: 0,
                insecure_fallback_used: false,
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        opts.validate()?;
        let max_retries = opts.max_retries;
        let mut state = AttemptState::new(
            max_retries,
            opts.backoff_factor,
            opts.allow_insecure_fallback,
        );
        let mut last_error = None;
        let mut attempt = 1;

        while attempt <= max_retries {
            debug!(
                source,
                attempt,
                max_retries,
                transport = self.transport.name(),
                trust = self.trust.name(),
                "remote fetch attempt"
            );
            let tls = select_tls_context(opts, state.insecure(), self.trust.as_ref());
            if tls.is_insecure() {
                warn!(source, "certificate verification disabled for this request");
            }

            state.record_call();
            match self.transport.get(source, opts.timeout, &tls) {
                Ok(body) => {
                    let text = decode_body(&body.bytes, body.content_type.as_deref());
                    return Ok(FetchResult {
                        html: normalize(&text, opts.parser),
                        origin: Origin::Remote,
                        attempts: state.calls(),
                        insecure_fallback_used: state.insecure(),
                        duration_ms: start.elapsed().as_millis() as u64,
                    });
                }
                Err(err) if !err.is_retryable() => return Err(FetchError::Setup(err)),
                Err(err) => {
                    warn!(source, attempt, max_retries, error = %err, "remote fetch failed");
                    let step = state.after_failure(attempt, &err);
                    last_error = Some(err);
                    match step {
                        NextStep::InsecureReplay => {
                            warn!(
                                source,
                                attempt,
                                "retrying with certificate verification disabled; consider configuring a CA bundle (ca_file)"
                            );
                            continue;
                        }
                        NextStep::Backoff(delay) => {
                            debug!(
                                source,
                                delay_secs = delay.as_secs_f64(),
                                "waiting before next attempt"
                            );
                            (self.sleep)(delay);
                        }
                        NextStep::GiveUp => {}
                    }
                }
            }
            attempt += 1;
        }

        let Some(last) = last_error else {
            return Err(FetchError::InvalidOptions(
                "max_retries must be at least 1".into(),
            ));
        };
        Err(FetchError::Exhausted {
            source_id: source.to_string(),
            attempts: state.calls(),
            last,
        })
    }
}
