use super::types::FetchOptions;
use reqwest::Certificate;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Env var pointing at a PEM trust bundle.
pub const CERT_FILE_ENV: &str = "SSL_CERT_FILE";

/// TLS configuration for a single remote attempt.
#[derive(Clone)]
pub enum TlsContext {
    /// Client library defaults (bundled webpki roots).
    Default,
    /// Verify against the PEM bundle at this path only.
    CaFile(PathBuf),
    /// Verify against these roots only.
    Roots(Vec<Certificate>),
    /// No certificate or hostname verification.
    Insecure,
}

impl TlsContext {
    pub fn is_insecure(&self) -> bool {
        matches!(self, TlsContext::Insecure)
    }
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsContext::Default => f.write_str("Default"),
            TlsContext::CaFile(path) => f.debug_tuple("CaFile").field(path).finish(),
            TlsContext::Roots(certs) => write!(f, "Roots({} certificate(s))", certs.len()),
            TlsContext::Insecure => f.write_str("Insecure"),
        }
    }
}

/// Where a default trust bundle comes from when the caller gives none.
pub trait TrustSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Path to a PEM bundle, if this source has one right now.
    fn bundle(&self) -> Option<PathBuf>;

    fn is_available(&self) -> bool {
        self.bundle().is_some()
    }
}

/// Bundle named by `SSL_CERT_FILE`, available only when that file exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvTrustSource;

impl TrustSource for EnvTrustSource {
    fn name(&self) -> &'static str {
        "env"
    }

    fn bundle(&self) -> Option<PathBuf> {
        let path = PathBuf::from(env::var_os(CERT_FILE_ENV)?);
        path.is_file().then_some(path)
    }
}

/// Never available; leaves trust to the client defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrustSource;

impl TrustSource for NoTrustSource {
    fn name(&self) -> &'static str {
        "none"
    }

    fn bundle(&self) -> Option<PathBuf> {
        None
    }
}

/// Pick the TLS context for one attempt.
///
/// Order: explicit context, insecure (when the fallback is active), caller's
/// CA file, the trust source's bundle, client defaults.
pub fn select_tls_context(
    opts: &FetchOptions,
    insecure: bool,
    trust: &dyn TrustSource,
) -> TlsContext {
    if let Some(ctx) = &opts.tls_context {
        return ctx.clone();
    }
    if insecure {
        return TlsContext::Insecure;
    }
    if let Some(path) = &opts.ca_file {
        return TlsContext::CaFile(path.clone());
    }
    if let Some(path) = trust.bundle() {
        return TlsContext::CaFile(path);
    }
    TlsContext::Default
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTrust(&'static str);

    impl TrustSource for FixedTrust {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn bundle(&self) -> Option<PathBuf> {
            Some(PathBuf::from(self.0))
        }
    }

    #[test]
    fn explicit_context_wins_even_when_insecure() {
        let opts = FetchOptions::default()
            .with_tls_context(TlsContext::Roots(Vec::new()))
            .with_ca_file("/etc/ca.pem");
        let ctx = select_tls_context(&opts, true, &FixedTrust("/other.pem"));
        assert!(matches!(ctx, TlsContext::Roots(ref c) if c.is_empty()));
    }

    #[test]
    fn insecure_flag_beats_ca_file() {
        let opts = FetchOptions::default().with_ca_file("/etc/ca.pem");
        let ctx = select_tls_context(&opts, true, &NoTrustSource);
        assert!(ctx.is_insecure());
    }

    #[test]
    fn ca_file_beats_trust_source() {
        let opts = FetchOptions::default().with_ca_file("/etc/ca.pem");
        let ctx = select_tls_context(&opts, false, &FixedTrust("/other.pem"));
        assert!(matches!(ctx, TlsContext::CaFile(ref p) if p == &PathBuf::from("/etc/ca.pem")));
    }

    #[test]
    fn trust_source_used_when_available() {
        let opts = FetchOptions::default();
        let ctx = select_tls_context(&opts, false, &FixedTrust("/bundle.pem"));
        assert!(matches!(ctx, TlsContext::CaFile(ref p) if p == &PathBuf::from("/bundle.pem")));
    }

    #[test]
    fn falls_back_to_client_defaults() {
        let opts = FetchOptions::default();
        let ctx = select_tls_context(&opts, false, &NoTrustSource);
        assert!(matches!(ctx, TlsContext::Default));
        assert!(!NoTrustSource.is_available());
    }

    #[test]
    fn trust_sources_have_log_names() {
        assert_eq!(EnvTrustSource.name(), "env");
        assert_eq!(NoTrustSource.name(), "none");
    }

    #[test]
    fn debug_hides_certificate_bytes() {
        assert_eq!(format!("{:?}", TlsContext::Roots(Vec::new())), "Roots(0 certificate(s))");
    }
}
