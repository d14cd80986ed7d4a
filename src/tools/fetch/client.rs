use super::tls::TlsContext;
use crate::error::{has_certificate_marker, TransportError};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Certificate};
use std::error::Error as StdError;
use std::fs;
use std::time::Duration;
use url::Url;

const REDIRECT_LIMIT: usize = 10;
const USER_AGENT: &str = concat!("pagegrab/", env!("CARGO_PKG_VERSION"));

/// Raw successful response: declared content type plus undecoded body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteBody {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// One blocking GET against a URL.
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;
    fn get(
        &self,
        url: &str,
        timeout: Duration,
        tls: &TlsContext,
    ) -> Result<RemoteBody, TransportError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn get(
        &self,
        url: &str,
        timeout: Duration,
        tls: &TlsContext,
    ) -> Result<RemoteBody, TransportError> {
        (**self).get(url, timeout, tls)
    }
}

/// reqwest blocking transport. Builds a fresh client for every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        Self
    }

    fn build_client(&self, timeout: Duration, tls: &TlsContext) -> Result<Client, TransportError> {
        let mut builder = Client::builder()
            .redirect(redirect::Policy::limited(REDIRECT_LIMIT))
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .user_agent(USER_AGENT)
            .timeout(timeout);

        match tls {
            TlsContext::Default => {}
            TlsContext::CaFile(path) => {
                let pem = fs::read(path).map_err(|e| {
                    TransportError::Setup(format!("reading CA bundle {}: {}", path.display(), e))
                })?;
                let certs = Certificate::from_pem_bundle(&pem).map_err(|e| {
                    TransportError::Setup(format!("parsing CA bundle {}: {}", path.display(), e))
                })?;
                if certs.is_empty() {
                    return Err(TransportError::Setup(format!(
                        "CA bundle {} contains no certificates",
                        path.display()
                    )));
                }
                builder = with_roots(builder, certs);
            }
            TlsContext::Roots(certs) => {
                builder = with_roots(builder, certs.iter().cloned());
            }
            TlsContext::Insecure => {
                builder = builder
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true);
            }
        }

        builder
            .build()
            .map_err(|e| TransportError::Setup(format!("failed to build client: {}", e)))
    }
}

fn with_roots(
    builder: reqwest::blocking::ClientBuilder,
    certs: impl IntoIterator<Item = Certificate>,
) -> reqwest::blocking::ClientBuilder {
    certs
        .into_iter()
        .fold(builder.tls_built_in_root_certs(false), |b, cert| {
            b.add_root_certificate(cert)
        })
}

impl Transport for ReqwestTransport {
    fn name(&self) -> &'static str {
        "reqwest-blocking"
    }

    fn get(
        &self,
        url: &str,
        timeout: Duration,
        tls: &TlsContext,
    ) -> Result<RemoteBody, TransportError> {
        let parsed = parse_url(url)?;
        let client = self.build_client(timeout, tls)?;

        let resp = client
            .get(parsed)
            .send()
            .map_err(|e| classify_reqwest_error(&e, url))?;

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = resp
            .bytes()
            .map_err(|e| classify_reqwest_error(&e, url))?
            .to_vec();

        Ok(RemoteBody {
            content_type,
            bytes,
        })
    }
}

fn parse_url(url: &str) -> Result<Url, TransportError> {
    let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(TransportError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

/// Full source chain of an error, joined with ": ".
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if parts.last() != Some(&text) {
            parts.push(text);
        }
        current = cause.source();
    }
    parts.join(": ")
}

fn classify_reqwest_error(err: &reqwest::Error, url: &str) -> TransportError {
    let chain = error_chain(err);

    if err.is_builder() {
        return TransportError::InvalidUrl {
            url: url.to_string(),
            reason: chain,
        };
    }
    if let Some(status) = err.status() {
        return TransportError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        };
    }
    if has_certificate_marker(&chain) {
        return TransportError::Certificate(chain);
    }

    let lower = chain.to_ascii_lowercase();
    if lower.contains("tls") || lower.contains("ssl") || lower.contains("handshake") {
        return TransportError::Tls(chain);
    }
    TransportError::Network(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve exactly one canned HTTP response on a loopback port.
    fn serve_once(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response);
                let _ = stream.flush();
            }
        });
        format!("http://{addr}/page")
    }

    #[test]
    fn returns_body_and_content_type() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=iso-8859-1\r\nContent-Length: 4\r\nConnection: close\r\n\r\ncaf\xe9",
        );
        let body = ReqwestTransport::new()
            .get(&url, Duration::from_secs(5), &TlsContext::Default)
            .unwrap();
        assert_eq!(
            body.content_type.as_deref(),
            Some("text/html; charset=iso-8859-1")
        );
        assert_eq!(body.bytes, b"caf\xe9".to_vec());
    }

    #[test]
    fn server_error_maps_to_status() {
        let url = serve_once(
            b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let err = ReqwestTransport::new()
            .get(&url, Duration::from_secs(5), &TlsContext::Default)
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 500, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn refused_connection_maps_to_network() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{port}/");
        let err = ReqwestTransport::new()
            .get(&url, Duration::from_secs(5), &TlsContext::Default)
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)), "{err:?}");
        assert!(!err.is_certificate_failure());
    }

    #[test]
    fn malformed_url_is_invalid_url() {
        let err = ReqwestTransport::new()
            .get("not a url", Duration::from_secs(1), &TlsContext::Default)
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));

        let err = ReqwestTransport::new()
            .get("ftp://example.test/x", Duration::from_secs(1), &TlsContext::Default)
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { ref reason, .. } if reason.contains("ftp")));
    }

    #[test]
    fn missing_ca_bundle_is_setup_error() {
        let tls = TlsContext::CaFile("/definitely/not/here.pem".into());
        let err = ReqwestTransport::new()
            .get("https://example.test/", Duration::from_secs(1), &tls)
            .unwrap_err();
        assert!(matches!(err, TransportError::Setup(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn empty_ca_bundle_is_setup_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let tls = TlsContext::CaFile(file.path().to_path_buf());
        let err = ReqwestTransport::new()
            .get("https://example.test/", Duration::from_secs(1), &tls)
            .unwrap_err();
        assert!(matches!(err, TransportError::Setup(_)));
    }
}
