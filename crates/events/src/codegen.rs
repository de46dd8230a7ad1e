//! The codegen collaborator.
//!
//! Generated artifacts (runnable test scripts) are derived from a
//! composite's live state. After a mutation commits, the collaborator is
//! asked to regenerate them; failures are logged by the caller and never
//! affect the mutation that triggered them.

use std::time::Duration;

use async_trait::async_trait;
use casebook_core::composite::CompositeKind;
use casebook_core::types::DbId;

/// Default HTTP request timeout for a single regeneration call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// The HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The codegen service returned a non-2xx status code.
    #[error("Codegen service returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Regenerates artifacts for one composite from its current live state.
#[async_trait]
pub trait Codegen: Send + Sync {
    async fn regenerate(&self, kind: CompositeKind, parent_id: DbId) -> Result<(), CodegenError>;
}

/// Does nothing. Used when no codegen service is configured.
pub struct NoopCodegen;

#[async_trait]
impl Codegen for NoopCodegen {
    async fn regenerate(&self, kind: CompositeKind, parent_id: DbId) -> Result<(), CodegenError> {
        tracing::debug!(%kind, parent_id, "Codegen disabled, skipping regeneration");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HttpCodegen
// ---------------------------------------------------------------------------

/// Calls an external codegen service with `POST {base_url}/regenerate`.
///
/// A single attempt is made per call. Regeneration is re-derivable from live
/// state, so a failed call is simply superseded by the next mutation.
pub struct HttpCodegen {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCodegen {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CodegenError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/regenerate", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Codegen for HttpCodegen {
    async fn regenerate(&self, kind: CompositeKind, parent_id: DbId) -> Result<(), CodegenError> {
        let payload = serde_json::json!({
            "kind": kind,
            "parent_id": parent_id,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CodegenError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one request with `status_line`, returning the request body.
    async fn serve_once(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];

            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length: usize = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            while buf.len() < header_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf[header_end..]).into_owned()
        });

        (format!("http://{addr}"), handle)
    }

    #[test]
    fn endpoint_joins_base_url() {
        let codegen = HttpCodegen::new("http://codegen.local/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(codegen.endpoint(), "http://codegen.local/regenerate");
    }

    #[tokio::test]
    async fn regenerate_posts_kind_and_parent() {
        let (base, server) = serve_once("HTTP/1.1 202 Accepted").await;
        let codegen = HttpCodegen::new(&base, DEFAULT_TIMEOUT).unwrap();

        codegen
            .regenerate(CompositeKind::TestCase, 41)
            .await
            .expect("2xx is success");

        let body: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(body["kind"], "test_case");
        assert_eq!(body["parent_id"], 41);
    }

    #[tokio::test]
    async fn regenerate_reports_error_status() {
        let (base, _server) = serve_once("HTTP/1.1 503 Service Unavailable").await;
        let codegen = HttpCodegen::new(&base, DEFAULT_TIMEOUT).unwrap();

        let err = codegen
            .regenerate(CompositeKind::Fixture, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, CodegenError::HttpStatus(503)));
    }

    #[tokio::test]
    async fn noop_always_succeeds() {
        assert!(NoopCodegen.regenerate(CompositeKind::TestCase, 1).await.is_ok());
    }

    #[test]
    fn error_display_http_status() {
        assert_eq!(
            CodegenError::HttpStatus(502).to_string(),
            "Codegen service returned HTTP 502"
        );
    }
}
