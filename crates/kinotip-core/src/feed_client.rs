//! HTTP client for the collector's `/feed` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{ports::FeedSource, Error, Result};

#[derive(Clone, Debug)]
pub struct FeedClient {
    url: String,
    http: reqwest::Client,
}

impl FeedClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch_payload(&self) -> Result<Value> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::External(format!("feed request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::External(format!("feed body error: {e}")))?;

        match serde_json::from_slice::<Value>(&body) {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    bytes = body.len(),
                    "feed payload is not JSON, treating as empty"
                );
                Ok(Value::Null)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    /// Serve one canned HTTP response and return the feed URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let resp = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
        });
        format!("http://{addr}/feed")
    }

    #[tokio::test]
    async fn decodes_json_payload() {
        let url = serve_once("200 OK", r#"{"posts":[{"id":"1","message_id":1}]}"#).await;
        let client = FeedClient::new(url, Duration::from_secs(5)).unwrap();
        let v = client.fetch_payload().await.unwrap();
        assert_eq!(v["posts"][0]["message_id"], 1);
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let url = serve_once("500 Internal Server Error", "{}").await;
        let client = FeedClient::new(url, Duration::from_secs(5)).unwrap();
        let err = client.fetch_payload().await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 500 }));
    }

    #[tokio::test]
    async fn malformed_body_is_null() {
        let url = serve_once("200 OK", "<html>oops</html>").await;
        let client = FeedClient::new(url, Duration::from_secs(5)).unwrap();
        assert_eq!(client.fetch_payload().await.unwrap(), Value::Null);
    }
}
