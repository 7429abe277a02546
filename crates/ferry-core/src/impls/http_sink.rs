//! HttpProductApi - 下流 REST API への転送（reqwest）
//!
//! `POST <base_url>/api/products` に JSON を送り、応答の JSON を
//! 採番済みの Product としてデコードします。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::domain::Product;
use crate::ports::{ForwardError, ProductSink};

/// 転送先のパス（base_url からの相対）
pub const PRODUCTS_PATH: &str = "/api/products";

pub struct HttpProductApi {
    client: Client,
    endpoint: Url,
}

impl HttpProductApi {
    /// base_url を検証して作成
    ///
    /// 空・不正な URL・http(s) 以外のスキームは `ForwardError::Misconfigured`。
    /// これは前提違反なので、リトライしても回復しません。
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ForwardError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ForwardError::Misconfigured(
                "downstream base url is empty".to_string(),
            ));
        }

        let endpoint = Url::parse(&format!("{trimmed}{PRODUCTS_PATH}")).map_err(|e| {
            ForwardError::Misconfigured(format!("invalid downstream base url `{base_url}`: {e}"))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ForwardError::Misconfigured(format!(
                "unsupported scheme `{}` in downstream base url",
                endpoint.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForwardError::Misconfigured(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ProductSink for HttpProductApi {
    async fn create_product(&self, product: &Product) -> Result<Product, ForwardError> {
        debug!(endpoint = %self.endpoint, name = %product.name, "Forwarding product downstream");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(product)
            .send()
            .await
            .map_err(|e| ForwardError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ForwardError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), body = %body, "Downstream responded");

        if !status.is_success() {
            return Err(ForwardError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ForwardError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.trim().eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    /// 1 リクエストだけ応答する HTTP サーバ。受信したリクエスト全文を返す
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8(request).unwrap()
        });
        (format!("http://{addr}"), handle)
    }

    fn widget() -> Product {
        Product::new("Widget", Decimal::from_str("19.99").unwrap(), 5).with_description("blue")
    }

    #[test]
    fn endpoint_is_built_from_base_url() {
        let api = HttpProductApi::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.endpoint().as_str(), "http://localhost:8080/api/products");
    }

    #[test]
    fn misconfigured_base_urls_are_rejected() {
        for base_url in ["", "   ", "not a url", "ftp://example.com"] {
            let result = HttpProductApi::new(base_url, Duration::from_secs(1));
            assert!(
                matches!(result, Err(ForwardError::Misconfigured(_))),
                "{base_url:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn posts_json_and_decodes_assigned_id() {
        let (base_url, server) = serve_once(
            "201 Created",
            r#"{"id":7,"name":"Widget","description":"blue","price":19.99,"quantity":5}"#,
        )
        .await;
        let api = HttpProductApi::new(&base_url, Duration::from_secs(5)).unwrap();

        let created = api.create_product(&widget()).await.unwrap();
        assert_eq!(created.id, Some(7));
        assert_eq!(created.name, "Widget");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/products HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let sent: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({ "name": "Widget", "description": "blue", "price": 19.99, "quantity": 5 })
        );
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let (base_url, server) = serve_once("400 Bad Request", r#"{"error":"price"}"#).await;
        let api = HttpProductApi::new(&base_url, Duration::from_secs(5)).unwrap();

        let err = api.create_product(&widget()).await.unwrap_err();
        assert_eq!(
            err,
            ForwardError::Status {
                status: 400,
                body: r#"{"error":"price"}"#.to_string()
            }
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn undecodable_response_is_a_decode_error() {
        let (base_url, server) = serve_once("200 OK", "ok").await;
        let api = HttpProductApi::new(&base_url, Duration::from_secs(5)).unwrap();

        let err = api.create_product(&widget()).await.unwrap_err();
        assert!(matches!(err, ForwardError::Decode(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_downstream_is_a_transport_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let api = HttpProductApi::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();

        let err = api.create_product(&widget()).await.unwrap_err();
        assert!(matches!(err, ForwardError::Transport(_)));
    }
}
