//! ProductSink port - 下流 API への転送
//!
//! 転送先は固定のエンドポイント（`POST <base_url>/api/products`）。
//! 応答には下流が採番した `id` が含まれます。

use crate::domain::{ErrorKind, Product};
use async_trait::async_trait;

/// ForwardError は転送時のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardError {
    #[error("downstream is misconfigured: {0}")]
    Misconfigured(String),

    #[error("downstream request failed: {0}")]
    Transport(String),

    #[error("downstream responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("downstream response could not be decoded: {0}")]
    Decode(String),
}

impl ForwardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForwardError::Misconfigured(_) => ErrorKind::Precondition,
            ForwardError::Transport(_) => ErrorKind::Transient,
            ForwardError::Status { status, .. } if *status >= 500 => ErrorKind::Transient,
            ForwardError::Status { .. } | ForwardError::Decode(_) => ErrorKind::Permanent,
        }
    }
}

/// ProductSink は Product を下流へ渡して、採番済みの Product を受け取る
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductSink: Send + Sync {
    async fn create_product(&self, product: &Product) -> Result<Product, ForwardError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        let unavailable = ForwardError::Status {
            status: 503,
            body: String::new(),
        };
        let conflict = ForwardError::Status {
            status: 409,
            body: String::new(),
        };
        assert_eq!(unavailable.kind(), ErrorKind::Transient);
        assert_eq!(conflict.kind(), ErrorKind::Permanent);
        assert_eq!(
            ForwardError::Misconfigured("empty base url".into()).kind(),
            ErrorKind::Precondition
        );
    }
}
