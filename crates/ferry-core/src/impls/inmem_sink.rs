//! InMemoryProductSink - 開発用・テスト用の下流
//!
//! 転送された Product を順番に記録し、1 から連番で id を採番します。

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::Product;
use crate::ports::{ForwardError, ProductSink};

#[derive(Default)]
struct SinkState {
    next_id: i64,
    created: Vec<Product>,
    failing_forwards: usize,
    calls: usize,
}

/// InMemoryProductSink は ProductSink の InMemory 実装
#[derive(Default)]
pub struct InMemoryProductSink {
    state: Mutex<SinkState>,
}

impl InMemoryProductSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 次の `n` 回の転送を 503 で失敗させる
    pub async fn fail_next_forwards(&self, n: usize) {
        self.state.lock().await.failing_forwards = n;
    }

    /// 採番済みの Product（転送成功順）
    pub async fn created(&self) -> Vec<Product> {
        self.state.lock().await.created.clone()
    }

    /// 失敗を含む転送の試行回数
    pub async fn calls(&self) -> usize {
        self.state.lock().await.calls
    }
}

#[async_trait]
impl ProductSink for InMemoryProductSink {
    async fn create_product(&self, product: &Product) -> Result<Product, ForwardError> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        if state.failing_forwards > 0 {
            state.failing_forwards -= 1;
            return Err(ForwardError::Status {
                status: 503,
                body: "injected forward failure".to_string(),
            });
        }

        state.next_id += 1;
        let mut created = product.clone();
        created.id = Some(state.next_id);
        state.created.push(created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let sink = InMemoryProductSink::new();
        let a = sink
            .create_product(&Product::new("a", Decimal::ONE, 1))
            .await
            .unwrap();
        let b = sink
            .create_product(&Product::new("b", Decimal::ONE, 2))
            .await
            .unwrap();
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
        assert_eq!(sink.created().await.len(), 2);
    }

    #[tokio::test]
    async fn injected_failures_are_not_recorded() {
        let sink = InMemoryProductSink::new();
        sink.fail_next_forwards(1).await;

        let err = sink
            .create_product(&Product::new("a", Decimal::ONE, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::Status { status: 503, .. }));

        sink.create_product(&Product::new("a", Decimal::ONE, 1))
            .await
            .unwrap();
        assert_eq!(sink.calls().await, 2);
        assert_eq!(sink.created().await[0].id, Some(1));
    }
}
