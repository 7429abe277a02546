//! Processor - 1 メッセージの decode → 検証 → 転送 → 削除
//!
//! # 呼び出し方は 2 通り
//! - `process`: 失敗を `RelayError` として返す（直接呼び出す側が失敗を観測したいとき）
//! - `process_logged`: 失敗はログに残して捨てる（バッチループ用）
//!
//! どちらも同じ `process` を通るので、decode / 転送 / 削除の手順は 1 か所だけです。
//!
//! # 削除のタイミング
//! 削除は転送が成功したあとにだけ行います。削除に失敗しても処理は成功扱いで、
//! キューが再配送すれば同じレコードがもう一度転送されます（at-least-once）。

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::status::{RelayCounts, RelayMetrics};
use crate::domain::{Product, ProductPayload, QueueMessage, RelayError};
use crate::ports::{MessageQueue, ProductSink};

/// 処理に成功したメッセージの行き先
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// 下流に転送された（id は下流が採番）
    Forwarded(Product),
    /// 受信回数の上限を超えたのでデッドレターに退避した
    DeadLettered,
}

pub struct Processor {
    queue: Arc<dyn MessageQueue>,
    sink: Arc<dyn ProductSink>,
    max_receive_count: Option<u32>,
    metrics: Arc<RelayMetrics>,
}

impl Processor {
    pub fn new(queue: Arc<dyn MessageQueue>, sink: Arc<dyn ProductSink>) -> Self {
        Self {
            queue,
            sink,
            max_receive_count: None,
            metrics: Arc::new(RelayMetrics::default()),
        }
    }

    /// 受信回数がこれを超えたメッセージは転送せずにデッドレターへ
    pub fn with_max_receive_count(mut self, max_receive_count: Option<u32>) -> Self {
        self.max_receive_count = max_receive_count;
        self
    }

    pub(crate) fn with_metrics(mut self, metrics: Arc<RelayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn counts(&self) -> RelayCounts {
        self.metrics.snapshot()
    }

    /// 1 メッセージを処理し、失敗はそのまま返す
    pub async fn process(&self, message: &QueueMessage) -> Result<Disposition, RelayError> {
        debug!(message_id = %message.id(), body = %message.body(), "Processing message");

        match self.relay(message).await {
            Ok(disposition) => Ok(disposition),
            Err(err) => {
                self.metrics.record_failed();
                error!(
                    message_id = %message.id(),
                    receive_count = message.receive_count(),
                    kind = ?err.kind(),
                    error = %err,
                    "Failed to process message; leaving it for redelivery"
                );
                Err(err)
            }
        }
    }

    /// バッチ用：失敗は `process` がログに残すので、ここでは成否だけを返す
    pub async fn process_logged(&self, message: &QueueMessage) -> bool {
        self.process(message).await.is_ok()
    }

    async fn relay(&self, message: &QueueMessage) -> Result<Disposition, RelayError> {
        if let Some(max) = self.max_receive_count
            && message.receive_count() > max
        {
            warn!(
                message_id = %message.id(),
                receive_count = message.receive_count(),
                max_receive_count = max,
                "Receive count exceeded; moving message to dead-letter queue"
            );
            self.queue.dead_letter(message).await?;
            self.metrics.record_dead_lettered();
            return Ok(Disposition::DeadLettered);
        }

        let payload =
            ProductPayload::decode(message.body()).map_err(|source| RelayError::Decode {
                message_id: message.id().clone(),
                source,
            })?;
        let product = Product::try_from(payload).map_err(|source| RelayError::Invalid {
            message_id: message.id().clone(),
            source,
        })?;

        let created = self
            .sink
            .create_product(&product)
            .await
            .map_err(|source| RelayError::Forward {
                message_id: message.id().clone(),
                source,
            })?;
        self.metrics.record_forwarded();

        match self.queue.delete(message.receipt()).await {
            Ok(()) => {
                self.metrics.record_deleted();
                info!(
                    message_id = %message.id(),
                    product_id = ?created.id,
                    "Message relayed and deleted from queue"
                );
            }
            Err(err) => {
                self.metrics.record_delete_error();
                warn!(
                    message_id = %message.id(),
                    product_id = ?created.id,
                    error = %err,
                    "Forwarded but failed to delete message; it may be redelivered"
                );
            }
        }

        Ok(Disposition::Forwarded(created))
    }
}
