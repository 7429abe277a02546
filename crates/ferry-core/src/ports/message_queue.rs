//! MessageQueue port - 受信元の耐久キュー（SQS または InMemory）
//!
//! receive で受け取ったメッセージは visibility timeout の間だけ不可視になり、
//! delete されなければキューが再配送します。

use crate::domain::{QueueMessage, ReceiptHandle};
use async_trait::async_trait;
use std::time::Duration;

/// QueueError はキュー操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("queue transport error: {0}")]
    Transport(String),

    #[error("receipt handle is not valid for any in-flight delivery: {0}")]
    InvalidReceipt(ReceiptHandle),

    #[error("no dead-letter target is configured")]
    DeadLetterUnavailable,
}

/// MessageQueue は受信・削除・デッドレターを提供
///
/// # 設計原則
/// - receive は最大 `wait` だけブロックする（long poll）。空の Vec は正常系
/// - delete は receipt で「その配送」を確定させる
/// - dead_letter はメッセージを退避させて元キューから取り除く
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError>;

    async fn dead_letter(&self, message: &QueueMessage) -> Result<(), QueueError>;
}
