//! InMemoryMessageQueue - 開発用・テスト用のキュー
//!
//! 外部キューの配送セマンティクスを再現します：
//! - long poll（`wait` まで到着を待つ）
//! - visibility timeout（受信後は不可視、delete されなければ再出現）
//! - receive_count（再配送ごとに加算）
//! - デッドレター（退避されたメッセージの一覧）

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use ulid::Ulid;

use crate::domain::{MessageId, QueueMessage, ReceiptHandle};
use crate::ports::{MessageQueue, QueueError};

/// 既定の visibility timeout（SQS の既定値と同じ 30 秒）
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// キュー内の 1 メッセージ
#[derive(Debug, Clone)]
struct StoredMessage {
    id: MessageId,
    body: String,
    receive_count: u32,
    visible_at: Instant,
    /// 現在の配送の receipt（未受信なら None）
    receipt: Option<ReceiptHandle>,
}

struct InMemoryQueueState {
    /// 到着順
    messages: VecDeque<StoredMessage>,
    dead_letters: Vec<QueueMessage>,
    /// 残りの「失敗させる receive」回数
    failing_receives: usize,
    receive_calls: u64,
}

impl InMemoryQueueState {
    /// 可視なメッセージを最大 `max` 件取り出して in-flight にする
    fn take_visible(&mut self, max: usize, visibility_timeout: Duration) -> Vec<QueueMessage> {
        let now = Instant::now();
        let mut batch = Vec::new();
        for stored in self.messages.iter_mut() {
            if batch.len() >= max {
                break;
            }
            if stored.visible_at > now {
                continue;
            }
            let receipt = ReceiptHandle::new(format!("{}-{}", stored.id, Ulid::new()));
            stored.receive_count += 1;
            stored.visible_at = now + visibility_timeout;
            stored.receipt = Some(receipt.clone());
            batch.push(
                QueueMessage::new(stored.id.clone(), stored.body.clone(), receipt)
                    .with_receive_count(stored.receive_count),
            );
        }
        batch
    }

    /// 次にメッセージが可視になる時刻
    fn next_visible_at(&self) -> Option<Instant> {
        self.messages.iter().map(|m| m.visible_at).min()
    }

    fn position_of(&self, receipt: &ReceiptHandle) -> Option<usize> {
        self.messages
            .iter()
            .position(|m| m.receipt.as_ref() == Some(receipt))
    }
}

/// InMemoryMessageQueue は MessageQueue の InMemory 実装
///
/// # 使用例
/// ```ignore
/// let queue = InMemoryMessageQueue::new();
/// queue.send(r#"{"name":"Widget","price":1.5,"quantity":3}"#).await;
/// let batch = queue.receive(10, Duration::from_secs(1)).await?;
/// ```
pub struct InMemoryMessageQueue {
    state: Arc<Mutex<InMemoryQueueState>>,
    notify: Arc<Notify>,
    visibility_timeout: Duration,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::with_visibility_timeout(DEFAULT_VISIBILITY_TIMEOUT)
    }

    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryQueueState {
                messages: VecDeque::new(),
                dead_letters: Vec::new(),
                failing_receives: 0,
                receive_calls: 0,
            })),
            notify: Arc::new(Notify::new()),
            visibility_timeout,
        }
    }

    /// メッセージを送信（即座に可視）
    pub async fn send(&self, body: impl Into<String>) -> MessageId {
        let id = MessageId::new(Ulid::new().to_string());
        {
            let mut state = self.state.lock().await;
            state.messages.push_back(StoredMessage {
                id: id.clone(),
                body: body.into(),
                receive_count: 0,
                visible_at: Instant::now(),
                receipt: None,
            });
        }
        self.notify.notify_one();
        id
    }

    /// 次の `n` 回の receive をトランスポートエラーにする
    pub async fn fail_next_receives(&self, n: usize) {
        self.state.lock().await.failing_receives = n;
    }

    /// キューに残っているメッセージ数（in-flight を含む）
    pub async fn len(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn dead_letters(&self) -> Vec<QueueMessage> {
        self.state.lock().await.dead_letters.clone()
    }

    /// これまでの receive 呼び出し回数（失敗を含む）
    pub async fn receive_calls(&self) -> u64 {
        self.state.lock().await.receive_calls
    }
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let deadline = Instant::now() + wait;
        {
            let mut state = self.state.lock().await;
            state.receive_calls += 1;
            if state.failing_receives > 0 {
                state.failing_receives -= 1;
                return Err(QueueError::Transport("injected receive failure".to_string()));
            }
        }
        if max_messages == 0 {
            return Ok(Vec::new());
        }

        loop {
            let next_wake = {
                let mut state = self.state.lock().await;
                let batch = state.take_visible(max_messages, self.visibility_timeout);
                if !batch.is_empty() {
                    return Ok(batch);
                }
                state.next_visible_at()
            };

            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            let wake_at = next_wake.map_or(deadline, |at| at.min(deadline));

            // send 時の通知、再可視化、long poll の期限のいずれかで起きる
            tokio::select! {
                _ = self.notify.notified() => {},
                _ = tokio::time::sleep_until(wake_at) => {},
            }
        }
    }

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let index = state
            .position_of(receipt)
            .ok_or_else(|| QueueError::InvalidReceipt(receipt.clone()))?;
        state.messages.remove(index);
        Ok(())
    }

    async fn dead_letter(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let index = state
            .position_of(message.receipt())
            .ok_or_else(|| QueueError::InvalidReceipt(message.receipt().clone()))?;
        state.messages.remove(index);
        state.dead_letters.push(message.clone());
        Ok(())
    }
}
