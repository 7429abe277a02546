//! テスト用のキュー（スクリプトどおりに receive を返し、delete を記録する）

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{MessageId, QueueMessage, ReceiptHandle};
use crate::ports::{MessageQueue, QueueError};

pub(crate) fn message(n: usize, body: &str) -> QueueMessage {
    QueueMessage::new(
        MessageId::new(format!("m-{n}")),
        body,
        ReceiptHandle::new(format!("r-{n}")),
    )
}

pub(crate) fn product_body(name: &str) -> String {
    format!(r#"{{"name":"{name}","price":9.5,"quantity":2}}"#)
}

#[derive(Default)]
pub(crate) struct ScriptedQueue {
    script: Mutex<VecDeque<Result<Vec<QueueMessage>, QueueError>>>,
    fail_when_exhausted: bool,
    receive_calls: AtomicUsize,
    deleted: Mutex<Vec<ReceiptHandle>>,
    dead_lettered: Mutex<Vec<MessageId>>,
    fail_deletes: AtomicBool,
    delay: Duration,
}

impl ScriptedQueue {
    /// スクリプトが尽きたら `wait` だけ待って空を返す
    pub(crate) fn new(script: Vec<Result<Vec<QueueMessage>, QueueError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// receive が常に失敗する
    pub(crate) fn always_failing() -> Self {
        Self {
            fail_when_exhausted: true,
            ..Self::default()
        }
    }

    /// 各 receive が結果を返すまでの遅延（処理中の receive を再現する）
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn deleted(&self) -> Vec<ReceiptHandle> {
        self.deleted.lock().unwrap().clone()
    }

    pub(crate) fn dead_lettered(&self) -> Vec<MessageId> {
        self.dead_lettered.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageQueue for ScriptedQueue {
    async fn receive(
        &self,
        _max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None if self.fail_when_exhausted => {
                Err(QueueError::Transport("queue unavailable".to_string()))
            }
            None => {
                tokio::time::sleep(wait).await;
                Ok(Vec::new())
            }
        }
    }

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(QueueError::Transport("delete failed".to_string()));
        }
        self.deleted.lock().unwrap().push(receipt.clone());
        Ok(())
    }

    async fn dead_letter(&self, message: &QueueMessage) -> Result<(), QueueError> {
        self.dead_lettered.lock().unwrap().push(message.id().clone());
        Ok(())
    }
}
