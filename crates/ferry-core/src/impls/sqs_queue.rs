//! SqsMessageQueue - AWS SQS を MessageQueue として使う本番実装

use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};
use tracing::{info, warn};

use crate::config::QueueSettings;
use crate::domain::{MessageId, QueueMessage, ReceiptHandle};
use crate::ports::{MessageQueue, QueueError};

/// SQS の 1 回の receive で取れる上限
pub const SQS_MAX_BATCH: usize = 10;
/// SQS の long poll の上限（秒）
pub const SQS_MAX_WAIT_SECS: u64 = 20;

pub struct SqsMessageQueue {
    client: Client,
    queue_url: String,
    dead_letter_url: Option<String>,
}

impl SqsMessageQueue {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            dead_letter_url: None,
        }
    }

    pub fn with_dead_letter_url(mut self, dead_letter_url: impl Into<String>) -> Self {
        self.dead_letter_url = Some(dead_letter_url.into());
        self
    }

    /// 既定の credential chain と設定から client を組み立てる
    ///
    /// region / endpoint_url が設定されていればそれを優先（LocalStack 用）。
    pub async fn connect(settings: &QueueSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint_url.clone());
        }
        let sdk_config = loader.load().await;
        info!(queue_url = %settings.url, "SQS client configured");

        let queue = Self::new(Client::new(&sdk_config), settings.url.clone());
        match &settings.dead_letter_url {
            Some(url) => queue.with_dead_letter_url(url.clone()),
            None => queue,
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

/// SDK の Message をドメインの QueueMessage に変換
///
/// receipt handle が無いメッセージは削除できないので捨てる（再配送される）。
fn to_queue_message(message: Message) -> Option<QueueMessage> {
    let receipt = message.receipt_handle()?;
    let id = message.message_id().unwrap_or("unknown");
    let receive_count = message
        .attributes()
        .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
        .and_then(|count| count.parse::<u32>().ok())
        .unwrap_or(1);

    Some(
        QueueMessage::new(
            MessageId::new(id),
            message.body().unwrap_or_default(),
            ReceiptHandle::new(receipt),
        )
        .with_receive_count(receive_count),
    )
}

#[async_trait]
impl MessageQueue for SqsMessageQueue {
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let max_messages = max_messages.clamp(1, SQS_MAX_BATCH) as i32;
        let wait_secs = wait.as_secs().min(SQS_MAX_WAIT_SECS) as i32;

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_secs)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| QueueError::Transport(DisplayErrorContext(&e).to_string()))?;

        let messages = output.messages.unwrap_or_default();
        let received = messages.len();
        let converted: Vec<QueueMessage> =
            messages.into_iter().filter_map(to_queue_message).collect();
        if converted.len() < received {
            warn!(
                dropped = received - converted.len(),
                "Received SQS messages without a receipt handle"
            );
        }
        Ok(converted)
    }

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt.as_str())
            .send()
            .await
            .map_err(|e| QueueError::Transport(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn dead_letter(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let dead_letter_url = self
            .dead_letter_url
            .as_deref()
            .ok_or(QueueError::DeadLetterUnavailable)?;

        self.client
            .send_message()
            .queue_url(dead_letter_url)
            .message_body(message.body())
            .send()
            .await
            .map_err(|e| QueueError::Transport(DisplayErrorContext(&e).to_string()))?;

        self.delete(message.receipt()).await
    }
}
