//! QueueMessage - キューから受信した 1 件の配送
//!
//! 受信後は不変。receipt は「その受信」にだけ有効なハンドルで、
//! 同じメッセージが再配送されると別の receipt が発行されます。

use std::fmt;

/// キュー側が採番するメッセージ ID（ログの相関付けにのみ使う）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 1 回の受信に紐づく削除用ハンドル
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// キューから受信したメッセージ
///
/// # フィールド
/// - id: 相関用 ID
/// - body: JSON テキスト（Product としてデコードされる）
/// - receipt: delete / dead_letter に使う受信ハンドル
/// - receive_count: これまでの受信回数（初回 = 1）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    id: MessageId,
    body: String,
    receipt: ReceiptHandle,
    receive_count: u32,
}

impl QueueMessage {
    pub fn new(id: MessageId, body: impl Into<String>, receipt: ReceiptHandle) -> Self {
        Self {
            id,
            body: body.into(),
            receipt,
            receive_count: 1,
        }
    }

    pub fn with_receive_count(mut self, receive_count: u32) -> Self {
        self.receive_count = receive_count;
        self
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn receipt(&self) -> &ReceiptHandle {
        &self.receipt
    }

    pub fn receive_count(&self) -> u32 {
        self.receive_count
    }
}
