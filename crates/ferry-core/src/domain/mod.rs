//! Domain - リレーが扱うドメインモデル
//!
//! - **message**: キューから受信したメッセージ（QueueMessage, MessageId, ReceiptHandle）
//! - **product**: 下流 API に転送するレコード（Product）と検証
//! - **errors**: リレーのエラー分類（RelayError, ErrorKind）

pub mod errors;
pub mod message;
pub mod product;

pub use self::errors::{ErrorKind, RelayError};
pub use self::message::{MessageId, QueueMessage, ReceiptHandle};
pub use self::product::{Product, ProductPayload, ValidationError};
