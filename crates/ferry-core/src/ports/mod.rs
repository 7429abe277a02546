//! Ports - 外部システムへの抽象化レイヤー
//!
//! リレーのコアは 2 つの外部協力者にしか依存しません。
//! 各 trait の裏側（SQS, HTTP API, InMemory）は impls に置きます。
//!
//! # 設計原則
//! - キューは at-least-once 配送。再配送の責任はキュー側にある
//! - 下流 API はレコードの永続化と冪等性に責任を持つ

pub mod message_queue;
pub mod product_sink;

pub use self::message_queue::{MessageQueue, QueueError};
pub use self::product_sink::{ForwardError, ProductSink};
