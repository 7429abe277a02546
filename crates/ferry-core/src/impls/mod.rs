//! Impls - ports の実装
//!
//! # 本番用
//! - **SqsMessageQueue**: AWS SQS
//! - **HttpProductApi**: 下流 REST API（reqwest）
//!
//! # 開発用・テスト用
//! - **InMemoryMessageQueue**: visibility timeout と再配送を再現するキュー
//! - **InMemoryProductSink**: id を採番して記録するだけの下流

pub mod http_sink;
pub mod inmem_queue;
pub mod inmem_sink;
pub mod sqs_queue;

pub use self::http_sink::HttpProductApi;
pub use self::inmem_queue::InMemoryMessageQueue;
pub use self::inmem_sink::InMemoryProductSink;
pub use self::sqs_queue::SqsMessageQueue;
