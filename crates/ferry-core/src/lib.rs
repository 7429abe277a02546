//! ferry-core
//!
//! 耐久キューのメッセージを Product にデコードし、下流の HTTP API に転送して、
//! 転送が成功したメッセージだけをキューから削除するリレーのコア。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（QueueMessage, Product, RelayError）
//! - **ports**: 抽象化レイヤー（MessageQueue, ProductSink）
//! - **impls**: 実装（SQS, HTTP, InMemory）
//! - **app**: リレー本体（Poller, Processor）
//! - **config**: 設定の読み込みと検証
//! - **logging**: tracing の初期化

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod logging;
pub mod ports;

pub use app::{Disposition, Poller, PollerConfig, Processor, RelayCounts};
pub use config::{RelayConfig, load_config};
pub use domain::{ErrorKind, Product, QueueMessage, RelayError};
