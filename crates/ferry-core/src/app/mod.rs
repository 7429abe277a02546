//! App - ports を組み合わせたリレー本体
//!
//! # 主要コンポーネント
//! - **Poller**: 受信ループのライフサイクル（start / stop / shutdown）
//! - **Processor**: 1 メッセージの decode → 転送 → 削除
//! - **RelayCounts**: 稼働カウンタのスナップショット

pub mod poller;
pub mod processor;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use self::poller::{Poller, PollerConfig};
pub use self::processor::{Disposition, Processor};
pub use self::status::RelayCounts;
