//! Poller - バックグラウンドの受信ループとそのライフサイクル
//!
//! # フロー
//! 1. MessageQueue::receive() で最大 batch_size 件を long poll
//! 2. 空なら即座に次の receive
//! 3. 受信順に 1 件ずつ Processor に渡す（並列化しない）
//! 4. receive が失敗したら retry_backoff だけ待って再試行（回数上限なし）
//!
//! # 停止
//! stop は「次の receive / 次のメッセージ」を始めさせないだけで、
//! 処理中の receive やメッセージ、下流呼び出しは中断しません。
//! 停止までの遅れは最大で long poll 1 回分とメッセージ 1 件分です。
//! backoff の待機だけは停止シグナルですぐに抜けます。

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::processor::Processor;
use super::status::{RelayCounts, RelayMetrics};
use crate::ports::{MessageQueue, ProductSink};

/// 受信ループの定数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// 1 回の receive で要求する最大件数
    pub batch_size: usize,
    /// long poll の待ち時間
    pub wait_time: Duration,
    /// receive 失敗後の固定 backoff
    pub retry_backoff: Duration,
    /// None: 再配送の上限はキュー側の設定に任せる
    pub max_receive_count: Option<u32>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            wait_time: Duration::from_secs(20),
            retry_backoff: Duration::from_secs(5),
            max_receive_count: None,
        }
    }
}

/// 起動中のループ 1 本分
///
/// `stop_tx` はループごとに作り直すので、停止要求済みのループが
/// 後から来た start() で生き返ることはない。
struct LoopHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Poller は受信ループを 1 本だけ動かす
///
/// - `start` / `init`: 起動（起動済みなら何もしない）
/// - `stop`: 停止を要求して即座に戻る（未起動なら何もしない）
/// - `shutdown`: 停止を要求し、処理中のメッセージが終わるまで待つ
///
/// Poller を drop するとループにも停止が伝わります。
pub struct Poller {
    queue: Arc<dyn MessageQueue>,
    processor: Arc<Processor>,
    config: PollerConfig,
    handle: Mutex<Option<LoopHandle>>,
    metrics: Arc<RelayMetrics>,
}

impl Poller {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        sink: Arc<dyn ProductSink>,
        config: PollerConfig,
    ) -> Self {
        let metrics = Arc::new(RelayMetrics::default());
        let processor = Processor::new(Arc::clone(&queue), sink)
            .with_max_receive_count(config.max_receive_count)
            .with_metrics(Arc::clone(&metrics));
        Self {
            queue,
            processor: Arc::new(processor),
            config,
            handle: Mutex::new(None),
            metrics,
        }
    }

    /// ループと同じ Processor（直接呼び出して失敗を観測したい場合に使う）
    pub fn processor(&self) -> Arc<Processor> {
        Arc::clone(&self.processor)
    }

    /// ループが起動済みで、まだ終了していないか
    pub fn is_running(&self) -> bool {
        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        handle.as_ref().is_some_and(|h| !h.join.is_finished())
    }

    pub fn counts(&self) -> RelayCounts {
        self.metrics.snapshot()
    }

    /// 受信ループを起動する。Tokio runtime の中から呼ぶこと
    pub fn start(&self) {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = handle.as_ref() {
            if !current.join.is_finished() {
                debug!("Poller already running; start ignored");
                return;
            }
            // stop されずに終わったループ（panic など）は起動し直す
            warn!("Poll loop exited without a stop request; restarting");
        }

        info!(
            batch_size = self.config.batch_size,
            wait_secs = self.config.wait_time.as_secs(),
            "Starting poller"
        );
        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(poll_loop(
            Arc::clone(&self.queue),
            Arc::clone(&self.processor),
            self.config.clone(),
            Arc::clone(&self.metrics),
            stop_rx,
        ));
        *handle = Some(LoopHandle { stop_tx, join });
        info!("Poller started");
    }

    /// プロセス起動時の入口（`start` と同じ）
    pub fn init(&self) {
        self.start();
    }

    /// 停止を要求する。どのスレッドから何度呼んでもよい
    pub fn stop(&self) {
        if self.signal_stop().is_some() {
            info!("Poller stop requested");
        }
    }

    /// プロセス終了時の入口。停止を要求し、ループの終了を待つ
    pub async fn shutdown(&self) {
        let Some(join) = self.signal_stop() else {
            return;
        };
        info!("Shutting down poller");
        if let Err(e) = join.await {
            error!(error = %e, "Poll loop terminated abnormally");
        }
        info!("Poller shut down");
    }

    fn signal_stop(&self) -> Option<JoinHandle<()>> {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        let LoopHandle { stop_tx, join } = handle.take()?;
        // 受信側が既に終わっていても問題ない
        let _ = stop_tx.send(true);
        Some(join)
    }
}

async fn poll_loop(
    queue: Arc<dyn MessageQueue>,
    processor: Arc<Processor>,
    config: PollerConfig,
    metrics: Arc<RelayMetrics>,
    mut stop_rx: watch::Receiver<bool>,
) {
    info!("Poll loop started");
    loop {
        if stop_requested(&stop_rx) {
            break;
        }

        metrics.record_poll();
        debug!("Polling queue for messages");
        // receive は中断しない。受信済みのバッチは少なくとも先頭の 1 件を処理する
        let received = queue.receive(config.batch_size, config.wait_time).await;

        match received {
            Ok(batch) if batch.is_empty() => {
                debug!("No messages received");
            }
            Ok(batch) => {
                metrics.record_received(batch.len());
                debug!(count = batch.len(), "Received messages");
                for (index, message) in batch.iter().enumerate() {
                    if index > 0 && stop_requested(&stop_rx) {
                        info!(
                            remaining = batch.len() - index,
                            "Stop requested; remaining messages are left for redelivery"
                        );
                        break;
                    }
                    processor.process_logged(message).await;
                }
            }
            Err(err) => {
                metrics.record_receive_error();
                error!(
                    error = %err,
                    backoff_ms = config.retry_backoff.as_millis() as u64,
                    "Error polling queue; retrying after backoff"
                );
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = tokio::time::sleep(config.retry_backoff) => {}
                }
            }
        }
    }
    info!("Poll loop stopped");
}

/// 停止要求の送信、または Sender の drop（Poller の drop）
fn stop_requested(stop_rx: &watch::Receiver<bool>) -> bool {
    *stop_rx.borrow() || stop_rx.has_changed().is_err()
}
