//! ferry - SQS のメッセージを下流の Product API に中継する常駐プロセス
//!
//! 1. 設定を読み込む（`config/default.*` と `FERRY_*` 環境変数）
//! 2. SQS と HTTP のアダプタを組み立てて Poller を起動する
//! 3. Ctrl-C / SIGTERM で停止を要求し、処理中のメッセージが終わるのを待つ

use std::process::ExitCode;
use std::sync::Arc;

use ferry_core::impls::{HttpProductApi, SqsMessageQueue};
use ferry_core::{Poller, load_config, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            // logging は設定から初期化するので、ここでは stderr に出すしかない
            eprintln!("ferry: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&cfg.log.level);

    let sink = match HttpProductApi::new(&cfg.downstream.base_url, cfg.downstream.timeout()) {
        Ok(sink) => sink,
        Err(e) => {
            error!(error = %e, "Invalid downstream configuration");
            return ExitCode::FAILURE;
        }
    };
    let queue = SqsMessageQueue::connect(&cfg.queue).await;

    info!(
        queue_url = %queue.queue_url(),
        endpoint = %sink.endpoint(),
        "Starting relay"
    );
    let poller = Poller::new(Arc::new(queue), Arc::new(sink), cfg.poller_config());
    poller.init();

    wait_for_signal().await;
    info!("Shutdown requested; waiting for in-flight message");
    poller.shutdown().await;

    let counts = poller.counts();
    info!(
        forwarded = counts.forwarded,
        failed = counts.failed,
        deleted = counts.deleted,
        dead_lettered = counts.dead_lettered,
        "Relay stopped"
    );
    ExitCode::SUCCESS
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {},
                _ = term.recv() => {},
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler; Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
