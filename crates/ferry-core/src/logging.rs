//! Logging - tracing subscriber の初期化
//!
//! `RUST_LOG` が設定されていればそれを優先し、無ければ設定ファイルの
//! `log.level` を使います（例: `RUST_LOG=ferry_core=debug,aws_config=warn`）。

use tracing_subscriber::EnvFilter;

/// fmt subscriber を登録する。既に登録済みなら何もしない
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 設定値をフィルタの directive に正規化する。不明な値は info
fn level_directive(level: &str) -> &'static str {
    match level.trim().to_lowercase().as_str() {
        "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    }
}
