//! Status - リレーの稼働カウンタ
//!
//! Processor と poll loop が atomics で加算し、`Poller::counts()` で
//! スナップショットとして読み出します。

use std::sync::atomic::{AtomicU64, Ordering};

/// ある時点のカウンタの値
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayCounts {
    /// 発行した receive の回数
    pub polls: u64,
    pub receive_errors: u64,
    pub received: u64,
    pub forwarded: u64,
    /// decode / 検証 / 転送 / デッドレターに失敗したメッセージ
    pub failed: u64,
    pub deleted: u64,
    pub delete_errors: u64,
    pub dead_lettered: u64,
}

#[derive(Debug, Default)]
pub(crate) struct RelayMetrics {
    polls: AtomicU64,
    receive_errors: AtomicU64,
    received: AtomicU64,
    forwarded: AtomicU64,
    failed: AtomicU64,
    deleted: AtomicU64,
    delete_errors: AtomicU64,
    dead_lettered: AtomicU64,
}

impl RelayMetrics {
    pub(crate) fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_receive_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self, n: usize) {
        self.received.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete_error(&self) {
        self.delete_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dead_lettered(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RelayCounts {
        RelayCounts {
            polls: self.polls.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            delete_errors: self.delete_errors.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
        }
    }
}
