use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;
use futures::{stream, StreamExt};
use log::{debug, warn};

use crate::adapters::SourceAdapter;
use crate::core::reward::CollectionResult;
use crate::SinkRef;

/// Clonable cancellation flag checked before each target is dispatched.
///
/// Tripping it lets in-flight retrievals finish naturally; nothing new is
/// started afterwards and the adapter is still closed once the pool drains.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Drives a target list through one adapter with a bounded worker pool.
///
/// Results come back in input order regardless of completion order (they
/// are buffered by target index, not arrival time), and one target's
/// failure never touches its neighbors.
pub struct BatchRunner {
    adapter: Arc<dyn SourceAdapter>,
    concurrency: usize,
    max_retries: u32,
    cancel: CancelToken,
}

impl BatchRunner {
    /// `None` concurrency takes the adapter's default. Zero is a
    /// configuration error and is rejected before any work starts.
    pub fn new(adapter: Arc<dyn SourceAdapter>, concurrency: Option<usize>) -> anyhow::Result<Self> {
        let concurrency = concurrency.unwrap_or_else(|| adapter.default_concurrency());
        if concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        Ok(Self {
            adapter,
            concurrency,
            max_retries: 0,
            cancel: CancelToken::new(),
        })
    }

    /// Retry budget per target, spent only on transient failures
    /// (network, session). Parse failures are final on the first attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn run(&self, targets: &[String], sink: &SinkRef) -> Vec<CollectionResult> {
        let total = targets.len();
        let finished = AtomicUsize::new(0);
        let finished = &finished;

        let indexed: Vec<(usize, String)> =
            targets.iter().cloned().enumerate().collect();

        let buffered: BTreeMap<usize, Vec<CollectionResult>> = stream::iter(indexed)
            .map(|(index, target)| async move {
                if self.cancel.is_cancelled() {
                    debug!("skipping {} after cancellation", target);
                    return (index, Vec::new());
                }

                let results = self.fetch_with_retries(&target).await;
                let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
                sink.on_progress("collect", done, total);
                (index, results)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        self.adapter.close().await;

        buffered.into_values().flatten().collect()
    }

    async fn fetch_with_retries(&self, target: &str) -> Vec<CollectionResult> {
        let mut attempt = 0;
        loop {
            let results = self.adapter.fetch(target).await;

            let transient = results.iter().any(|r| {
                matches!(r, CollectionResult::Failed { kind, .. } if kind.is_retryable())
            });
            if transient && attempt < self.max_retries && !self.cancel.is_cancelled() {
                attempt += 1;
                warn!("retrying {} (attempt {}/{})", target, attempt, self.max_retries);
                continue;
            }
            return results;
        }
    }
}
