//! Retrieval strategies for the platforms reward data is collected from.

pub mod api;
pub mod browser;

use async_trait::async_trait;

use crate::core::reward::CollectionResult;

/// A platform-specific retrieval strategy.
///
/// One `fetch` call covers one target identifier and yields zero or more
/// results: platforms that publish several reward groups per program produce
/// one record per group, platforms that publish nothing produce an empty
/// vec. Every error comes back as a `CollectionResult::Failed` value;
/// `fetch` itself never fails, so one bad target cannot take down a batch.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, target: &str) -> Vec<CollectionResult>;

    /// Worker-pool width used when the caller does not pick one explicitly.
    /// Browser-backed platforms keep this at 1; each open page costs real
    /// memory and rapid automated navigation trips bot detection.
    fn default_concurrency(&self) -> usize {
        1
    }

    /// Releases long-lived resources once the batch drains.
    async fn close(&self) {}

    fn name(&self) -> &'static str;
}
