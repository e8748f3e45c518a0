//! Result-cache invalidation seam.

use async_trait::async_trait;

use crate::types::TargetParams;

/// Cache of fetched instances held by the surrounding application.
///
/// The scheduler only ever invalidates: once a pass delivers pending actions,
/// the cached entries for the affected targets are dropped in one bulk call.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Drop every cached entry associated with the given targets.
    async fn invalidate(&self, targets: &[TargetParams]);
}

/// A cache that ignores invalidations, for hosts without a result cache.
#[derive(Debug, Default)]
pub struct NoopCache;

#[async_trait]
impl ResultCache for NoopCache {
    async fn invalidate(&self, _targets: &[TargetParams]) {}
}
