//! Connectivity probe trait

use async_trait::async_trait;

/// Determines whether outbound network connectivity currently exists
///
/// Implementations are stateless: every call performs one bounded probe and
/// reports a plain boolean. Probe failures are never errors.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}
