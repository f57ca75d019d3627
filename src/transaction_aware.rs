use async_trait::async_trait;

use crate::StoreResult;

/// Components notified once a unit-of-work session finishes.
///
/// Register an implementation with a session to defer side effects (logging,
/// cache invalidation) until the data they describe is actually durable.
#[async_trait]
pub trait TransactionAware: Send + Sync {
    /// Called after a successful transaction commit.
    async fn on_commit(&self) -> StoreResult<()>;

    /// Called after a transaction rollback.
    async fn on_rollback(&self) -> StoreResult<()>;
}
