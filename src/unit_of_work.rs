use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{Executor, StoreError, StoreResult, TransactionAware};

/// Factory for request-scoped transaction sessions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Session: UnitOfWorkSession;

    /// Begin a new transaction session.
    async fn begin(&self) -> StoreResult<Self::Session>;
}

/// A single database transaction shared by every repository serving a request.
#[async_trait]
pub trait UnitOfWorkSession: Send + Sync {
    /// Get the executor for this session (provides access to the transaction).
    fn executor(&self) -> &Executor;

    /// Register a component that needs to be notified of transaction events.
    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>);

    /// Commit the transaction and notify all registered observers.
    async fn commit(self) -> StoreResult<()>;

    /// Rollback the transaction and notify all registered observers.
    async fn rollback(self) -> StoreResult<()>;
}

pub struct PostgresUnitOfWork {
    pool: PgPool,
}

impl PostgresUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    type Session = PostgresUnitOfWorkSession;

    async fn begin(&self) -> StoreResult<Self::Session> {
        let tx = self.pool.begin().await?;
        Ok(PostgresUnitOfWorkSession::new(tx))
    }
}

pub struct PostgresUnitOfWorkSession {
    executor: Executor,
    observers: RwLock<Vec<Arc<dyn TransactionAware>>>,
}

impl PostgresUnitOfWorkSession {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            executor: Executor::new(tx),
            observers: RwLock::new(Vec::new()),
        }
    }

    fn observers(&self) -> Vec<Arc<dyn TransactionAware>> {
        self.observers.read().clone()
    }
}

#[async_trait]
impl UnitOfWorkSession for PostgresUnitOfWorkSession {
    fn executor(&self) -> &Executor {
        &self.executor
    }

    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.write().push(observer);
    }

    async fn commit(self) -> StoreResult<()> {
        let tx = self.executor.take_transaction().await?;
        tx.commit()
            .await
            .map_err(|e| StoreError::CommitFailed(e.to_string()))?;
        debug!("transaction committed");

        for observer in self.observers() {
            if let Err(e) = observer.on_commit().await {
                // The write is already durable at this point; observer failures are only logged.
                warn!("commit observer failed: {e}");
            }
        }
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        let tx = self.executor.take_transaction().await?;
        tx.rollback()
            .await
            .map_err(|e| StoreError::RollbackFailed(e.to_string()))?;
        debug!("transaction rolled back");

        for observer in self.observers() {
            observer.on_rollback().await?;
        }
        Ok(())
    }
}
