use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Exclusive handle on the session transaction slot, held for the duration of one query.
pub type TxGuard<'a> = MutexGuard<'a, Option<Transaction<'static, Postgres>>>;

/// Executor shares one request transaction between the repositories of a store.
///
/// Cloning is cheap; every clone points at the same transaction. Once the
/// owning session commits or rolls back the slot is empty and further queries
/// fail with `PoolClosed`.
#[derive(Clone, Debug)]
pub struct Executor {
    tx: Arc<Mutex<Option<Transaction<'static, Postgres>>>>,
}

impl Executor {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Locks the transaction slot for a query.
    ///
    /// Use it as
    /// `let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;` then
    /// `.execute(&mut **tx)`. The guard must not be held across a call that
    /// locks again.
    pub async fn lock(&self) -> TxGuard<'_> {
        self.tx.lock().await
    }

    /// Takes ownership of the transaction, leaving None in its place.
    pub(crate) async fn take_transaction(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.tx.lock().await.take().ok_or(sqlx::Error::PoolClosed)
    }
}
