//! Domain events recorded during a unit of work.
//!
//! Repositories push events while the transaction is open. The log is a
//! [`TransactionAware`] observer: events are emitted through `tracing` only
//! after commit and are silently discarded on rollback.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::{StoreResult, TransactionAware};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    RecipeCreated { recipe_id: i64, author_id: i64 },
    RecipeUpdated { recipe_id: i64 },
    RecipeDeleted { recipe_id: i64, cart_entries: u64, favorites: u64 },
    Favorited { user_id: i64, recipe_id: i64 },
    Unfavorited { user_id: i64, recipe_id: i64 },
    AddedToCart { user_id: i64, recipe_id: i64 },
    RemovedFromCart { user_id: i64, recipe_id: i64 },
    Subscribed { subscriber_id: i64, author_id: i64 },
    Unsubscribed { subscriber_id: i64, author_id: i64 },
}

#[derive(Debug, Default)]
pub struct EventLog {
    pending: RwLock<Vec<DomainEvent>>,
    published: RwLock<u64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: DomainEvent) {
        self.pending.write().push(event);
    }

    pub fn pending(&self) -> Vec<DomainEvent> {
        self.pending.read().clone()
    }

    /// Number of events emitted by commits so far.
    pub fn published(&self) -> u64 {
        *self.published.read()
    }
}

#[async_trait]
impl TransactionAware for EventLog {
    async fn on_commit(&self) -> StoreResult<()> {
        let events = std::mem::take(&mut *self.pending.write());
        for event in &events {
            info!(?event, "committed");
        }
        *self.published.write() += events.len() as u64;
        Ok(())
    }

    async fn on_rollback(&self) -> StoreResult<()> {
        let discarded = std::mem::take(&mut *self.pending.write());
        debug!(count = discarded.len(), "discarded events after rollback");
        Ok(())
    }
}
