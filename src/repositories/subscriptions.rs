use std::sync::Arc;

use crate::{
    events::{DomainEvent, EventLog},
    models::Subscription,
    Executor, StoreError, StoreResult,
};

pub struct SubscriptionRepository {
    executor: Executor,
    events: Arc<EventLog>,
}

impl SubscriptionRepository {
    pub fn new(executor: Executor, events: Arc<EventLog>) -> Self {
        Self { executor, events }
    }

    pub async fn subscribe(&self, subscriber_id: i64, author_id: i64) -> StoreResult<Subscription> {
        if subscriber_id == author_id {
            return Err(StoreError::Invalid("You cannot subscribe to yourself".to_string()));
        }

        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let author_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(author_id)
            .fetch_one(&mut **tx)
            .await?;
        if !author_exists {
            return Err(StoreError::NotFound("user"));
        }

        let row = sqlx::query(
            "WITH created AS ( \
                 INSERT INTO subscriptions (subscriber_id, author_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING RETURNING id, subscriber_id, author_id) \
             SELECT c.id, s.username AS subscriber, a.username AS author FROM created c \
             JOIN users s ON s.id = c.subscriber_id JOIN users a ON a.id = c.author_id",
        )
        .bind(subscriber_id)
        .bind(author_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::Conflict("You are already subscribed to this author".to_string()))?;

        self.events.record(DomainEvent::Subscribed {
            subscriber_id,
            author_id,
        });
        Ok(Subscription::from_row(&row)?)
    }

    pub async fn unsubscribe(&self, subscriber_id: i64, author_id: i64) -> StoreResult<()> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let author_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(author_id)
            .fetch_one(&mut **tx)
            .await?;
        if !author_exists {
            return Err(StoreError::NotFound("user"));
        }

        let deleted = sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2")
            .bind(subscriber_id)
            .bind(author_id)
            .execute(&mut **tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound("subscription"));
        }

        self.events.record(DomainEvent::Unsubscribed {
            subscriber_id,
            author_id,
        });
        Ok(())
    }

    pub async fn is_subscribed(&self, subscriber_id: i64, author_id: i64) -> StoreResult<bool> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2)",
        )
        .bind(subscriber_id)
        .bind(author_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(found)
    }

    pub async fn list_for(&self, subscriber_id: i64) -> StoreResult<Vec<Subscription>> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let rows = sqlx::query(
            "SELECT c.id, s.username AS subscriber, a.username AS author FROM subscriptions c \
             JOIN users s ON s.id = c.subscriber_id JOIN users a ON a.id = c.author_id \
             WHERE c.subscriber_id = $1 ORDER BY c.id",
        )
        .bind(subscriber_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.iter().map(Subscription::from_row).collect::<Result<_, _>>()?)
    }
}
