use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{NewUser, Page, PageRequest, User},
    Executor, StoreError, StoreResult,
};

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, is_superuser";

pub struct UserRepository {
    executor: Executor,
}

impl UserRepository {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub async fn create(&self, user: &NewUser) -> StoreResult<User> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let row = sqlx::query(&format!(
            "INSERT INTO users (email, username, first_name, last_name, is_superuser) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_superuser)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| StoreError::on_unique(e, "user with this email or username already exists"))?;

        Ok(User::from_row(&row, "")?)
    }

    pub async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(row.map(|r| User::from_row(&r, "")).transpose()?)
    }

    pub async fn get(&self, id: i64) -> StoreResult<User> {
        self.find_by_id(id).await?.ok_or(StoreError::NotFound("user"))
    }

    /// Users in registration order, paginated.
    pub async fn list(&self, page: PageRequest) -> StoreResult<Page<User>> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut **tx)
            .await?;
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&mut **tx)
        .await?;

        let users = rows
            .iter()
            .map(|r| User::from_row(r, ""))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(page, count, users))
    }
}

/// Token lookups run on the pool directly; they happen before a request opens its unit of work.
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn resolve(&self, key: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            "SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.is_superuser \
             FROM auth_tokens t JOIN users u ON u.id = t.user_id WHERE t.key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| User::from_row(&r, "")).transpose()?)
    }

    /// Registers a key issued by the external auth service.
    pub async fn insert(&self, key: Uuid, user_id: i64) -> StoreResult<()> {
        sqlx::query("INSERT INTO auth_tokens (key, user_id) VALUES ($1, $2)")
            .bind(key)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
