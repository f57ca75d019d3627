//! Read-mostly reference data: tags and ingredients.

use crate::{
    models::{Ingredient, Tag},
    Executor, StoreError, StoreResult,
};

pub struct TagRepository {
    executor: Executor,
}

impl TagRepository {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub async fn create(&self, name: &str, color: &str, slug: &str) -> StoreResult<Tag> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let row = sqlx::query("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING id, name, color, slug")
            .bind(name)
            .bind(color)
            .bind(slug)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| StoreError::on_unique(e, "tag with this slug already exists"))?;
        Ok(Tag::from_row(&row)?)
    }

    pub async fn list(&self) -> StoreResult<Vec<Tag>> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let rows = sqlx::query("SELECT id, name, color, slug FROM tags ORDER BY id")
            .fetch_all(&mut **tx)
            .await?;
        Ok(rows.iter().map(Tag::from_row).collect::<Result<_, _>>()?)
    }

    pub async fn get(&self, id: i64) -> StoreResult<Tag> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(StoreError::NotFound("tag"))?;
        Ok(Tag::from_row(&row)?)
    }

    /// Ids from `ids` with no matching tag.
    pub async fn missing(&self, ids: &[i64]) -> StoreResult<Vec<i64>> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT wanted FROM UNNEST($1::BIGINT[]) AS wanted \
             WHERE NOT EXISTS (SELECT 1 FROM tags WHERE id = wanted)",
        )
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

pub struct IngredientRepository {
    executor: Executor,
}

impl IngredientRepository {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub async fn create(&self, name: &str, measurement_unit: &str) -> StoreResult<Ingredient> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let row = sqlx::query(
            "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) \
             RETURNING id, name, measurement_unit",
        )
        .bind(name)
        .bind(measurement_unit)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| StoreError::on_unique(e, "ingredient with this name and unit already exists"))?;
        Ok(Ingredient::from_row(&row)?)
    }

    /// Case-insensitive prefix search; `None` lists everything.
    pub async fn search(&self, prefix: Option<&str>) -> StoreResult<Vec<Ingredient>> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let rows = sqlx::query(
            "SELECT id, name, measurement_unit FROM ingredients \
             WHERE $1::TEXT IS NULL OR starts_with(lower(name), lower($1)) \
             ORDER BY name, measurement_unit",
        )
        .bind(prefix)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.iter().map(Ingredient::from_row).collect::<Result<_, _>>()?)
    }

    pub async fn get(&self, id: i64) -> StoreResult<Ingredient> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let row = sqlx::query("SELECT id, name, measurement_unit FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(StoreError::NotFound("ingredient"))?;
        Ok(Ingredient::from_row(&row)?)
    }

    pub async fn missing(&self, ids: &[i64]) -> StoreResult<Vec<i64>> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT wanted FROM UNNEST($1::BIGINT[]) AS wanted \
             WHERE NOT EXISTS (SELECT 1 FROM ingredients WHERE id = wanted)",
        )
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
