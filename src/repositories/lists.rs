//! Per-user recipe lists: favorites and the shopping cart.
//!
//! Both are `(user, recipe)` link tables with the same lifecycle, so they
//! share one repository parameterized by [`ListKind`].

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    cart::CartRecipe,
    events::{DomainEvent, EventLog},
    models::{RecipeIngredient, RecipeSummary},
    Executor, StoreError, StoreResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Favorites,
    ShoppingCart,
}

impl ListKind {
    fn table(self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::ShoppingCart => "shopping_cart",
        }
    }

    fn duplicate_message(self) -> &'static str {
        match self {
            Self::Favorites => "Recipe is already in favorites",
            Self::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    fn entry(self) -> &'static str {
        match self {
            Self::Favorites => "favorite",
            Self::ShoppingCart => "shopping cart entry",
        }
    }

    fn added(self, user_id: i64, recipe_id: i64) -> DomainEvent {
        match self {
            Self::Favorites => DomainEvent::Favorited { user_id, recipe_id },
            Self::ShoppingCart => DomainEvent::AddedToCart { user_id, recipe_id },
        }
    }

    fn removed(self, user_id: i64, recipe_id: i64) -> DomainEvent {
        match self {
            Self::Favorites => DomainEvent::Unfavorited { user_id, recipe_id },
            Self::ShoppingCart => DomainEvent::RemovedFromCart { user_id, recipe_id },
        }
    }
}

pub struct RecipeListRepository {
    kind: ListKind,
    executor: Executor,
    events: Arc<EventLog>,
}

impl RecipeListRepository {
    pub fn new(kind: ListKind, executor: Executor, events: Arc<EventLog>) -> Self {
        Self { kind, executor, events }
    }

    /// Adds the recipe and returns its summary; `NotFound` if the recipe is missing,
    /// `Conflict` if it is already listed.
    pub async fn add(&self, user_id: i64, recipe_id: i64) -> StoreResult<RecipeSummary> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;

        let recipe = sqlx::query("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(StoreError::NotFound("recipe"))?;

        let table = self.kind.table();
        let inserted = sqlx::query(&format!(
            "INSERT INTO {table} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(StoreError::Conflict(self.kind.duplicate_message().to_string()));
        }

        self.events.record(self.kind.added(user_id, recipe_id));
        Ok(RecipeSummary::from_row(&recipe)?)
    }

    pub async fn remove(&self, user_id: i64, recipe_id: i64) -> StoreResult<()> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;

        let recipe_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM recipes WHERE id = $1)")
            .bind(recipe_id)
            .fetch_one(&mut **tx)
            .await?;
        if !recipe_exists {
            return Err(StoreError::NotFound("recipe"));
        }

        let table = self.kind.table();
        let deleted = sqlx::query(&format!("DELETE FROM {table} WHERE user_id = $1 AND recipe_id = $2"))
            .bind(user_id)
            .bind(recipe_id)
            .execute(&mut **tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(self.kind.entry()));
        }

        self.events.record(self.kind.removed(user_id, recipe_id));
        Ok(())
    }

    pub async fn contains(&self, user_id: i64, recipe_id: i64) -> StoreResult<bool> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let table = self.kind.table();
        let found: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS (SELECT 1 FROM {table} WHERE user_id = $1 AND recipe_id = $2)"
        ))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(found)
    }

    /// Every listed recipe with its ingredients, ready for aggregation.
    pub async fn cart_recipes(&self, user_id: i64) -> StoreResult<Vec<CartRecipe>> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let table = self.kind.table();
        let rows = sqlx::query(&format!(
            "SELECT l.recipe_id, i.id, i.name, i.measurement_unit, ri.amount \
             FROM {table} l \
             JOIN recipe_ingredients ri ON ri.recipe_id = l.recipe_id \
             JOIN ingredients i ON i.id = ri.ingredient_id \
             WHERE l.user_id = $1 ORDER BY l.recipe_id, ri.id"
        ))
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await?;

        let mut recipes: BTreeMap<i64, Vec<RecipeIngredient>> = BTreeMap::new();
        for row in &rows {
            let recipe_id: i64 = sqlx::Row::try_get(row, "recipe_id")?;
            recipes
                .entry(recipe_id)
                .or_default()
                .push(RecipeIngredient::from_row(row)?);
        }

        Ok(recipes
            .into_iter()
            .map(|(recipe_id, ingredients)| CartRecipe { recipe_id, ingredients })
            .collect())
    }
}
