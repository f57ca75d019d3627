use sqlx::{postgres::PgRow, Postgres, QueryBuilder, Row};
use std::sync::Arc;

use crate::{
    events::{DomainEvent, EventLog},
    models::{Page, PageRequest, Recipe, RecipeDraft, RecipeFilter, RecipeIngredient, Tag, User},
    Executor, StoreError, StoreResult,
};

const RECIPE_SELECT: &str = "SELECT r.id, r.name, r.image, r.text, r.cooking_time, r.created_at, \
     u.id AS author_id, u.email AS author_email, u.username AS author_username, \
     u.first_name AS author_first_name, u.last_name AS author_last_name, \
     u.is_superuser AS author_is_superuser \
     FROM recipes r JOIN users u ON u.id = r.author_id";

/// Owns recipes together with their tag links and ingredient rows.
///
/// Deleting a recipe also removes every favorite and cart entry pointing at
/// it, within the same transaction.
pub struct RecipeRepository {
    executor: Executor,
    events: Arc<EventLog>,
}

impl RecipeRepository {
    pub fn new(executor: Executor, events: Arc<EventLog>) -> Self {
        Self { executor, events }
    }

    pub async fn create(&self, author: &User, draft: &RecipeDraft) -> StoreResult<Recipe> {
        let id: i64 = {
            let mut guard = self.executor.lock().await;
            let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
            sqlx::query_scalar(
                "INSERT INTO recipes (author_id, name, image, text, cooking_time) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING id",
            )
            .bind(author.id)
            .bind(&draft.name)
            .bind(&draft.image)
            .bind(&draft.text)
            .bind(draft.cooking_time)
            .fetch_one(&mut **tx)
            .await?
        };
        self.link(id, draft).await?;
        self.events.record(DomainEvent::RecipeCreated {
            recipe_id: id,
            author_id: author.id,
        });
        self.get(id).await
    }

    /// Replaces every field, tag link and ingredient row of an existing recipe.
    pub async fn update(&self, id: i64, draft: &RecipeDraft) -> StoreResult<Recipe> {
        {
            let mut guard = self.executor.lock().await;
            let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
            let updated = sqlx::query(
                "UPDATE recipes SET name = $2, image = $3, text = $4, cooking_time = $5 WHERE id = $1",
            )
            .bind(id)
            .bind(&draft.name)
            .bind(&draft.image)
            .bind(&draft.text)
            .bind(draft.cooking_time)
            .execute(&mut **tx)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(StoreError::NotFound("recipe"));
            }

            sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
                .bind(id)
                .execute(&mut **tx)
                .await?;
            sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
                .bind(id)
                .execute(&mut **tx)
                .await?;
        }
        self.link(id, draft).await?;
        self.events.record(DomainEvent::RecipeUpdated { recipe_id: id });
        self.get(id).await
    }

    async fn link(&self, id: i64, draft: &RecipeDraft) -> StoreResult<()> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;

        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) SELECT $1, UNNEST($2::BIGINT[])")
            .bind(id)
            .bind(&draft.tags)
            .execute(&mut **tx)
            .await?;

        let (ingredient_ids, amounts): (Vec<i64>, Vec<i32>) =
            draft.ingredients.iter().map(|i| (i.id, i.amount)).unzip();
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) \
             SELECT $1, ingredient_id, amount FROM UNNEST($2::BIGINT[], $3::INTEGER[]) AS t(ingredient_id, amount)",
        )
        .bind(id)
        .bind(&ingredient_ids)
        .bind(&amounts)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> StoreResult<()> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;

        let cart_entries = sqlx::query("DELETE FROM shopping_cart WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?
            .rows_affected();
        let favorites = sqlx::query("DELETE FROM favorites WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound("recipe"));
        }
        self.events.record(DomainEvent::RecipeDeleted {
            recipe_id: id,
            cart_entries,
            favorites,
        });
        Ok(())
    }

    pub async fn find_by_id(&self, id: i64) -> StoreResult<Option<Recipe>> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let Some(row) = sqlx::query(&format!("{RECIPE_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
        else {
            return Ok(None);
        };

        let tags = sqlx::query(
            "SELECT t.id, t.name, t.color, t.slug FROM tags t \
             JOIN recipe_tags rt ON rt.tag_id = t.id WHERE rt.recipe_id = $1 ORDER BY t.id",
        )
        .bind(id)
        .fetch_all(&mut **tx)
        .await?
        .iter()
        .map(Tag::from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let ingredients = sqlx::query(
            "SELECT i.id, i.name, i.measurement_unit, ri.amount FROM recipe_ingredients ri \
             JOIN ingredients i ON i.id = ri.ingredient_id WHERE ri.recipe_id = $1 ORDER BY ri.id",
        )
        .bind(id)
        .fetch_all(&mut **tx)
        .await?
        .iter()
        .map(RecipeIngredient::from_row)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(recipe_from_row(&row, tags, ingredients)?))
    }

    pub async fn get(&self, id: i64) -> StoreResult<Recipe> {
        self.find_by_id(id).await?.ok_or(StoreError::NotFound("recipe"))
    }

    pub async fn exists(&self, id: i64) -> StoreResult<bool> {
        let mut guard = self.executor.lock().await;
        let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;
        let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM recipes WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(found)
    }

    /// Newest first, filtered and paginated.
    pub async fn list(&self, filter: &RecipeFilter, page: PageRequest) -> StoreResult<Page<Recipe>> {
        let (count, ids) = {
            let mut guard = self.executor.lock().await;
            let tx = guard.as_mut().ok_or(sqlx::Error::PoolClosed)?;

            let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
            push_filter(&mut count_query, filter);
            let count: i64 = count_query.build_query_scalar().fetch_one(&mut **tx).await?;

            let mut ids_query = QueryBuilder::<Postgres>::new("SELECT r.id FROM recipes r WHERE TRUE");
            push_filter(&mut ids_query, filter);
            ids_query
                .push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
                .push_bind(i64::from(page.limit))
                .push(" OFFSET ")
                .push_bind(page.offset());
            let ids: Vec<i64> = ids_query.build_query_scalar().fetch_all(&mut **tx).await?;

            (count, ids)
        };

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            // A concurrent delete between the two reads just shortens the page.
            if let Some(recipe) = self.find_by_id(id).await? {
                results.push(recipe);
            }
        }
        Ok(Page::new(page, count, results))
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter) {
    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let Some(user_id) = filter.favorited_by {
        query
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(user_id) = filter.in_cart_of {
        query
            .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
}

fn recipe_from_row(row: &PgRow, tags: Vec<Tag>, ingredients: Vec<RecipeIngredient>) -> Result<Recipe, sqlx::Error> {
    Ok(Recipe {
        id: row.try_get("id")?,
        author: User::from_row(row, "author_")?,
        name: row.try_get("name")?,
        image: row.try_get("image")?,
        text: row.try_get("text")?,
        cooking_time: row.try_get("cooking_time")?,
        created_at: row.try_get("created_at")?,
        tags,
        ingredients,
    })
}
