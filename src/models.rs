use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, Row};
use std::collections::HashSet;

use crate::{StoreError, StoreResult};

pub const RECIPE_NAME_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub is_superuser: bool,
}

impl User {
    /// Reads a user from columns optionally prefixed, e.g. `author_` in joined queries.
    pub(crate) fn from_row(row: &PgRow, prefix: &str) -> Result<Self, sqlx::Error> {
        let col = |name: &str| format!("{prefix}{name}");
        Ok(Self {
            id: row.try_get(col("id").as_str())?,
            email: row.try_get(col("email").as_str())?,
            username: row.try_get(col("username").as_str())?,
            first_name: row.try_get(col("first_name").as_str())?,
            last_name: row.try_get(col("last_name").as_str())?,
            is_superuser: row.try_get(col("is_superuser").as_str())?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl Tag {
    pub(crate) fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            color: row.try_get("color")?,
            slug: row.try_get("slug")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

impl Ingredient {
    pub(crate) fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            measurement_unit: row.try_get("measurement_unit")?,
        })
    }
}

/// An ingredient as used by one recipe; `id` is the ingredient's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl RecipeIngredient {
    pub(crate) fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            measurement_unit: row.try_get("measurement_unit")?,
            amount: row.try_get("amount")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: i64,
    pub author: User,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
}

/// Short form returned by favorite and cart endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeSummary {
    pub(crate) fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            image: row.try_get("image")?,
            cooking_time: row.try_get("cooking_time")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngredientAmount {
    pub id: i64,
    pub amount: i32,
}

/// Payload for creating or replacing a recipe.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeDraft {
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<i64>,
    pub ingredients: Vec<IngredientAmount>,
}

impl RecipeDraft {
    /// Field-level checks that need no database access.
    pub fn validate(&self) -> StoreResult<()> {
        let invalid = |msg: &str| Err(StoreError::Invalid(msg.to_string()));

        if self.name.trim().is_empty() {
            return invalid("name must not be empty");
        }
        if self.name.chars().count() > RECIPE_NAME_MAX {
            return invalid("name must be at most 50 characters");
        }
        if self.text.trim().is_empty() {
            return invalid("text must not be empty");
        }
        if self.cooking_time < 1 {
            return invalid("cooking_time must be at least 1");
        }
        if self.tags.is_empty() {
            return invalid("at least one tag is required");
        }
        if self.tags.iter().collect::<HashSet<_>>().len() != self.tags.len() {
            return invalid("tags must not repeat");
        }
        if self.ingredients.is_empty() {
            return invalid("at least one ingredient is required");
        }
        let mut seen = HashSet::new();
        for item in &self.ingredients {
            if item.amount < 1 {
                return invalid("ingredient amount must be at least 1");
            }
            if !seen.insert(item.id) {
                return invalid("ingredients must not repeat");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub id: i64,
    pub subscriber: String,
    pub author: String,
}

impl Subscription {
    pub(crate) fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            subscriber: row.try_get("subscriber")?,
            author: row.try_get("author")?,
        })
    }
}

/// Recipe list filters; the caller-relative flags are ignored for anonymous callers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<i64>,
    pub favorited_by: Option<i64>,
    pub in_cart_of: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, count: i64, results: Vec<T>) -> Self {
        let shown = request.offset() + results.len() as i64;
        Self {
            count,
            next: (shown < count).then(|| request.page + 1),
            previous: (request.page > 1).then(|| request.page - 1),
            results,
        }
    }
}
