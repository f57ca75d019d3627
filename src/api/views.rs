use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    models::{Recipe, RecipeIngredient, Tag, User},
    Store, StoreResult,
};

/// A user as seen by the caller.
#[derive(Debug, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub is_subscribed: bool,
}

impl UserView {
    pub async fn build(store: &Store, user: User, caller: Option<&User>) -> StoreResult<Self> {
        let is_subscribed = match caller {
            Some(caller) if caller.id != user.id => store.subscriptions().is_subscribed(caller.id, user.id).await?,
            _ => false,
        };
        Ok(Self { user, is_subscribed })
    }
}

/// Full recipe representation with caller-relative flags.
#[derive(Debug, Serialize)]
pub struct RecipeView {
    pub id: i64,
    pub author: UserView,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeView {
    pub async fn build(store: &Store, recipe: Recipe, caller: Option<&User>) -> StoreResult<Self> {
        let (is_favorited, is_in_shopping_cart) = match caller {
            Some(caller) => (
                store.favorites().contains(caller.id, recipe.id).await?,
                store.shopping_cart().contains(caller.id, recipe.id).await?,
            ),
            None => (false, false),
        };

        Ok(Self {
            id: recipe.id,
            author: UserView::build(store, recipe.author, caller).await?,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            created_at: recipe.created_at,
            tags: recipe.tags,
            ingredients: recipe.ingredients,
            is_favorited,
            is_in_shopping_cart,
        })
    }
}
