//! Tags and ingredients: public, read-only, unpaginated.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{
    error::{ApiError, IdPath},
    AppState,
};
use crate::models::{Ingredient, Tag};

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    let store = state.store().await?;
    let tags = store.tags().list().await?;
    store.commit().await?;
    Ok(Json(tags))
}

pub async fn get_tag(State(state): State<AppState>, path: IdPath) -> Result<Json<Tag>, ApiError> {
    let Path(id) = path?;
    let store = state.store().await?;
    let tag = store.tags().get(id).await?;
    store.commit().await?;
    Ok(Json(tag))
}

pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let prefix = query.name.as_deref().map(str::trim).filter(|name| !name.is_empty());

    let store = state.store().await?;
    let ingredients = store.ingredients().search(prefix).await?;
    store.commit().await?;
    Ok(Json(ingredients))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    path: IdPath,
) -> Result<Json<Ingredient>, ApiError> {
    let Path(id) = path?;
    let store = state.store().await?;
    let ingredient = store.ingredients().get(id).await?;
    store.commit().await?;
    Ok(Json(ingredient))
}
