use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use super::{
    auth::{AuthUser, MaybeUser},
    error::{ApiError, IdPath},
    query::RecipeListQuery,
    views::RecipeView,
    AppState,
};
use crate::{
    cart::{self, SHOPPING_LIST_FILENAME},
    models::{Page, Recipe, RecipeDraft, RecipeSummary, User},
    repositories::ListKind,
    Store,
};

pub async fn list(
    State(state): State<AppState>,
    MaybeUser(caller): MaybeUser,
    RawQuery(raw): RawQuery,
) -> Result<Json<Page<RecipeView>>, ApiError> {
    let query = RecipeListQuery::parse(raw.as_deref())?;
    let store = state.store().await?;

    let page = store
        .recipes()
        .list(&query.filter(caller.as_ref()), query.page(state.config.page_size))
        .await?;

    let mut results = Vec::with_capacity(page.results.len());
    for recipe in page.results {
        results.push(RecipeView::build(&store, recipe, caller.as_ref()).await?);
    }
    store.commit().await?;

    Ok(Json(Page {
        count: page.count,
        next: page.next,
        previous: page.previous,
        results,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<RecipeDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<RecipeView>), ApiError> {
    let Json(draft) = payload?;
    draft.validate()?;

    let store = state.store().await?;
    check_references(&store, &draft).await?;
    let recipe = store.recipes().create(&user, &draft).await?;
    let view = RecipeView::build(&store, recipe, Some(&user)).await?;
    store.commit().await?;

    info!(recipe_id = view.id, author = %user.username, "recipe created");
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    MaybeUser(caller): MaybeUser,
    path: IdPath,
) -> Result<Json<RecipeView>, ApiError> {
    let Path(id) = path?;
    let store = state.store().await?;
    let recipe = store.recipes().get(id).await?;
    let view = RecipeView::build(&store, recipe, caller.as_ref()).await?;
    store.commit().await?;
    Ok(Json(view))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: IdPath,
    payload: Result<Json<RecipeDraft>, JsonRejection>,
) -> Result<Json<RecipeView>, ApiError> {
    let Path(id) = path?;
    let Json(draft) = payload?;

    let store = state.store().await?;
    let existing = store.recipes().get(id).await?;
    authorize(&user, &existing)?;
    draft.validate()?;
    check_references(&store, &draft).await?;

    let recipe = store.recipes().update(id, &draft).await?;
    let view = RecipeView::build(&store, recipe, Some(&user)).await?;
    store.commit().await?;
    Ok(Json(view))
}

pub async fn destroy(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: IdPath,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let store = state.store().await?;
    let existing = store.recipes().get(id).await?;
    authorize(&user, &existing)?;
    store.recipes().delete(id).await?;
    store.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn favorite(
    state: State<AppState>,
    user: AuthUser,
    id: IdPath,
) -> Result<(StatusCode, Json<RecipeSummary>), ApiError> {
    add_to(ListKind::Favorites, state, user, id).await
}

pub async fn unfavorite(state: State<AppState>, user: AuthUser, id: IdPath) -> Result<StatusCode, ApiError> {
    remove_from(ListKind::Favorites, state, user, id).await
}

pub async fn add_to_cart(
    state: State<AppState>,
    user: AuthUser,
    id: IdPath,
) -> Result<(StatusCode, Json<RecipeSummary>), ApiError> {
    add_to(ListKind::ShoppingCart, state, user, id).await
}

pub async fn remove_from_cart(state: State<AppState>, user: AuthUser, id: IdPath) -> Result<StatusCode, ApiError> {
    remove_from(ListKind::ShoppingCart, state, user, id).await
}

pub async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Response, ApiError> {
    let store = state.store().await?;
    let recipes = store.shopping_cart().cart_recipes(user.id).await?;
    store.commit().await?;

    let totals = cart::aggregate(&recipes);
    info!(
        user = %user.username,
        recipes = recipes.len(),
        rows = totals.len(),
        "shopping list rendered"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={SHOPPING_LIST_FILENAME}"),
            ),
        ],
        cart::render(&totals),
    )
        .into_response())
}

async fn add_to(
    kind: ListKind,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: IdPath,
) -> Result<(StatusCode, Json<RecipeSummary>), ApiError> {
    let Path(id) = path?;
    let store = state.store().await?;
    let summary = store.recipe_list(kind).add(user.id, id).await?;
    store.commit().await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn remove_from(
    kind: ListKind,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: IdPath,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let store = state.store().await?;
    store.recipe_list(kind).remove(user.id, id).await?;
    store.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Only the author or a superuser may modify a recipe.
fn authorize(user: &User, recipe: &Recipe) -> Result<(), ApiError> {
    if user.id == recipe.author.id || user.is_superuser {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

async fn check_references(store: &Store, draft: &RecipeDraft) -> Result<(), ApiError> {
    let missing_tags = store.tags().missing(&draft.tags).await?;
    if !missing_tags.is_empty() {
        return Err(ApiError::BadRequest(format!("Unknown tag ids: {missing_tags:?}")));
    }

    let ingredient_ids: Vec<i64> = draft.ingredients.iter().map(|i| i.id).collect();
    let missing_ingredients = store.ingredients().missing(&ingredient_ids).await?;
    if let Some(id) = missing_ingredients.first() {
        return Err(ApiError::NotFound(format!("Ingredient {id} not found")));
    }
    Ok(())
}
