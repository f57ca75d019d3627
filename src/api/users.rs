use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    Json,
};

use super::{
    auth::{AuthUser, MaybeUser},
    error::{ApiError, IdPath},
    query::PageQuery,
    views::UserView,
    AppState,
};
use crate::models::{Page, Subscription};

pub async fn list(
    State(state): State<AppState>,
    MaybeUser(caller): MaybeUser,
    RawQuery(raw): RawQuery,
) -> Result<Json<Page<UserView>>, ApiError> {
    let query = PageQuery::parse(raw.as_deref())?;
    let store = state.store().await?;
    let page = store.users().list(query.page(state.config.page_size)).await?;

    let mut results = Vec::with_capacity(page.results.len());
    for user in page.results {
        results.push(UserView::build(&store, user, caller.as_ref()).await?);
    }
    store.commit().await?;

    Ok(Json(Page {
        count: page.count,
        next: page.next,
        previous: page.previous,
        results,
    }))
}

pub async fn retrieve(
    State(state): State<AppState>,
    MaybeUser(caller): MaybeUser,
    path: IdPath,
) -> Result<Json<UserView>, ApiError> {
    let Path(id) = path?;
    let store = state.store().await?;
    let user = store.users().get(id).await?;
    let view = UserView::build(&store, user, caller.as_ref()).await?;
    store.commit().await?;
    Ok(Json(view))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<UserView> {
    // Nobody can subscribe to themselves.
    Json(UserView {
        user,
        is_subscribed: false,
    })
}

pub async fn subscriptions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    let store = state.store().await?;
    let subscriptions = store.subscriptions().list_for(user.id).await?;
    store.commit().await?;
    Ok(Json(subscriptions))
}

pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: IdPath,
) -> Result<(StatusCode, Json<Subscription>), ApiError> {
    let Path(author_id) = path?;
    let store = state.store().await?;
    let subscription = store.subscriptions().subscribe(user.id, author_id).await?;
    store.commit().await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: IdPath,
) -> Result<StatusCode, ApiError> {
    let Path(author_id) = path?;
    let store = state.store().await?;
    store.subscriptions().unsubscribe(user.id, author_id).await?;
    store.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
