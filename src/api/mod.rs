//! REST API.
//!
//! All routes live under `/api` and keep trailing slashes:
//!
//! - `GET|POST /recipes/`, `GET|PUT|PATCH|DELETE /recipes/{id}/`
//! - `POST|DELETE /recipes/{id}/favorite/`, `POST|DELETE /recipes/{id}/shopping_cart/`
//! - `GET /recipes/download_shopping_cart/` (plain-text attachment)
//! - `GET /tags/`, `GET /tags/{id}/`, `GET /ingredients/?name=`, `GET /ingredients/{id}/`
//! - `GET /users/`, `GET /users/{id}/`, `GET /users/me/`, `GET /users/subscriptions/`
//! - `POST|DELETE /users/{id}/subscribe/`
//!
//! Each handler opens a [`Store`], does its work and commits. An early return
//! drops the store, which rolls the transaction back.

pub mod auth;
pub mod catalog;
pub mod error;
pub mod query;
pub mod recipes;
pub mod users;
pub mod views;

use std::{sync::Arc, time::Duration};

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::{config::Config, repositories::TokenRepository, PostgresUnitOfWork, Store};
use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub uow: Arc<PostgresUnitOfWork>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            uow: Arc::new(PostgresUnitOfWork::new(pool)),
            config: Arc::new(config),
        }
    }

    pub async fn store(&self) -> Result<Store, ApiError> {
        Ok(Store::begin(&self.uow).await?)
    }

    pub fn tokens(&self) -> TokenRepository {
        TokenRepository::new(self.uow.pool().clone())
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/recipes/", get(recipes::list).post(recipes::create))
        .route(
            "/recipes/download_shopping_cart/",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/recipes/{id}/",
            get(recipes::retrieve)
                .put(recipes::update)
                .patch(recipes::update)
                .delete(recipes::destroy),
        )
        .route(
            "/recipes/{id}/favorite/",
            post(recipes::favorite).delete(recipes::unfavorite),
        )
        .route(
            "/recipes/{id}/shopping_cart/",
            post(recipes::add_to_cart).delete(recipes::remove_from_cart),
        )
        .route("/tags/", get(catalog::list_tags))
        .route("/tags/{id}/", get(catalog::get_tag))
        .route("/ingredients/", get(catalog::list_ingredients))
        .route("/ingredients/{id}/", get(catalog::get_ingredient))
        .route("/users/", get(users::list))
        .route("/users/me/", get(users::me))
        .route("/users/{id}/", get(users::retrieve))
        .route("/users/subscriptions/", get(users::subscriptions))
        .route(
            "/users/{id}/subscribe/",
            post(users::subscribe).delete(users::unsubscribe),
        );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
