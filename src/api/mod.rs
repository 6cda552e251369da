//! HTTP interface.
//!
//! Handlers are thin: they extract the requester and payload, call into
//! [`crate::core`], and shape the response. Errors render through
//! [`crate::errors::Error`]'s `IntoResponse` implementation.

pub mod auth;
pub mod error;
pub mod extract;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;


use crate::{config::server::ServerConfig, core::image::ImageStore, errors::Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info};

/// Largest accepted request body, sized for image uploads.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub images: ImageStore,
    pub settings: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, settings: ServerConfig) -> Self {
        Self {
            db,
            images: ImageStore::new(settings.media_root.clone()),
            settings: Arc::new(settings),
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let media = ServeDir::new(state.images.root());

    Router::new()
        // Users
        .route("/api/users", get(users::list_users).post(users::register))
        .route("/api/users/me", get(users::me))
        .route("/api/users/set_password", post(users::set_password))
        .route("/api/users/subscriptions", get(users::subscriptions))
        .route("/api/users/:id", get(users::get_user))
        .route(
            "/api/users/:id/subscribe",
            post(users::subscribe).delete(users::unsubscribe),
        )
        // Token auth
        .route("/api/auth/token/login", post(auth::login))
        .route("/api/auth/token/logout", post(auth::logout))
        // Catalogs
        .route("/api/tags", get(tags::list_tags))
        .route("/api/tags/:id", get(tags::get_tag))
        .route(
            "/api/ingredients",
            get(ingredients::list_ingredients).post(ingredients::create_ingredient),
        )
        .route(
            "/api/ingredients/:id",
            get(ingredients::get_ingredient).delete(ingredients::delete_ingredient),
        )
        // Recipes
        .route(
            "/api/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/api/recipes/download_shopping_cart",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/api/recipes/:id",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/api/recipes/:id/favorite",
            post(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route(
            "/api/recipes/:id/shopping_cart",
            post(recipes::add_to_cart).delete(recipes::remove_from_cart),
        )
        .nest_service("/media", media)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serves the API on `listener` until Ctrl+C or SIGTERM.
///
/// # Errors
/// Returns `Error::Io` if the server fails.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    if let Ok(address) = listener.local_addr() {
        info!("Server running on {address}");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
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
        () = ctrl_c => {},
        () = terminate => {},
    }
}
