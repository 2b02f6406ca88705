//! API server of a small e-commerce shop.
//!
//! # Architecture
//!
//! - Catalog reads are public; catalog writes require a staff identity.
//! - Checkout recomputes the cart total server-side from catalog prices and
//!   persists the order plus its lines in one transaction.
//! - Stored image references are normalized to canonical CDN URLs on every
//!   read; the `repair` binary is the only thing that rewrites them.
//! - Identity is a stateless JWT access/refresh pair; the frontend sends
//!   `Authorization: Bearer <access>`.
//!
//! # Configuration
//!
//! Everything comes from the environment at startup (see `config`):
//! `TIENDA_PORT`, `DATABASE_URL`, `JWT_SECRET`, `FRONTEND_URL` and the
//! `CLOUDINARY_*` credentials. Logging is controlled with `RUST_LOG`.
use std::time::Duration;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod orders;
pub mod routes;
pub mod state;

use routes::{
    create_category_handler, create_order_handler, create_product_handler, delete_product_handler,
    featured_products_handler, get_product_handler, list_categories_handler, list_products_handler,
    login_handler, me_handler, products_by_category_handler, refresh_handler, register_handler,
    update_product_handler,
};
use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let frontend_origin = state
        .config
        .frontend_url
        .parse::<HeaderValue>()
        .expect("FRONTEND_URL is not a valid origin");

    let cors = CorsLayer::new()
        .allow_origin(frontend_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/products", get(list_products_handler).post(create_product_handler))
        .route("/products/featured", get(featured_products_handler))
        .route(
            "/products/{id}",
            get(get_product_handler)
                .put(update_product_handler)
                .delete(delete_product_handler),
        )
        .route(
            "/categories",
            get(list_categories_handler).post(create_category_handler),
        )
        .route("/categories/{id}/products", get(products_by_category_handler))
        .route("/orders", post(create_order_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/auth/me", get(me_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
