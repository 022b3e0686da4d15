//! HTTP API server for the bookstore backend.
//!
//! Provides REST endpoints for the catalog, user accounts, cart, checkout,
//! payment, reviews, favorites and the admin dashboard, with structured
//! logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use mail::Mailer;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub store: S,
    pub mailer: Arc<dyn Mailer>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/ouvrages",
            get(routes::books::list::<S>).post(routes::books::create::<S>),
        )
        .route(
            "/ouvrages/{isbn}",
            get(routes::books::get::<S>)
                .put(routes::books::update::<S>)
                .delete(routes::books::remove::<S>),
        )
        .route(
            "/auteurs",
            get(routes::authors::list::<S>).post(routes::authors::create::<S>),
        )
        .route("/auteurs/{id}", get(routes::authors::get::<S>))
        .route("/utilisateurs", post(routes::users::register::<S>))
        .route(
            "/utilisateurs/{id}",
            get(routes::users::get::<S>).put(routes::users::update::<S>),
        )
        .route("/login", post(routes::users::login::<S>))
        .route("/verify-email", post(routes::users::verify_email::<S>))
        .route(
            "/resend-verification",
            post(routes::users::resend_verification::<S>),
        )
        .route(
            "/panier",
            get(routes::cart::get::<S>)
                .post(routes::cart::save::<S>)
                .delete(routes::cart::clear::<S>),
        )
        .route(
            "/commandes",
            post(routes::orders::checkout::<S>).get(routes::orders::list::<S>),
        )
        .route("/commandes/{id}", get(routes::orders::get::<S>))
        .route("/commandes/{id}/paiement", post(routes::orders::pay::<S>))
        .route(
            "/commandes/{id}/status",
            patch(routes::orders::set_status::<S>),
        )
        .route(
            "/favoris",
            get(routes::favorites::list::<S>).post(routes::favorites::create::<S>),
        )
        .route("/favoris/{id}", delete(routes::favorites::remove::<S>))
        .route(
            "/avis",
            post(routes::reviews::upsert::<S>),
        )
        .route(
            "/avis/{id}",
            get(routes::reviews::list_for_book::<S>).delete(routes::reviews::remove::<S>),
        )
        .route("/admin/stats", get(routes::admin::stats::<S>))
        .route("/admin/utilisateurs", get(routes::admin::list_users::<S>))
        .route(
            "/admin/utilisateurs/{id}/role",
            put(routes::admin::set_role::<S>),
        )
        .route(
            "/admin/utilisateurs/{id}",
            delete(routes::admin::remove_user::<S>),
        )
        .route("/admin/avis/{id}", delete(routes::admin::remove_review::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
