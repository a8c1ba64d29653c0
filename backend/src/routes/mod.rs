//! Route definitions for the Tradebook API
//!
//! Protected routers are wrapped with the auth middleware via
//! `from_fn_with_state` so token verification uses the same configured
//! secret that `AuthService` signs with.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes
        .nest("/items", item_routes(state.clone()))
        .nest("/parties", party_routes(state.clone()))
        .nest("/invoices", invoice_routes(state.clone()))
        .nest("/balance", balance_routes(state.clone()))
        .nest("/reports", report_routes(state.clone()))
        .nest("/users", user_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Stock item routes (protected)
fn item_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_items).post(handlers::create_item))
        .route(
            "/:item_id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route("/:item_id/transfer", post(handlers::transfer_stock))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

/// Counterparty routes (protected)
fn party_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_parties).post(handlers::create_party))
        .route(
            "/:party_id",
            get(handlers::get_party)
                .put(handlers::update_party)
                .delete(handlers::delete_party),
        )
        .route_layer(from_fn_with_state(state, auth_middleware))
}

/// Invoice and payment routes (protected)
fn invoice_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_invoices).post(handlers::create_invoice),
        )
        .route(
            "/:invoice_id",
            get(handlers::get_invoice)
                .put(handlers::update_invoice)
                .delete(handlers::delete_invoice),
        )
        .route(
            "/:invoice_id/payments",
            get(handlers::list_payments).post(handlers::record_payment),
        )
        .route_layer(from_fn_with_state(state, auth_middleware))
}

/// Cash-balance ledger routes (protected)
fn balance_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/entries",
            get(handlers::list_entries).post(handlers::add_entry),
        )
        .route("/total", get(handlers::total_balance))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

/// Reporting routes (protected)
fn report_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/summary", get(handlers::dashboard_summary))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

/// User administration routes (protected)
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/:user_id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/:user_id/permissions", post(handlers::update_permissions))
        .route_layer(from_fn_with_state(state, auth_middleware))
}
