pub mod cache;
pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::admin::handlers as admin;
use crate::funding::handlers as wallet;
use crate::user_auth::handlers as auth;
use crate::user_auth::middleware::{jwt_auth_middleware, require_admin_middleware};
use state::AppState;

/// Full HTTP surface, without the listener
pub fn build_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/me", get(auth::me))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
        .route("/register", post(auth::register))
        .route("/verify", post(auth::verify_signup))
        .route("/login", post(auth::login))
        .route("/login/verify", post(auth::verify_login))
        .route("/password/forgot", post(auth::forgot_password))
        .route("/password/reset", post(auth::reset_password));

    let wallet_routes = Router::new()
        .route("/overview", get(wallet::overview))
        .route("/transactions", get(wallet::transactions))
        .route("/portfolio", get(wallet::portfolio))
        .route("/assets", get(wallet::assets))
        .route("/deposit", post(wallet::deposit))
        .route("/withdraw/request", post(wallet::withdraw_request))
        .route("/withdraw/complete", post(wallet::withdraw_complete))
        .route("/invest", post(wallet::invest))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
        // Public
        .route("/plans", get(wallet::plans));

    // Layers run outermost-last: JWT first, then the admin check
    let admin_routes = Router::new()
        .route("/transactions/pending", get(admin::pending_transactions))
        .route("/transactions/{id}/approve", post(admin::approve_transaction))
        .route("/transactions/{id}/reject", post(admin::reject_transaction))
        .route(
            "/transactions/{id}",
            patch(admin::force_edit_transaction).delete(admin::delete_transaction),
        )
        .route("/investments/{id}", delete(admin::delete_investment))
        .route("/investments/{id}/close", post(admin::close_investment))
        .route("/users", get(admin::list_users))
        .route("/users/{id}/role", put(admin::set_user_role))
        .route("/assets", put(admin::upsert_asset))
        .route("/distribution/run", post(admin::run_distribution))
        .route("/distribution/snapshot", post(admin::run_snapshot))
        .layer(from_fn(require_admin_middleware))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/wallet", wallet_routes)
        .nest("/api/v1/admin", admin_routes)
        .with_state(state)
        // Swagger UI is stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Bind and serve until the listener fails
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(
            "Failed to bind to {}: {} (port {} may already be in use)",
            addr,
            e,
            port
        );
        e
    })?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
