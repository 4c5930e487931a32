// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::middleware::edge_gate,
    session::UserProfile,
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod health;

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/sign-in", get(auth::sign_in))
        .route("/sign-out", get(auth::sign_out).post(auth::sign_out))
        .route("/callback", get(auth::callback))
        .route("/user", get(auth::user))
        .route("/error", get(auth::auth_error));

    let admin_routes = Router::new().route(
        "/impersonate",
        post(admin::set_virtual_user).delete(admin::clear_virtual_user),
    );

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/v1", admin_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // The gate wraps the whole router, unmatched paths included, so
        // protected prefixes are enforced even for routes served upstream.
        .layer(from_fn_with_state(state.clone(), edge_gate))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::sign_in,
        auth::callback,
        auth::sign_out,
        auth::user,
        auth::auth_error,
        admin::set_virtual_user,
        admin::clear_virtual_user,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            UserProfile,
            auth::UserResponse,
            auth::UserSummary,
            auth::AuthErrorResponse,
            admin::ImpersonateRequest,
            admin::ImpersonateResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Session lifecycle"),
        (name = "Impersonation", description = "Virtual user administration"),
        (name = "Health", description = "Service health")
    )
)]
struct ApiDoc;
