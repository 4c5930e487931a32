// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Impersonation endpoints.
//!
//! Establish or clear a virtual session: an identity minted locally,
//! bypassing the provider entirely. The virtual-user cookie outranks any
//! provider session during resolution, so impersonation takes effect on
//! the next request and sign-out tears it down without contacting the
//! provider.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::identity::resolve_identity;
use crate::error::ApiError;
use crate::session::codec::DEFAULT_SESSION_TTL_SECS;
use crate::session::cookies::{self, VIRTUAL_USER_COOKIE};
use crate::session::{SessionClaims, UserProfile};
use crate::state::AppState;

/// Fixed virtual session duration: 24 hours from establishment.
const VIRTUAL_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Synthetic issuer marking locally minted profiles.
const VIRTUAL_ISSUER: &str = "sessiongate-virtual";

/// Request body for POST /api/v1/impersonate.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ImpersonateRequest {
    /// Durable user identifier to impersonate.
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Response for POST /api/v1/impersonate.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImpersonateResponse {
    /// The synthesized virtual profile, expiry included.
    pub profile: UserProfile,
}

/// Synthesize the virtual profile for a request.
///
/// Issuer and audience are synthetic; expiry is a fixed duration from now.
fn virtual_profile(request: ImpersonateRequest, now_secs: i64) -> UserProfile {
    UserProfile {
        iss: Some(VIRTUAL_ISSUER.to_string()),
        aud: Some("virtual".to_string()),
        exp: Some(now_secs + VIRTUAL_SESSION_TTL_SECS),
        iat: Some(now_secs),
        name: request.name,
        email: request.email,
        phone_number: request.phone_number,
        username: request.username,
        picture: request.picture,
        ..UserProfile::new(request.sub)
    }
}

/// Establish a virtual session.
///
/// Requires an authenticated, non-virtual caller: impersonation is an
/// administrative action, and a virtual session minting further virtual
/// sessions would be self-escalating.
#[utoipa::path(
    post,
    path = "/api/v1/impersonate",
    tag = "Impersonation",
    request_body = ImpersonateRequest,
    responses(
        (status = 200, description = "Virtual session established", body = ImpersonateResponse),
        (status = 400, description = "Missing subject"),
        (status = 401, description = "Caller is not authenticated"),
        (status = 403, description = "Virtual sessions cannot impersonate"),
    )
)]
pub async fn set_virtual_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<ImpersonateRequest>,
) -> Response {
    let (jar, context) = resolve_identity(&state, jar).await;
    if !context.is_authenticated() {
        return ApiError::unauthorized("Authentication required").into_response();
    }
    if context.is_virtual() {
        return ApiError::forbidden("Virtual sessions cannot impersonate").into_response();
    }
    if request.sub.trim().is_empty() {
        return ApiError::bad_request("sub is required").into_response();
    }

    let now = Utc::now();
    let profile = virtual_profile(request, now.timestamp());
    let claims = SessionClaims::virtual_user(profile.clone(), now.timestamp_millis());

    let token = match state.codec.encode(&claims, DEFAULT_SESSION_TTL_SECS) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode virtual session token");
            return ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not establish virtual session",
            )
            .into_response();
        }
    };

    tracing::info!(sub = %profile.sub, "virtual session established");
    let jar = jar.add(cookies::session_cookie(
        VIRTUAL_USER_COOKIE,
        token,
        state.config.secure_cookies(),
    ));
    (jar, Json(ImpersonateResponse { profile })).into_response()
}

/// Clear the virtual session, if any.
#[utoipa::path(
    delete,
    path = "/api/v1/impersonate",
    tag = "Impersonation",
    responses(
        (status = 204, description = "Virtual session cleared"),
    )
)]
pub async fn clear_virtual_user(jar: CookieJar) -> Response {
    let jar = jar.remove(cookies::removal_cookie(VIRTUAL_USER_COOKIE));
    (jar, StatusCode::NO_CONTENT).into_response()
}
