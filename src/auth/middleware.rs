// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Edge admission middleware.
//!
//! Runs before routing and rejects obviously-unauthenticated traffic to
//! protected paths using only a signature+expiry check on the session
//! cookies - no claims interpretation, no provider calls, no cookie
//! mutation. Handlers still resolve the authoritative identity through
//! `identity::resolve_identity`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/chat", get(chat_handler))
//!     .layer(axum::middleware::from_fn_with_state(state, edge_gate));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::identity::sign_in_redirect;
use crate::error::ApiError;
use crate::session::cookies::{PROVIDER_SESSION_COOKIE, VIRTUAL_USER_COOKIE};
use crate::state::AppState;

/// Edge Gate middleware function.
pub async fn edge_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    // Mirrors the mock tier: enforcement off admits everything.
    if !state.config.enforce_auth {
        return next.run(request).await;
    }

    let path = request.uri().path().to_owned();

    if state.config.is_asset(&path) || state.config.is_public(&path) {
        return next.run(request).await;
    }
    // Paths matching neither pattern set are unprotected.
    if !state.config.is_protected(&path) {
        return next.run(request).await;
    }

    if has_valid_session(&state, &jar) {
        return next.run(request).await;
    }

    tracing::debug!(path = %path, "rejecting unauthenticated request to protected path");
    if state.config.is_api(&path) {
        ApiError::unauthorized("Authentication required").into_response()
    } else {
        Redirect::to(&sign_in_redirect(&path)).into_response()
    }
}

/// Whether some session cookie carries a validly signed, unexpired token.
///
/// Checked in priority order: provider session, then virtual user.
fn has_valid_session(state: &AppState, jar: &CookieJar) -> bool {
    [PROVIDER_SESSION_COOKIE, VIRTUAL_USER_COOKIE]
        .iter()
        .any(|name| {
            jar.get(name)
                .is_some_and(|cookie| state.codec.verify(cookie.value()))
        })
}
