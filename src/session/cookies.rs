// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session cookie wire contract.
//!
//! Cookie names and attributes are part of the protocol shared with the
//! frontend; changing them invalidates every live session.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use super::codec::{DEFAULT_SESSION_TTL_SECS, ERROR_CLAIMS_TTL_SECS};

/// Provider-backed session cookie, written on OAuth callback completion.
pub const PROVIDER_SESSION_COOKIE: &str = "logto-session";

/// Virtual-user session cookie, written by the impersonation endpoints.
pub const VIRTUAL_USER_COOKIE: &str = "virtual-user";

/// One-time error message cookie, written on lifecycle failures.
pub const AUTH_ERROR_COOKIE: &str = "auth-error";

/// Build a session cookie holding a signed token.
///
/// Thirty-day max-age; the token's own `exp` governs actual validity.
pub fn session_cookie(name: &'static str, token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(DEFAULT_SESSION_TTL_SECS))
        .build()
}

/// Build the short-lived error cookie.
pub fn error_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_ERROR_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(ERROR_CLAIMS_TTL_SECS))
        .build()
}

/// Build a removal cookie for `name`.
///
/// Same path as the live cookie, max-age zero.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}
