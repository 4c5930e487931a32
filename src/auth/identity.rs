// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity resolution.
//!
//! The authoritative identity determination used inside handlers, applying
//! a fixed three-tier priority: mock (enforcement off), virtual
//! (impersonation cookie), provider (Logto session). Resolution never
//! fails; every failure mode collapses to [`IdentityContext::Unauthenticated`].
//!
//! The Edge Gate in `middleware.rs` is a coarser pre-routing check; this
//! module is the authority.

use axum_extra::extract::CookieJar;
use chrono::Utc;

use crate::config::SIGN_IN_PATH;
use crate::error::ApiError;
use crate::session::cookies::{self, PROVIDER_SESSION_COOKIE, VIRTUAL_USER_COOKIE};
use crate::session::{SessionClaims, UserProfile};
use crate::state::AppState;

/// Resolved identity for one request. Exactly one variant holds.
#[derive(Debug, Clone)]
pub enum IdentityContext {
    /// No identity could be established.
    Unauthenticated,
    /// Fixed synthetic identity; enforcement is off.
    Mock { profile: UserProfile },
    /// Impersonated identity from the virtual-user cookie.
    Virtual { profile: UserProfile },
    /// Identity backed by a provider session.
    Provider {
        profile: UserProfile,
        /// Raw session claims for callers needing provider-specific fields.
        claims: serde_json::Value,
    },
}

impl IdentityContext {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, IdentityContext::Unauthenticated)
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, IdentityContext::Virtual { .. })
    }

    /// The resolved profile, if any.
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            IdentityContext::Unauthenticated => None,
            IdentityContext::Mock { profile }
            | IdentityContext::Virtual { profile }
            | IdentityContext::Provider { profile, .. } => Some(profile),
        }
    }
}

/// Outcome of a guarded resolution: either proceed with an identity, or
/// transfer control. The outermost handler performs the actual transfer;
/// nothing here uses non-local exits.
#[derive(Debug)]
pub enum AuthOutcome {
    Continue(IdentityContext),
    Redirect(String),
    Unauthorized(ApiError),
}

/// The fixed identity served when enforcement is off.
pub fn mock_profile() -> UserProfile {
    let now = Utc::now().timestamp();
    UserProfile {
        iss: Some("sessiongate".to_string()),
        aud: Some("mock".to_string()),
        exp: Some(now + 24 * 60 * 60),
        iat: Some(now),
        name: Some("Mock User".to_string()),
        email: Some("mock.user@example.com".to_string()),
        username: Some("mock".to_string()),
        ..UserProfile::new("mock-user")
    }
}

/// Resolve the identity for the current request.
///
/// Never fails and is safe to call repeatedly; the only side effect is
/// removal of an expired virtual-user cookie, returned through the jar.
pub async fn resolve_identity(
    state: &AppState,
    jar: CookieJar,
) -> (CookieJar, IdentityContext) {
    // Mock tier: no cookies read, no provider call.
    if !state.config.enforce_auth {
        return (
            jar,
            IdentityContext::Mock {
                profile: mock_profile(),
            },
        );
    }

    // Virtual tier. The virtual-user cookie outranks any provider session
    // that may also be present.
    let mut jar = jar;
    if let Some(cookie) = jar.get(VIRTUAL_USER_COOKIE) {
        if let Some(claims) = state.codec.decode::<SessionClaims>(cookie.value()) {
            if let Some(profile) = claims.user_info {
                if !profile.is_expired(Utc::now().timestamp()) {
                    return (jar, IdentityContext::Virtual { profile });
                }
                tracing::debug!(sub = %profile.sub, "virtual session expired, removing cookie");
                jar = jar.remove(cookies::removal_cookie(VIRTUAL_USER_COOKIE));
            }
        }
    }

    // Provider tier. Failures are caught here and resolve to
    // unauthenticated; they never propagate to the caller.
    let session = jar
        .get(PROVIDER_SESSION_COOKIE)
        .and_then(|cookie| state.codec.decode::<SessionClaims>(cookie.value()));
    match state.provider.get_context(session.as_ref(), false).await {
        Ok(context) if context.is_authenticated => match context.user_info {
            Some(profile) => (
                jar,
                IdentityContext::Provider {
                    profile,
                    claims: context.claims.unwrap_or_default(),
                },
            ),
            None => (jar, IdentityContext::Unauthenticated),
        },
        Ok(_) => (jar, IdentityContext::Unauthenticated),
        Err(e) => {
            tracing::warn!(error = %e, "provider context lookup failed, treating as unauthenticated");
            (jar, IdentityContext::Unauthenticated)
        }
    }
}

/// Sign-in entry point URL preserving the original path.
pub fn sign_in_redirect(original_path: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("redirectTo", original_path)
        .finish();
    format!("{SIGN_IN_PATH}?{query}")
}

/// Resolve, redirecting to sign-in when unauthenticated (page contexts).
pub async fn require_identity(
    state: &AppState,
    jar: CookieJar,
    original_path: &str,
) -> (CookieJar, AuthOutcome) {
    let (jar, context) = resolve_identity(state, jar).await;
    if context.is_authenticated() {
        (jar, AuthOutcome::Continue(context))
    } else {
        (jar, AuthOutcome::Redirect(sign_in_redirect(original_path)))
    }
}

/// Resolve, answering unauthenticated access with a 401 body for API
/// callers and a sign-in redirect for page callers.
pub async fn require_auth_or_error(
    state: &AppState,
    jar: CookieJar,
    original_path: &str,
    is_api_call: bool,
) -> (CookieJar, AuthOutcome) {
    let (jar, context) = resolve_identity(state, jar).await;
    if context.is_authenticated() {
        return (jar, AuthOutcome::Continue(context));
    }
    if is_api_call {
        (
            jar,
            AuthOutcome::Unauthorized(ApiError::unauthorized("Authentication required")),
        )
    } else {
        (jar, AuthOutcome::Redirect(sign_in_redirect(original_path)))
    }
}
