// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session lifecycle endpoints.
//!
//! Sign-in, OAuth callback, sign-out, current-user and one-time error
//! readout. Provider failures never escape these handlers: each is caught,
//! logged, and converted into a sanitized message plus a redirect to the
//! application base URL.

use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::identity::resolve_identity;
use crate::auth::provider::ProviderError;
use crate::session::codec::{DEFAULT_SESSION_TTL_SECS, ERROR_CLAIMS_TTL_SECS};
use crate::session::cookies::{
    self, AUTH_ERROR_COOKIE, PROVIDER_SESSION_COOKIE, VIRTUAL_USER_COOKIE,
};
use crate::session::{ErrorClaims, SessionClaims, UserProfile};
use crate::state::AppState;

/// Shown when the provider cannot be reached at all.
const MSG_PROVIDER_UNREACHABLE: &str =
    "Unable to reach the authentication server. Please try again later.";

/// Shown on any other sign-in failure.
const MSG_SIGN_IN_FAILED: &str = "Sign-in failed. Please try again.";

/// Query parameters for the sign-in entry point.
#[derive(Debug, Deserialize)]
pub struct SignInQuery {
    /// Path to return to after sign-in completes.
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// Start a provider sign-in.
///
/// With enforcement off there is nothing to sign into; the request is sent
/// back to the application.
#[utoipa::path(
    get,
    path = "/api/auth/sign-in",
    tag = "Auth",
    params(("redirectTo" = Option<String>, Query, description = "Path to return to after sign-in")),
    responses(
        (status = 303, description = "Redirect to the provider authorization URL"),
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Query(query): Query<SignInQuery>,
    jar: CookieJar,
) -> Response {
    if !state.config.enforce_auth {
        return Redirect::to(state.config.base_url.as_str()).into_response();
    }

    let target = query.redirect_to.as_deref().filter(|t| is_local_path(t));

    match state
        .provider
        .start_sign_in(&state.config.callback_url(), target)
        .await
    {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to construct authorization URL");
            error_redirect(&state, jar, sanitized_message(&e))
        }
    }
}

/// Complete the OAuth callback.
///
/// On success the provider session cookie is written and the user returns
/// to the original target. On failure nothing session-related is written;
/// a sanitized message is stored for one-time display instead.
#[utoipa::path(
    get,
    path = "/api/auth/callback",
    tag = "Auth",
    responses(
        (status = 303, description = "Redirect to the post-sign-in target or base URL"),
    )
)]
pub async fn callback(State(state): State<AppState>, jar: CookieJar, uri: Uri) -> Response {
    let request_url = match state.config.base_url.join(&uri.to_string()) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "callback URI could not be resolved");
            return error_redirect(&state, jar, MSG_SIGN_IN_FAILED);
        }
    };

    match state.provider.complete_callback(&request_url).await {
        Ok(outcome) => {
            let claims =
                SessionClaims::provider(outcome.profile, outcome.access_token, outcome.id_token);
            let token = match state.codec.encode(&claims, DEFAULT_SESSION_TTL_SECS) {
                Ok(token) => token,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode session token");
                    return error_redirect(&state, jar, MSG_SIGN_IN_FAILED);
                }
            };

            let jar = jar.add(cookies::session_cookie(
                PROVIDER_SESSION_COOKIE,
                token,
                state.config.secure_cookies(),
            ));

            let target = outcome
                .post_redirect
                .filter(|t| is_local_path(t))
                .unwrap_or_else(|| state.config.base_url.to_string());

            tracing::info!("provider sign-in completed");
            (jar, Redirect::to(&target)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "callback exchange failed");
            error_redirect(&state, jar, sanitized_message(&e))
        }
    }
}

/// End the current session.
///
/// Virtual sessions are torn down locally; the provider is never
/// contacted for them. Provider sessions additionally redirect through
/// the provider's end-session endpoint. A failure mid-operation still
/// clears both session cookies - sign-out must never leave a stale
/// session behind.
#[utoipa::path(
    get,
    path = "/api/auth/sign-out",
    tag = "Auth",
    responses(
        (status = 303, description = "Redirect to the provider end-session URL or base URL"),
    )
)]
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> Response {
    let virtual_active = jar
        .get(VIRTUAL_USER_COOKIE)
        .is_some_and(|cookie| state.codec.decode::<SessionClaims>(cookie.value()).is_some());

    if virtual_active {
        let jar = jar.remove(cookies::removal_cookie(VIRTUAL_USER_COOKIE));
        return (jar, Redirect::to(state.config.base_url.as_str())).into_response();
    }

    let jar = jar.remove(cookies::removal_cookie(PROVIDER_SESSION_COOKIE));

    match state.provider.start_sign_out(&state.config.base_url).await {
        Ok(url) => (jar, Redirect::to(url.as_str())).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "provider sign-out failed, clearing session locally");
            let jar = jar.remove(cookies::removal_cookie(VIRTUAL_USER_COOKIE));
            (jar, Redirect::to(state.config.base_url.as_str())).into_response()
        }
    }
}

/// The current user, as exposed to the frontend.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    /// Durable user identifier.
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl From<&UserProfile> for UserSummary {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.sub.clone(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            picture: profile.picture.clone(),
            username: profile.username.clone(),
        }
    }
}

/// Response for GET /api/auth/user.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    #[serde(rename = "isAuthenticated")]
    pub is_authenticated: bool,
    pub user: Option<UserSummary>,
}

/// Get the currently authenticated user.
///
/// Always answers; an absent or invalid session is a 401 with a null user,
/// never an error.
#[utoipa::path(
    get,
    path = "/api/auth/user",
    tag = "Auth",
    responses(
        (status = 200, description = "Authenticated user", body = UserResponse),
        (status = 401, description = "No valid session", body = UserResponse),
    )
)]
pub async fn user(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, context) = resolve_identity(&state, jar).await;

    match context.profile() {
        Some(profile) => {
            let body = UserResponse {
                is_authenticated: true,
                user: Some(profile.into()),
            };
            (jar, (StatusCode::OK, Json(body))).into_response()
        }
        None => {
            let body = UserResponse {
                is_authenticated: false,
                user: None,
            };
            (jar, (StatusCode::UNAUTHORIZED, Json(body))).into_response()
        }
    }
}

/// Response for GET /api/auth/error.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthErrorResponse {
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

/// Read the stored sign-in error message, once.
///
/// The cookie is cleared by the same response, so a refresh comes back
/// empty.
#[utoipa::path(
    get,
    path = "/api/auth/error",
    tag = "Auth",
    responses(
        (status = 200, description = "Stored error message, if any", body = AuthErrorResponse),
    )
)]
pub async fn auth_error(State(state): State<AppState>, jar: CookieJar) -> Response {
    let message = jar
        .get(AUTH_ERROR_COOKIE)
        .and_then(|cookie| state.codec.decode::<ErrorClaims>(cookie.value()))
        .map(|claims| claims.error_message);

    let jar = if message.is_some() {
        jar.remove(cookies::removal_cookie(AUTH_ERROR_COOKIE))
    } else {
        jar
    };

    (
        jar,
        Json(AuthErrorResponse {
            error_message: message,
        }),
    )
        .into_response()
}

/// Store a sanitized error message and send the user back to the base URL.
fn error_redirect(state: &AppState, jar: CookieJar, message: &str) -> Response {
    let claims = ErrorClaims {
        error_message: message.to_string(),
    };
    let jar = match state.codec.encode(&claims, ERROR_CLAIMS_TTL_SECS) {
        Ok(token) => jar.add(cookies::error_cookie(token, state.config.secure_cookies())),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode error claims");
            jar
        }
    };
    (jar, Redirect::to(state.config.base_url.as_str())).into_response()
}

/// Map a provider failure to its user-facing message.
///
/// Raw provider error text never reaches the client; connectivity failures
/// get a distinct message so users know the outage is not theirs.
fn sanitized_message(error: &ProviderError) -> &'static str {
    if is_connectivity_failure(error) {
        MSG_PROVIDER_UNREACHABLE
    } else {
        MSG_SIGN_IN_FAILED
    }
}

/// Connectivity classification: typed check first, message signatures as
/// the fallback for errors wrapped by intermediate layers.
fn is_connectivity_failure(error: &ProviderError) -> bool {
    if error.is_connectivity() {
        return true;
    }
    let message = error.to_string().to_lowercase();
    ["connection refused", "connection reset", "timed out", "dns error", "network unreachable"]
        .iter()
        .any(|signature| message.contains(signature))
}

/// Only same-origin paths are acceptable redirect targets.
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;
    use axum::http::header;
    use chrono::Utc;

    use super::*;
    use crate::auth::provider::testing::{StubBehavior, StubProvider};
    use crate::config::tests::test_config;

    fn state_with(enforce: bool, behavior: StubBehavior) -> AppState {
        AppState::new(test_config(enforce)).with_provider(Arc::new(StubProvider::new(behavior)))
    }

    fn provider_profile() -> UserProfile {
        let mut profile = UserProfile::new("provider-user");
        profile.exp = Some(Utc::now().timestamp() + 3600);
        profile.name = Some("Ada".to_string());
        profile.email = Some("ada@example.com".to_string());
        profile
    }

    fn location(response: &Response) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .expect("location header")
            .to_str()
            .unwrap()
            .to_string()
    }

    /// The value a Set-Cookie header assigns to `name`, if any.
    fn set_cookie_value(response: &Response, name: &str) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|header| {
                let (cookie_name, rest) = header.split_once('=')?;
                if cookie_name != name {
                    return None;
                }
                Some(rest.split(';').next().unwrap_or_default().to_string())
            })
    }

    fn session_cookie_jar(state: &AppState, name: &'static str, claims: &SessionClaims) -> CookieJar {
        let token = state.codec.encode(claims, DEFAULT_SESSION_TTL_SECS).unwrap();
        CookieJar::new().add(axum_extra::extract::cookie::Cookie::new(name, token))
    }

    #[tokio::test]
    async fn sign_in_with_enforcement_off_returns_home() {
        let state = state_with(false, StubBehavior::Anonymous);
        let response = sign_in(
            State(state),
            Query(SignInQuery { redirect_to: None }),
            CookieJar::new(),
        )
        .await;

        assert_eq!(location(&response), "http://localhost:3000/");
    }

    #[tokio::test]
    async fn sign_in_redirects_to_provider() {
        let state = state_with(true, StubBehavior::Anonymous);
        let response = sign_in(
            State(state),
            Query(SignInQuery {
                redirect_to: Some("/chat".to_string()),
            }),
            CookieJar::new(),
        )
        .await;

        assert!(location(&response).starts_with("https://auth.example.com/oidc/auth"));
    }

    #[tokio::test]
    async fn sign_in_failure_stores_error_and_returns_home() {
        let state = state_with(true, StubBehavior::Rejecting);
        let response = sign_in(
            State(state.clone()),
            Query(SignInQuery { redirect_to: None }),
            CookieJar::new(),
        )
        .await;

        assert_eq!(location(&response), "http://localhost:3000/");
        let token = set_cookie_value(&response, AUTH_ERROR_COOKIE).expect("error cookie");
        let claims: ErrorClaims = state.codec.decode(&token).unwrap();
        assert_eq!(claims.error_message, MSG_SIGN_IN_FAILED);
    }

    #[tokio::test]
    async fn sign_in_ignores_non_local_redirect_targets() {
        let state = state_with(true, StubBehavior::Anonymous);
        let response = sign_in(
            State(state),
            Query(SignInQuery {
                redirect_to: Some("https://evil.example.com/".to_string()),
            }),
            CookieJar::new(),
        )
        .await;

        // The stub encodes the accepted target into the state parameter;
        // a rejected target leaves no state behind.
        assert!(!location(&response).contains("state="));
    }

    #[tokio::test]
    async fn callback_success_sets_session_and_redirects() {
        let state = state_with(true, StubBehavior::Authenticated(provider_profile()));
        let response = callback(
            State(state.clone()),
            CookieJar::new(),
            "/api/auth/callback?code=abc&state=n:/chat".parse().unwrap(),
        )
        .await;

        assert_eq!(location(&response), "/chat");
        let token = set_cookie_value(&response, PROVIDER_SESSION_COOKIE).expect("session cookie");
        let claims: SessionClaims = state.codec.decode(&token).unwrap();
        assert!(claims.is_authenticated);
        assert_eq!(claims.user_info.unwrap().sub, "provider-user");
    }

    #[tokio::test]
    async fn callback_failure_stores_error_and_sets_no_session() {
        let state = state_with(true, StubBehavior::Rejecting);
        let response = callback(
            State(state.clone()),
            CookieJar::new(),
            "/api/auth/callback?code=abc".parse().unwrap(),
        )
        .await;

        assert_eq!(location(&response), "http://localhost:3000/");
        assert!(set_cookie_value(&response, PROVIDER_SESSION_COOKIE).is_none());

        let token = set_cookie_value(&response, AUTH_ERROR_COOKIE).expect("error cookie");
        let claims: ErrorClaims = state.codec.decode(&token).unwrap();
        assert_eq!(claims.error_message, MSG_SIGN_IN_FAILED);
    }

    #[tokio::test]
    async fn callback_connectivity_failure_names_the_outage() {
        let state = state_with(true, StubBehavior::Unreachable);
        let response = callback(
            State(state.clone()),
            CookieJar::new(),
            "/api/auth/callback?code=abc".parse().unwrap(),
        )
        .await;

        let token = set_cookie_value(&response, AUTH_ERROR_COOKIE).expect("error cookie");
        let claims: ErrorClaims = state.codec.decode(&token).unwrap();
        assert_eq!(claims.error_message, MSG_PROVIDER_UNREACHABLE);
    }

    #[tokio::test]
    async fn sign_out_of_virtual_session_never_contacts_provider() {
        // A rejecting provider would fail the sign-out if contacted.
        let state = state_with(true, StubBehavior::Rejecting);
        let claims = SessionClaims::virtual_user(provider_profile(), 0);
        let jar = session_cookie_jar(&state, VIRTUAL_USER_COOKIE, &claims);

        let response = sign_out(State(state), jar).await;

        assert_eq!(location(&response), "http://localhost:3000/");
        assert_eq!(
            set_cookie_value(&response, VIRTUAL_USER_COOKIE).as_deref(),
            Some("")
        );
        assert!(set_cookie_value(&response, PROVIDER_SESSION_COOKIE).is_none());
    }

    #[tokio::test]
    async fn sign_out_redirects_through_provider() {
        let state = state_with(true, StubBehavior::Anonymous);
        let claims = SessionClaims::provider(provider_profile(), None, None);
        let jar = session_cookie_jar(&state, PROVIDER_SESSION_COOKIE, &claims);

        let response = sign_out(State(state), jar).await;

        assert_eq!(location(&response), "https://auth.example.com/oidc/session/end");
        assert_eq!(
            set_cookie_value(&response, PROVIDER_SESSION_COOKIE).as_deref(),
            Some("")
        );
    }

    #[tokio::test]
    async fn sign_out_failure_clears_both_cookies() {
        let state = state_with(true, StubBehavior::Rejecting);
        let claims = SessionClaims::provider(provider_profile(), None, None);
        let jar = session_cookie_jar(&state, PROVIDER_SESSION_COOKIE, &claims);

        let response = sign_out(State(state), jar).await;

        assert_eq!(location(&response), "http://localhost:3000/");
        assert_eq!(
            set_cookie_value(&response, PROVIDER_SESSION_COOKIE).as_deref(),
            Some("")
        );
        assert_eq!(
            set_cookie_value(&response, VIRTUAL_USER_COOKIE).as_deref(),
            Some("")
        );
    }

    #[tokio::test]
    async fn user_endpoint_reports_authenticated_profile() {
        let state = state_with(true, StubBehavior::Authenticated(provider_profile()));
        let claims = SessionClaims::provider(provider_profile(), None, None);
        let jar = session_cookie_jar(&state, PROVIDER_SESSION_COOKIE, &claims);

        let response = user(State(state), jar).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["isAuthenticated"], true);
        assert_eq!(body["user"]["id"], "provider-user");
        assert_eq!(body["user"]["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn user_endpoint_reports_unauthenticated_as_401() {
        let state = state_with(true, StubBehavior::Anonymous);
        let response = user(State(state), CookieJar::new()).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["isAuthenticated"], false);
        assert_eq!(body["user"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn error_endpoint_reads_message_once() {
        let state = state_with(true, StubBehavior::Anonymous);
        let token = state
            .codec
            .encode(
                &ErrorClaims {
                    error_message: MSG_SIGN_IN_FAILED.to_string(),
                },
                ERROR_CLAIMS_TTL_SECS,
            )
            .unwrap();
        let jar = CookieJar::new().add(axum_extra::extract::cookie::Cookie::new(
            AUTH_ERROR_COOKIE,
            token,
        ));

        let response = auth_error(State(state), jar).await;

        // Message returned and the cookie cleared in the same response.
        assert_eq!(
            set_cookie_value(&response, AUTH_ERROR_COOKIE).as_deref(),
            Some("")
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["errorMessage"], MSG_SIGN_IN_FAILED);
    }

    #[tokio::test]
    async fn error_endpoint_is_empty_without_cookie() {
        let state = state_with(true, StubBehavior::Anonymous);
        let response = auth_error(State(state), CookieJar::new()).await;

        assert!(set_cookie_value(&response, AUTH_ERROR_COOKIE).is_none());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["errorMessage"], serde_json::Value::Null);
    }
}
