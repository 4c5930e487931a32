// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Logto-backed provider client.
//!
//! Implements the [`ProviderClient`] interface against a Logto instance's
//! OIDC endpoints: authorization URL construction, authorization-code
//! exchange, userinfo fetch and end-session URL construction. The
//! post-sign-in redirect target rides in the OAuth `state` parameter, so no
//! server-side flow state is kept.

use std::time::Duration;

use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use super::provider::{CallbackOutcome, ProviderClient, ProviderContext, ProviderError};
use crate::session::{SessionClaims, UserProfile};

/// Scopes requested on every sign-in.
const SCOPES: &str = "openid profile email";

/// HTTP timeout for provider requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Logto OIDC client.
#[derive(Clone)]
pub struct LogtoClient {
    endpoint: Url,
    app_id: String,
    app_secret: String,
    redirect_uri: Url,
    http: reqwest::Client,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
#[allow(dead_code)] // deserialized in full; not every field is read
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl LogtoClient {
    /// Create a client for one Logto application.
    ///
    /// `redirect_uri` is this service's callback endpoint; it must match
    /// the redirect URI registered with the application.
    pub fn new(endpoint: Url, app_id: String, app_secret: String, redirect_uri: Url) -> Self {
        let mut endpoint = endpoint;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Self {
            endpoint,
            app_id,
            app_secret,
            redirect_uri,
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn oidc_url(&self, path: &str) -> Result<Url, ProviderError> {
        self.endpoint
            .join(path)
            .map_err(|e| ProviderError::Protocol(format!("invalid provider endpoint: {e}")))
    }

    /// Checks HTTP response status; returns the response on success or a
    /// rejection carrying the provider's error body.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, ProviderError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(ProviderError::Rejected {
            operation,
            status: Some(status),
            detail,
        })
    }

    /// Fetch the userinfo document for an access token.
    async fn fetch_userinfo(&self, access_token: &str) -> Result<UserProfile, ProviderError> {
        let response = self
            .http
            .get(self.oidc_url("oidc/me")?)
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::ensure_success(response, "userinfo").await?;
        response.json::<UserProfile>().await.map_err(Into::into)
    }
}

/// Encode the post-redirect target into the OAuth state parameter.
fn encode_state(post_redirect: Option<&str>) -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    match post_redirect {
        Some(target) => format!("{nonce}:{target}"),
        None => nonce,
    }
}

/// Recover the post-redirect target from a state parameter.
fn decode_state(state: &str) -> Option<String> {
    state
        .split_once(':')
        .map(|(_, target)| target.to_string())
        .filter(|t| !t.is_empty())
}

/// Merge ID-token claims with the userinfo document.
///
/// Userinfo wins for profile fields; the ID token contributes the envelope
/// claims (`iss`, `aud`, `exp`, `iat`) userinfo does not carry.
fn merge_profiles(id_token_profile: Option<UserProfile>, userinfo: UserProfile) -> UserProfile {
    let Some(from_token) = id_token_profile else {
        return userinfo;
    };
    UserProfile {
        iss: from_token.iss,
        sub: userinfo.sub,
        aud: from_token.aud,
        exp: from_token.exp,
        iat: from_token.iat,
        name: userinfo.name.or(from_token.name),
        email: userinfo.email.or(from_token.email),
        phone_number: userinfo.phone_number.or(from_token.phone_number),
        username: userinfo.username.or(from_token.username),
        picture: userinfo.picture.or(from_token.picture),
    }
}

#[async_trait::async_trait]
impl ProviderClient for LogtoClient {
    async fn start_sign_in(
        &self,
        redirect_uri: &Url,
        post_redirect: Option<&str>,
    ) -> Result<Url, ProviderError> {
        let mut url = self.oidc_url("oidc/auth")?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.app_id)
            .append_pair("redirect_uri", redirect_uri.as_str())
            .append_pair("scope", SCOPES)
            .append_pair("state", &encode_state(post_redirect))
            .append_pair("prompt", "login");
        Ok(url)
    }

    async fn complete_callback(&self, request_url: &Url) -> Result<CallbackOutcome, ProviderError> {
        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut error_description = None;
        for (key, value) in request_url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => error_description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(ProviderError::Rejected {
                operation: "authorization",
                status: None,
                detail: error_description.unwrap_or(error),
            });
        }

        let code = code.ok_or_else(|| ProviderError::Protocol("missing code".to_string()))?;
        let post_redirect = state.as_deref().and_then(decode_state);

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.app_id.as_str()),
            ("client_secret", self.app_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.oidc_url("oidc/token")?)
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "token exchange").await?;
        let tokens: TokenResponse = response.json().await?;

        // The ID token arrives over TLS directly from the token endpoint,
        // so its claims are read without signature verification. Claims
        // that fail to parse fall back to userinfo alone.
        let id_token_profile = tokens.id_token.as_deref().and_then(|token| {
            jsonwebtoken::dangerous::insecure_decode::<UserProfile>(token)
                .map(|data| data.claims)
                .ok()
        });

        let userinfo = self.fetch_userinfo(&tokens.access_token).await?;
        let profile = merge_profiles(id_token_profile, userinfo);

        Ok(CallbackOutcome {
            profile,
            access_token: Some(tokens.access_token),
            id_token: tokens.id_token,
            post_redirect,
        })
    }

    async fn get_context(
        &self,
        session: Option<&SessionClaims>,
        fetch_profile: bool,
    ) -> Result<ProviderContext, ProviderError> {
        let Some(claims) = session else {
            return Ok(ProviderContext::unauthenticated());
        };
        if !claims.is_authenticated {
            return Ok(ProviderContext::unauthenticated());
        }
        let Some(profile) = claims.user_info.as_ref() else {
            return Ok(ProviderContext::unauthenticated());
        };

        let now = chrono::Utc::now().timestamp();
        let raw = serde_json::to_value(claims).unwrap_or_default();

        if !profile.is_expired(now) && !fetch_profile {
            return Ok(ProviderContext::authenticated(profile.clone(), raw));
        }

        // Stale or explicitly revalidated: the access token decides whether
        // the session can be refreshed from the userinfo endpoint.
        match claims.access_token.as_deref() {
            Some(access_token) => {
                let fresh = self.fetch_userinfo(access_token).await?;
                let merged = merge_profiles(Some(profile.clone()), fresh);
                Ok(ProviderContext::authenticated(merged, raw))
            }
            None if profile.is_expired(now) => Ok(ProviderContext::unauthenticated()),
            None => Ok(ProviderContext::authenticated(profile.clone(), raw)),
        }
    }

    async fn start_sign_out(&self, return_url: &Url) -> Result<Url, ProviderError> {
        let mut url = self.oidc_url("oidc/session/end")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.app_id)
            .append_pair("post_logout_redirect_uri", return_url.as_str());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn client() -> LogtoClient {
        LogtoClient::new(
            "https://auth.example.com".parse().unwrap(),
            "app_123".to_string(),
            "secret_456".to_string(),
            "https://chat.example.com/api/auth/callback".parse().unwrap(),
        )
    }

    #[tokio::test]
    async fn sign_in_url_carries_oauth_parameters() {
        let url = client()
            .start_sign_in(
                &"https://chat.example.com/api/auth/callback".parse().unwrap(),
                Some("/chat"),
            )
            .await
            .unwrap();

        assert_eq!(url.path(), "/oidc/auth");
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("response_type".to_string(), "code".to_string())));
        assert!(query.contains(&("client_id".to_string(), "app_123".to_string())));
        assert!(query.iter().any(|(k, v)| k == "state" && v.ends_with(":/chat")));
    }

    #[tokio::test]
    async fn sign_in_states_are_unique() {
        let c = client();
        let redirect = "https://chat.example.com/api/auth/callback".parse().unwrap();
        let a = c.start_sign_in(&redirect, None).await.unwrap();
        let b = c.start_sign_in(&redirect, None).await.unwrap();
        assert_ne!(a.query(), b.query());
    }

    #[test]
    fn state_round_trips_post_redirect() {
        let state = encode_state(Some("/chat?tab=recent"));
        assert_eq!(decode_state(&state), Some("/chat?tab=recent".to_string()));
        assert_eq!(decode_state(&encode_state(None)), None);
    }

    #[tokio::test]
    async fn callback_with_provider_error_is_rejected() {
        let url: Url = "https://chat.example.com/api/auth/callback?error=access_denied&error_description=User+cancelled"
            .parse()
            .unwrap();
        let err = client().complete_callback(&url).await.unwrap_err();
        match err {
            ProviderError::Rejected { detail, .. } => assert_eq!(detail, "User cancelled"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn callback_without_code_is_malformed() {
        let url: Url = "https://chat.example.com/api/auth/callback?state=abc"
            .parse()
            .unwrap();
        let err = client().complete_callback(&url).await.unwrap_err();
        assert!(matches!(err, ProviderError::Protocol(_)));
    }

    #[tokio::test]
    async fn context_without_session_is_unauthenticated() {
        let ctx = client().get_context(None, false).await.unwrap();
        assert!(!ctx.is_authenticated);
    }

    #[tokio::test]
    async fn context_trusts_fresh_embedded_profile() {
        let mut profile = UserProfile::new("user_123");
        profile.exp = Some(Utc::now().timestamp() + 3600);
        let claims = SessionClaims::provider(profile, Some("at_123".to_string()), None);

        let ctx = client().get_context(Some(&claims), false).await.unwrap();
        assert!(ctx.is_authenticated);
        assert_eq!(ctx.user_info.unwrap().sub, "user_123");
    }

    #[tokio::test]
    async fn context_rejects_expired_profile_without_access_token() {
        let mut profile = UserProfile::new("user_123");
        profile.exp = Some(Utc::now().timestamp() - 10);
        let claims = SessionClaims::provider(profile, None, None);

        let ctx = client().get_context(Some(&claims), false).await.unwrap();
        assert!(!ctx.is_authenticated);
    }

    #[tokio::test]
    async fn sign_out_url_returns_to_caller() {
        let url = client()
            .start_sign_out(&"https://chat.example.com/".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(url.path(), "/oidc/session/end");
        assert!(url
            .query_pairs()
            .any(|(k, v)| k == "post_logout_redirect_uri" && v == "https://chat.example.com/"));
    }

    #[test]
    fn merge_prefers_userinfo_profile_fields() {
        let mut from_token = UserProfile::new("user_123");
        from_token.iss = Some("https://auth.example.com/oidc".to_string());
        from_token.exp = Some(1_700_000_000);
        from_token.name = Some("Token Name".to_string());

        let mut userinfo = UserProfile::new("user_123");
        userinfo.name = Some("Userinfo Name".to_string());
        userinfo.email = Some("ada@example.com".to_string());

        let merged = merge_profiles(Some(from_token), userinfo);
        assert_eq!(merged.name.as_deref(), Some("Userinfo Name"));
        assert_eq!(merged.email.as_deref(), Some("ada@example.com"));
        assert_eq!(merged.iss.as_deref(), Some("https://auth.example.com/oidc"));
        assert_eq!(merged.exp, Some(1_700_000_000));
    }
}
