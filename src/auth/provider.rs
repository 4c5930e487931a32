// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider interface.
//!
//! The rest of the system talks to the provider through these four
//! operations and their explicit result types; nothing outside this module
//! and its implementation depends on provider response shapes. All four
//! operations are fallible and async, and every caller is expected to catch
//! failures rather than propagate them to clients.

use async_trait::async_trait;
use url::Url;

use crate::session::{SessionClaims, UserProfile};

/// Provider operation errors.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network-level failure reaching the provider.
    #[error("provider request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider rejected the operation.
    #[error("provider rejected {operation}: {detail}")]
    Rejected {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    /// The callback request was malformed (missing or inconsistent
    /// parameters).
    #[error("malformed callback: {0}")]
    Protocol(String),

    /// The provider is not configured.
    #[error("provider not configured: {0}")]
    Unconfigured(&'static str),
}

impl ProviderError {
    /// Whether this failure means the provider could not be reached at all,
    /// as opposed to the provider answering with a rejection.
    ///
    /// Drives the user-facing message split in the callback handler.
    pub fn is_connectivity(&self) -> bool {
        match self {
            ProviderError::Network(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

/// Result of a completed OAuth callback exchange.
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    /// The authenticated user's profile.
    pub profile: UserProfile,
    /// Provider access token, if issued.
    pub access_token: Option<String>,
    /// Provider ID token, if issued.
    pub id_token: Option<String>,
    /// Post-sign-in redirect target carried through the flow.
    pub post_redirect: Option<String>,
}

/// Result of a provider context lookup.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    pub is_authenticated: bool,
    pub user_info: Option<UserProfile>,
    /// Raw session claims backing the context, for callers that need
    /// provider-specific fields.
    pub claims: Option<serde_json::Value>,
}

impl ProviderContext {
    pub fn unauthenticated() -> Self {
        Self {
            is_authenticated: false,
            user_info: None,
            claims: None,
        }
    }

    pub fn authenticated(profile: UserProfile, claims: serde_json::Value) -> Self {
        Self {
            is_authenticated: true,
            user_info: Some(profile),
            claims: Some(claims),
        }
    }
}

/// The narrow provider interface.
///
/// Implementations are request-scoped I/O clients; they hold no per-user
/// state. The session itself lives in the client cookie and is passed in
/// explicitly where an operation needs it.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Construct the authorization URL that starts a sign-in.
    ///
    /// `post_redirect` is carried through the flow and handed back by
    /// [`complete_callback`](Self::complete_callback).
    async fn start_sign_in(
        &self,
        redirect_uri: &Url,
        post_redirect: Option<&str>,
    ) -> Result<Url, ProviderError>;

    /// Exchange the callback request for an authenticated profile.
    async fn complete_callback(&self, request_url: &Url) -> Result<CallbackOutcome, ProviderError>;

    /// Resolve the current provider context from session claims.
    ///
    /// `fetch_profile` forces a userinfo revalidation over the network even
    /// when the embedded profile is still fresh.
    async fn get_context(
        &self,
        session: Option<&SessionClaims>,
        fetch_profile: bool,
    ) -> Result<ProviderContext, ProviderError>;

    /// Construct the provider sign-out URL.
    async fn start_sign_out(&self, return_url: &Url) -> Result<Url, ProviderError>;
}

/// Placeholder client used when no provider is configured.
///
/// Present so the service can run with enforcement off and zero provider
/// configuration: context lookups report unauthenticated, and any attempt
/// to start a provider flow fails in the normal caught-error paths.
pub struct UnconfiguredProvider;

#[async_trait]
impl ProviderClient for UnconfiguredProvider {
    async fn start_sign_in(
        &self,
        _redirect_uri: &Url,
        _post_redirect: Option<&str>,
    ) -> Result<Url, ProviderError> {
        Err(ProviderError::Unconfigured("sign-in"))
    }

    async fn complete_callback(&self, _request_url: &Url) -> Result<CallbackOutcome, ProviderError> {
        Err(ProviderError::Unconfigured("callback"))
    }

    async fn get_context(
        &self,
        _session: Option<&SessionClaims>,
        _fetch_profile: bool,
    ) -> Result<ProviderContext, ProviderError> {
        Ok(ProviderContext::unauthenticated())
    }

    async fn start_sign_out(&self, _return_url: &Url) -> Result<Url, ProviderError> {
        Err(ProviderError::Unconfigured("sign-out"))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_is_not_connectivity() {
        let err = ProviderError::Rejected {
            operation: "token exchange",
            status: Some(400),
            detail: "invalid_grant".to_string(),
        };
        assert!(!err.is_connectivity());
    }

    #[test]
    fn protocol_error_is_not_connectivity() {
        assert!(!ProviderError::Protocol("missing code".to_string()).is_connectivity());
    }

    #[test]
    fn unauthenticated_context_is_empty() {
        let ctx = ProviderContext::unauthenticated();
        assert!(!ctx.is_authenticated);
        assert!(ctx.user_info.is_none());
        assert!(ctx.claims.is_none());
    }
}
