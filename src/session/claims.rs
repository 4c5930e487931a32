// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session claims and user profile representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User profile embedded in a session token.
///
/// Standard OIDC claims plus the optional profile fields the provider
/// exposes. `sub` is the durable identity key and is always present;
/// every other claim is provider-dependent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    /// Issuer. Synthetic for virtual users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject - the canonical user identifier.
    pub sub: String,

    /// Audience. Synthetic for virtual users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration timestamp (epoch seconds). Must be checked against the
    /// current time before the profile is trusted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued-at timestamp (epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl UserProfile {
    /// Minimal profile with only the required `sub` claim.
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            iss: None,
            sub: sub.into(),
            aud: None,
            exp: None,
            iat: None,
            name: None,
            email: None,
            phone_number: None,
            username: None,
            picture: None,
        }
    }

    /// Whether the profile's `exp` claim has passed.
    ///
    /// A profile without `exp` never expires by this check; callers that
    /// require an expiry (virtual sessions) always set one.
    pub fn is_expired(&self, now_secs: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now_secs)
    }
}

/// Claims carried by a session token.
///
/// Two variants share this shape: provider sessions (`user_info` plus the
/// provider tokens) and virtual sessions (`is_virtual` with a synthetic
/// profile and `last_verified`). Field names below are the cookie wire
/// contract; do not rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// Always present; false never appears in a stored session.
    pub is_authenticated: bool,

    /// The authenticated user's profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserProfile>,

    /// Provider access token (provider sessions only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Provider ID token (provider sessions only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Marks a virtual session established without the provider.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_virtual: bool,

    /// When the virtual identity was last verified (epoch milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verified: Option<i64>,
}

impl SessionClaims {
    /// Claims for a provider-backed session.
    pub fn provider(
        profile: UserProfile,
        access_token: Option<String>,
        id_token: Option<String>,
    ) -> Self {
        Self {
            is_authenticated: true,
            user_info: Some(profile),
            access_token,
            id_token,
            is_virtual: false,
            last_verified: None,
        }
    }

    /// Claims for a virtual session.
    ///
    /// `last_verified` records when the impersonation was established
    /// (epoch milliseconds).
    pub fn virtual_user(profile: UserProfile, last_verified: i64) -> Self {
        Self {
            is_authenticated: true,
            user_info: Some(profile),
            access_token: None,
            id_token: None,
            is_virtual: true,
            last_verified: Some(last_verified),
        }
    }
}

/// Short-lived claims carrying a user-facing error message.
///
/// Written on lifecycle failures, read once by the error endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorClaims {
    /// Sanitized message for display. Never raw provider error text.
    pub error_message: String,
}
