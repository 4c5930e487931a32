// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! All configuration is read from the environment once at startup into an
//! immutable [`Config`] shared through application state; nothing reads the
//! environment ad hoc after that.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ENFORCE_AUTH` | Enable authentication (`1`/`true`); off serves the mock identity | off |
//! | `SESSION_SECRET` | Shared secret signing session tokens | Required when enforcement is on |
//! | `APP_BASE_URL` | Public base URL of the application | `http://localhost:3000` |
//! | `LOGTO_ENDPOINT` | Logto instance URL | Optional |
//! | `LOGTO_APP_ID` | Logto application ID | Optional |
//! | `LOGTO_APP_SECRET` | Logto application secret | Optional |
//! | `PROTECTED_PATHS` | Comma-separated protected path prefixes | `/chat,/api/chat` |
//! | `PUBLIC_PATHS` | Comma-separated public path prefixes | `/api/auth,/health,/docs,/api-doc` |
//! | `ASSET_PATTERN` | Regex for static-asset paths the gate skips | built-in extension list |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! The three `LOGTO_*` variables must be set together or not at all. With
//! enforcement off and no secret configured, an ephemeral signing key is
//! generated so the codec still works; sessions then do not survive a
//! restart.

use regex::Regex;
use url::Url;
use uuid::Uuid;

/// Sign-in entry point; the Edge Gate redirects unauthenticated page
/// requests here.
pub const SIGN_IN_PATH: &str = "/api/auth/sign-in";

/// OAuth callback endpoint registered with the provider.
pub const CALLBACK_PATH: &str = "/api/auth/callback";

/// Default static-asset exclusion pattern.
const DEFAULT_ASSET_PATTERN: &str =
    r"\.(?:css|js|map|ico|png|jpe?g|svg|gif|webp|woff2?|ttf|txt)$";

/// Configuration errors surfaced at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required when ENFORCE_AUTH is enabled")]
    Missing(&'static str),

    #[error("LOGTO_ENDPOINT, LOGTO_APP_ID and LOGTO_APP_SECRET must be set together")]
    PartialProvider,

    #[error("{name} is invalid: {message}")]
    Invalid {
        name: &'static str,
        message: String,
    },
}

/// Identity provider settings.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub endpoint: Url,
    pub app_id: String,
    pub app_secret: String,
}

/// Process-wide configuration, read-only after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Global enforcement switch. Off means every request resolves to the
    /// mock identity and the Edge Gate passes everything.
    pub enforce_auth: bool,
    /// Secret keying the session token MAC.
    pub session_secret: String,
    /// Public base URL; failure redirects land here.
    pub base_url: Url,
    /// Provider settings; `None` runs provider-less (mock/virtual only).
    pub provider: Option<ProviderSettings>,
    /// Path prefixes requiring a valid session.
    pub protected_paths: Vec<String>,
    /// Path prefixes that always pass the gate.
    pub public_paths: Vec<String>,
    /// Prefix under which unauthenticated requests get a JSON 401 instead
    /// of a redirect.
    pub api_prefix: String,
    /// Static-asset paths the gate never checks.
    pub asset_pattern: Regex,
    /// Server bind address.
    pub host: String,
    /// Server bind port.
    pub port: u16,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let enforce_auth = matches!(
            std::env::var("ENFORCE_AUTH").as_deref(),
            Ok("1") | Ok("true")
        );

        let session_secret = match std::env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if enforce_auth => return Err(ConfigError::Missing("SESSION_SECRET")),
            // Ephemeral key: good enough for a dev instance that bypasses
            // authentication anyway.
            _ => format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
        };

        let base_url = std::env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let base_url: Url = base_url.parse().map_err(|e| ConfigError::Invalid {
            name: "APP_BASE_URL",
            message: format!("{e}"),
        })?;

        let provider = match (
            std::env::var("LOGTO_ENDPOINT").ok().filter(|v| !v.is_empty()),
            std::env::var("LOGTO_APP_ID").ok().filter(|v| !v.is_empty()),
            std::env::var("LOGTO_APP_SECRET").ok().filter(|v| !v.is_empty()),
        ) {
            (Some(endpoint), Some(app_id), Some(app_secret)) => {
                let endpoint: Url = endpoint.parse().map_err(|e| ConfigError::Invalid {
                    name: "LOGTO_ENDPOINT",
                    message: format!("{e}"),
                })?;
                Some(ProviderSettings {
                    endpoint,
                    app_id,
                    app_secret,
                })
            }
            (None, None, None) => None,
            _ => return Err(ConfigError::PartialProvider),
        };

        let asset_pattern = std::env::var("ASSET_PATTERN")
            .unwrap_or_else(|_| DEFAULT_ASSET_PATTERN.to_string());
        let asset_pattern = Regex::new(&asset_pattern).map_err(|e| ConfigError::Invalid {
            name: "ASSET_PATTERN",
            message: format!("{e}"),
        })?;

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: "PORT",
                message: format!("{e}"),
            })?;

        Ok(Self {
            enforce_auth,
            session_secret,
            base_url,
            provider,
            protected_paths: prefix_list("PROTECTED_PATHS", &["/chat", "/api/chat"]),
            public_paths: prefix_list("PUBLIC_PATHS", &["/api/auth", "/health", "/docs", "/api-doc"]),
            api_prefix: "/api".to_string(),
            asset_pattern,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
        })
    }

    /// The OAuth callback URL registered with the provider.
    pub fn callback_url(&self) -> Url {
        self.base_url
            .join(CALLBACK_PATH)
            .expect("base URL joins a fixed path")
    }

    /// Cookies are `Secure` exactly when the application is served over
    /// HTTPS.
    pub fn secure_cookies(&self) -> bool {
        self.base_url.scheme() == "https"
    }

    /// Whether a request path is under a protected prefix.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_paths.iter().any(|p| path.starts_with(p))
    }

    /// Whether a request path is under a public prefix.
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| path.starts_with(p))
    }

    /// Whether a request path looks like a static asset.
    pub fn is_asset(&self, path: &str) -> bool {
        self.asset_pattern.is_match(path)
    }

    /// Whether a request path is an API call (drives 401-vs-redirect).
    pub fn is_api(&self, path: &str) -> bool {
        path.starts_with(&self.api_prefix)
    }
}

fn prefix_list(var: &str, defaults: &[&str]) -> Vec<String> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => defaults.iter().map(|s| s.to_string()).collect(),
    }
}
