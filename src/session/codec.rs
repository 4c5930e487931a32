// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed, expiring session token codec.
//!
//! Turns a claims value into an HS256-signed token string and back, using
//! the process-wide session secret. Decoding fails closed: malformed input,
//! a bad signature and an expired token are all indistinguishable to the
//! caller - every call site treats `None` as "no session".

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Default session token lifetime: 30 days.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Error-claims token lifetime: 60 seconds.
pub const ERROR_CLAIMS_TTL_SECS: i64 = 60;

/// Token envelope: the caller's claims plus issued-at/expiry.
#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    #[serde(flatten)]
    claims: T,
    iat: i64,
    exp: i64,
}

/// Session token codec keyed by the shared session secret.
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Encode `claims` into a signed token expiring `ttl_secs` from now.
    ///
    /// Pure computation; the only failure mode is claims that do not
    /// serialize, which is a programming error at the call site.
    pub fn encode<T: Serialize>(
        &self,
        claims: &T,
        ttl_secs: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let envelope = Envelope {
            claims,
            iat: now,
            exp: now + ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &envelope, &self.encoding_key)
    }

    /// Decode and verify a token, returning its claims.
    ///
    /// Returns `None` on any verification failure. Expiry is strict: no
    /// clock-skew leeway, so a token one second past `exp` is rejected.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Option<T> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // The audience claim lives inside the embedded profile, not the
        // envelope.
        validation.validate_aud = false;

        match decode::<Envelope<T>>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims.claims),
            Err(e) => {
                // Absence of session, not an error; kind logged for local
                // diagnosis only.
                tracing::debug!(kind = ?e.kind(), "session token rejected");
                None
            }
        }
    }

    /// Signature and expiry check only; claims are not interpreted.
    ///
    /// This is the edge fast path: it confirms that *some* valid session
    /// token is present without decoding business fields.
    pub fn verify(&self, token: &str) -> bool {
        self.decode::<serde_json::Value>(token).is_some()
    }
}
