// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Module
//!
//! The signed-cookie session protocol: claims model, token codec and the
//! cookie wire contract. The server holds no session table - the signed
//! cookie in the client's jar *is* the session.

pub mod claims;
pub mod codec;
pub mod cookies;

pub use claims::{ErrorClaims, SessionClaims, UserProfile};
pub use codec::SessionCodec;
