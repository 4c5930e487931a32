// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sessiongate - Session Authentication Gateway
//!
//! This crate provides session-based authentication for the chat web
//! application: a signed-cookie session protocol, three-tier identity
//! resolution (mock / virtual / provider) and pre-routing edge admission
//! control. The server is stateless; the signed cookie is the session.
//!
//! ## Modules
//!
//! - `api` - HTTP endpoints (Axum): session lifecycle, impersonation, health
//! - `auth` - Identity resolution, edge gate and the provider interface
//! - `session` - Claims model, token codec and cookie wire contract
//! - `config` - Process-wide configuration, read once at startup

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod session;
pub mod state;
