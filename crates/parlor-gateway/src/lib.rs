// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/SSE gateway for the Parlor chat relay.
//!
//! The gateway owns the wire contract: camelCase DTOs, sender relabeling for
//! the UI, cursor strings, and the SSE protocols for the live stream and the
//! AI lane. Everything durable goes through [`parlor_core::RelayStore`].

pub mod ai_stream;
pub mod handlers;
pub mod server;
pub mod stream;
pub mod wire;

pub use server::{build_router, start_server, GatewayState};
