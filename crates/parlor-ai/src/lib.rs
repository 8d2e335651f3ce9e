// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini AI collaborator client for the Parlor chat relay.
//!
//! The AI lane is transient: nothing it produces touches the message store.
//! This crate only speaks the provider protocol; relaying chunks to the
//! browser is the gateway's job.

pub mod client;
pub mod types;

pub use client::{resolve_system_prompt, GeminiClient};
pub use types::Content;
