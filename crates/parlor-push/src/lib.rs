// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expo push notification client for the Parlor chat relay.
//!
//! Fan-out is single-token: the relay notifies at most one registered device.
//! Delivery is best effort; callers must never let a push failure fail the
//! message append that triggered it.

pub mod client;
pub mod types;

pub use client::{is_valid_expo_token, ExpoPushClient};
pub use types::{PushData, PushMessage, PushTicket};
