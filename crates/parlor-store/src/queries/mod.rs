// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query operations over the relay schema.

pub mod conversations;
pub mod cursors;
pub mod log;
pub mod maintenance;
pub mod push_token;
pub mod read_status;
pub mod sessions;
