// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for Parlor's pluggable seams.

pub mod store;

pub use store::RelayStore;
