// Copyright (C) 2025 TDB Contributors
// SPDX-License-Identifier: AGPL-3.0
//! TDB Common - Shared functionality for TDB components
//!
//! This crate provides the types shared by the debuggee engine and its
//! hosts: code cells and positions, VM values, breakpoints, stack frames,
//! and the compiler's debug-info table, plus logging setup and the strict
//! assertion macros.

pub mod logging;
pub mod macros;
pub mod types;
