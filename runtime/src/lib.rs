// Copyright 2026 WebSource Contributors
// SPDX-License-Identifier: Apache-2.0

//! WebSource runtime library: recover a page's HTML through an ordered
//! ladder of fetch strategies.
//!
//! This library crate exposes the core modules for the binary and for
//! integration testing.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod export;
pub mod history;
pub mod renderer;
pub mod rest;
pub mod server;
