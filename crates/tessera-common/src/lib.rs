//! Common utilities for the Tessera UI toolkit.
//!
//! This crate provides shared infrastructure used by all toolkit components:
//! - **Warning System** - colored terminal output for recoverable problems

pub mod warning;
