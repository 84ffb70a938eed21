//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (init, path)
//! - [`fetch`] - Fetch terrain blocks through the configured layers
//! - [`quadkey`] - Quadkey inspection (inspect, at)

pub mod config;
pub mod fetch;
pub mod quadkey;
