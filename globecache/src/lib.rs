//! GlobeCache - quadtree tile addressing and caching for virtual globes
//!
//! This library provides the tile plumbing of a virtual globe: quadkey
//! addressing, a bounded cache with deferred eviction, and an orchestrator
//! that assembles terrain blocks from image and elevation providers.
//!
//! # Modules
//!
//! - [`coord`] - quadkey codec and geographic bounds
//! - [`cache`] - bounded cache with priorities, expiration and disposal
//! - [`registry`] - generation-checked handles to owned values
//! - [`provider`] - tile provider contract and HTTP backends
//! - [`orchestrator`] - terrain block cache and request fan-out
//! - [`config`] - INI configuration file
//! - [`logging`] - tracing subscriber setup
//! - [`app`] - bootstrap from configuration to a running orchestrator

pub mod app;
pub mod cache;
pub mod config;
pub mod coord;
pub mod logging;
pub mod orchestrator;
pub mod provider;
pub mod registry;
