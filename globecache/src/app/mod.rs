//! Application bootstrap and lifecycle management.
//!
//! This module provides the `GlobeApp` type which turns a configuration
//! file into a running tile orchestrator and tears it down again.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        GlobeApp                          │
//! │                                                          │
//! │  ConfigFile ──► AppConfig ──► ProviderFactory            │
//! │                                 │                        │
//! │                                 ▼                        │
//! │              image / elevation providers (prepare())     │
//! │                                 │                        │
//! │                                 ▼                        │
//! │                         TileOrchestrator                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use globecache::app::GlobeApp;
//! use globecache::config::ConfigFile;
//!
//! let mut app = GlobeApp::start(&ConfigFile::load()?).await?;
//! app.orchestrator_mut().request_block(&"0312".parse()?)?;
//! app.orchestrator_mut().settle().await;
//! app.shutdown();
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::GlobeApp;
pub use config::AppConfig;
pub use error::AppError;
