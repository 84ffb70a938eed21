//! Block fetch CLI command.
//!
//! Loads the configuration, starts the application, requests one terrain
//! block per quadkey and reports what every layer delivered.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use globecache::app::GlobeApp;
use globecache::config::ConfigFile;
use globecache::coord::QuadKey;
use globecache::logging::init_logging;
use globecache::orchestrator::{LayerSlot, TerrainBlock, TileOrchestrator};

use crate::error::CliError;

/// Arguments for `globecache fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Configuration file (default: ~/.globecache/config.ini)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Quadkeys of the blocks to fetch
    #[arg(required = true)]
    quadkeys: Vec<String>,
}

/// Run the fetch command.
pub fn run(args: FetchArgs) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let quadkeys = args
        .quadkeys
        .iter()
        .map(|q| QuadKey::parse(q))
        .collect::<Result<Vec<_>, _>>()?;

    let _logging_guard = init_logging(&config.logging.directory, &config.logging.file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    // The orchestrator lives on a single event loop.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(fetch(&config, &quadkeys))
}

async fn fetch(config: &ConfigFile, quadkeys: &[QuadKey]) -> Result<(), CliError> {
    let mut app = GlobeApp::start(config).await?;

    if app.orchestrator().has_failed() {
        app.shutdown();
        return Err(CliError::LayersFailed);
    }

    info!(blocks = quadkeys.len(), "Fetching blocks");
    let handles = app.fetch_blocks(quadkeys).await?;

    let orchestrator = app.orchestrator();
    for (quadkey, handle) in quadkeys.iter().zip(handles) {
        match orchestrator.block(handle) {
            Some(block) => print!("{}", report_block(orchestrator, block)),
            None => println!("{}: evicted before it could be reported", quadkey),
        }
    }

    println!();
    println!("Fetch: {}", orchestrator.stats());
    println!("Cache: {}", orchestrator.cache_stats());

    app.shutdown();
    Ok(())
}

fn report_block(orchestrator: &TileOrchestrator, block: &TerrainBlock) -> String {
    let mut out = format!("{} ({:?})\n", block.quadkey(), block.image_composition());
    let layers = orchestrator
        .image_providers()
        .iter()
        .zip(block.images())
        .map(|(p, slot)| ("image", p, slot))
        .chain(
            orchestrator
                .elevation_providers()
                .iter()
                .zip(block.elevations())
                .map(|(p, slot)| ("elevation", p, slot)),
        );
    for (role, provider, slot) in layers {
        out.push_str(&format!(
            "  {:<9} {:<16} {}\n",
            role,
            provider.name(),
            describe_slot(slot)
        ));
    }
    out
}

fn describe_slot(slot: &LayerSlot) -> String {
    match slot {
        LayerSlot::Pending => "pending".to_string(),
        LayerSlot::Loaded(tile) => format!("{} bytes ({})", tile.len(), tile.format),
        LayerSlot::Failed(e) => format!("failed: {}", e),
        LayerSlot::NotCovered => "not covered".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globecache::provider::{ProviderError, TileData};

    #[test]
    fn test_describe_slot() {
        let tile = TileData::new(QuadKey::root(), "image/jpeg", vec![0u8; 12]);
        assert_eq!(describe_slot(&LayerSlot::Loaded(tile)), "12 bytes (image/jpeg)");
        assert_eq!(describe_slot(&LayerSlot::NotCovered), "not covered");
        assert_eq!(
            describe_slot(&LayerSlot::Failed(ProviderError::HttpError("timeout".into()))),
            "failed: HTTP error: timeout"
        );
    }
}
