//! Integration tests for the tile orchestrator.
//!
//! These drive a [`TileOrchestrator`] against scripted providers whose
//! requests stay open until the test answers them, covering:
//! - request deduplication and readiness gating
//! - applying completions on `tick` and `settle`
//! - eviction, stale completions and idle expiration
//!
//! Run with: `cargo test --test orchestrator_integration`

mod common;

use std::sync::Arc;
use std::time::Duration;

use globecache::cache::CachePriority;
use globecache::orchestrator::{
    ImageComposition, LayerRef, LayerSlot, OrchestratorConfig, OrchestratorError,
    TileOrchestrator,
};

use common::{as_dyn, qk, ScriptedProvider};

// ============================================================================
// Helper Functions
// ============================================================================

struct Fixture {
    image: Arc<ScriptedProvider>,
    elevation: Arc<ScriptedProvider>,
    orchestrator: TileOrchestrator,
}

fn fixture(config: OrchestratorConfig) -> Fixture {
    let image = ScriptedProvider::new("imagery");
    let elevation = ScriptedProvider::with_max_lod("terrain", 15);
    let orchestrator =
        TileOrchestrator::new(vec![as_dyn(&image)], vec![as_dyn(&elevation)], config).unwrap();
    Fixture {
        image,
        elevation,
        orchestrator,
    }
}

fn small_cache() -> OrchestratorConfig {
    // purge_size = round(2 * 0.5) = 1
    OrchestratorConfig::default()
        .with_max_blocks(2)
        .with_fill_factor(0.5)
}

// ============================================================================
// Readiness
// ============================================================================

#[tokio::test]
async fn test_requests_rejected_until_providers_ready() {
    let mut f = fixture(OrchestratorConfig::default());
    f.elevation.set_ready(false);

    assert!(!f.orchestrator.is_ready());
    assert_eq!(
        f.orchestrator.request_block(&qk("0312")),
        Err(OrchestratorError::NotReady)
    );
    assert_eq!(f.orchestrator.block_count(), 0);
    assert_eq!(f.image.request_count(), 0);

    f.elevation.set_ready(true);
    assert!(f.orchestrator.request_block(&qk("0312")).is_ok());
    assert_eq!(f.image.request_count(), 1);
    assert_eq!(f.elevation.request_count(), 1);
}

#[test]
fn test_not_ready_without_image_provider() {
    let elevation = ScriptedProvider::new("terrain");
    let orchestrator =
        TileOrchestrator::new(vec![], vec![as_dyn(&elevation)], OrchestratorConfig::default())
            .unwrap();
    assert!(!orchestrator.is_ready());
}

#[test]
fn test_failed_provider_reported() {
    let f = fixture(OrchestratorConfig::default());
    assert!(!f.orchestrator.has_failed());
    f.elevation.set_failed(true);
    assert!(f.orchestrator.has_failed());
}

// ============================================================================
// Request Deduplication
// ============================================================================

#[tokio::test]
async fn test_repeated_request_returns_same_block() {
    let mut f = fixture(OrchestratorConfig::default());
    let quadkey = qk("120");

    let first = f.orchestrator.request_block(&quadkey).unwrap();
    let second = f.orchestrator.request_block(&quadkey).unwrap();

    assert_eq!(first, second);
    assert_eq!(f.image.requests_for(&quadkey), 1);
    assert_eq!(f.elevation.requests_for(&quadkey), 1);
    assert_eq!(f.orchestrator.block_count(), 1);

    let stats = f.orchestrator.stats();
    assert_eq!(stats.blocks_created, 1);
    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.outstanding(), 2);
}

#[tokio::test]
async fn test_get_cached_block_never_fetches() {
    let mut f = fixture(OrchestratorConfig::default());

    assert!(f.orchestrator.get_cached_block(&qk("0")).is_none());
    assert_eq!(f.image.request_count(), 0);
    assert_eq!(f.orchestrator.block_count(), 0);

    let handle = f.orchestrator.request_block(&qk("0")).unwrap();
    assert_eq!(f.orchestrator.get_cached_block(&qk("0")), Some(handle));
    assert_eq!(f.image.request_count(), 1);
}

// ============================================================================
// Completions
// ============================================================================

#[tokio::test]
async fn test_tick_applies_completions() {
    let mut f = fixture(OrchestratorConfig::default());
    let quadkey = qk("0213");
    let handle = f.orchestrator.request_block(&quadkey).unwrap();

    let report = f.orchestrator.tick();
    assert_eq!(report.completions, 0);
    assert!(!f.orchestrator.block(handle).unwrap().is_image_ready());

    assert!(f.image.complete_ok(&quadkey, &[1, 2, 3]));
    assert_eq!(f.orchestrator.tick().completions, 1);

    let block = f.orchestrator.block(handle).unwrap();
    assert!(block.is_image_ready());
    assert!(!block.is_elevation_ready());
    assert!(!block.is_available());

    assert!(f.elevation.complete_ok(&quadkey, &[9]));
    f.orchestrator.tick();

    let block = f.orchestrator.block(handle).unwrap();
    assert!(block.is_available());
    assert_eq!(block.image_composition(), ImageComposition::Single(0));
    assert_eq!(block.elevation().map(|tile| tile.len()), Some(1));

    let stats = f.orchestrator.stats();
    assert_eq!(stats.loaded, 2);
    assert_eq!(stats.bytes_loaded, 4);
    assert_eq!(stats.outstanding(), 0);
    assert_eq!(f.orchestrator.in_flight(), 0);
}

#[tokio::test]
async fn test_partial_failure_still_available() {
    let mut f = fixture(OrchestratorConfig::default());
    let quadkey = qk("3");
    let handle = f.orchestrator.request_block(&quadkey).unwrap();

    f.image.complete_ok(&quadkey, &[7]);
    f.elevation.fail(&quadkey, "503 Service Unavailable");
    f.orchestrator.tick();

    let block = f.orchestrator.block(handle).unwrap();
    assert!(block.is_available());
    assert!(block.has_failed());
    assert!(matches!(
        block.slot(LayerRef::elevation(0)),
        Some(LayerSlot::Failed(_))
    ));
    assert_eq!(f.orchestrator.stats().failed, 1);
    assert_eq!(f.orchestrator.stats().loaded, 1);
}

#[tokio::test]
async fn test_uncovered_layer_is_skipped() {
    let mut f = fixture(OrchestratorConfig::default());
    let quadkey = qk("22");
    f.elevation.uncover(&quadkey);

    let handle = f.orchestrator.request_block(&quadkey).unwrap();

    assert_eq!(f.elevation.request_count(), 0);
    assert_eq!(f.orchestrator.in_flight(), 1);
    assert_eq!(f.orchestrator.stats().not_covered, 1);

    let block = f.orchestrator.block(handle).unwrap();
    assert!(block.is_elevation_ready());
    assert_eq!(
        block.slot(LayerRef::elevation(0)),
        Some(&LayerSlot::NotCovered)
    );
}

#[tokio::test]
async fn test_settle_waits_for_all_fetches() {
    let mut f = fixture(OrchestratorConfig::default());
    let quadkey = qk("101");
    let handle = f.orchestrator.request_block(&quadkey).unwrap();

    let image = Arc::clone(&f.image);
    let elevation = Arc::clone(&f.elevation);
    let answer = quadkey.clone();
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        image.complete_ok(&answer, &[1]);
        tokio::task::yield_now().await;
        elevation.complete_ok(&answer, &[2]);
    });

    let report = f.orchestrator.settle().await;

    assert_eq!(report.completions, 2);
    assert!(!f.orchestrator.has_pending_work());
    assert!(f.orchestrator.block(handle).unwrap().is_available());
}

// ============================================================================
// Eviction
// ============================================================================

#[tokio::test]
async fn test_eviction_releases_block_and_drops_late_completion() {
    let mut f = fixture(small_cache());
    let (a, b, c) = (qk("0"), qk("1"), qk("2"));

    let handle_a = f.orchestrator.request_block(&a).unwrap();
    f.orchestrator.request_block(&b).unwrap();
    f.orchestrator.request_block(&c).unwrap();
    assert_eq!(f.orchestrator.block_count(), 3);

    // Over capacity: the purge keeps only the most recent block.
    let report = f.orchestrator.tick();
    assert_eq!(report.released, 2);
    assert_eq!(f.orchestrator.block_count(), 1);
    assert!(f.orchestrator.block(handle_a).is_none());
    assert!(f.orchestrator.get_cached_block(&a).is_none());
    assert!(f.orchestrator.get_cached_block(&c).is_some());

    assert!(f.image.complete_ok(&a, &[1]));
    assert_eq!(f.orchestrator.tick().completions, 1);
    assert_eq!(f.orchestrator.stats().stale_dropped, 1);
    assert_eq!(f.orchestrator.stats().loaded, 0);
}

#[tokio::test]
async fn test_request_after_eviction_fetches_again() {
    let mut f = fixture(small_cache());
    let (a, b, c) = (qk("0"), qk("1"), qk("2"));

    let old = f.orchestrator.request_block(&a).unwrap();
    f.orchestrator.request_block(&b).unwrap();
    f.orchestrator.request_block(&c).unwrap();
    f.orchestrator.tick();

    let new = f.orchestrator.request_block(&a).unwrap();

    assert_ne!(old, new);
    assert!(f.orchestrator.block(old).is_none());
    assert_eq!(f.image.requests_for(&a), 2);
    assert_eq!(f.orchestrator.stats().blocks_created, 4);

    // The first request for `a` answers late and must not land on the new block.
    assert!(f.image.complete_ok(&a, &[1]));
    assert_eq!(f.orchestrator.tick().completions, 1);
    assert_eq!(
        f.orchestrator.block(new).unwrap().slot(LayerRef::image(0)),
        Some(&LayerSlot::Pending)
    );
    assert_eq!(f.orchestrator.stats().stale_dropped, 1);
    assert_eq!(f.orchestrator.stats().loaded, 0);

    // The second one belongs to the new block.
    assert!(f.image.complete_ok(&a, &[2, 3]));
    f.orchestrator.tick();
    assert!(f.orchestrator.block(new).unwrap().is_image_ready());
    assert_eq!(f.orchestrator.stats().loaded, 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_completion_after_idle_expiry_is_dropped() {
    let config = OrchestratorConfig::default().with_expire_after_idle(Duration::from_secs(10));
    let mut f = fixture(config);
    let quadkey = qk("2130");

    let old = f.orchestrator.request_block(&quadkey).unwrap();
    tokio::time::advance(Duration::from_secs(11)).await;

    // The lookup drops the expired entry; no maintenance runs before the
    // block is requested again.
    assert!(f.orchestrator.get_cached_block(&quadkey).is_none());
    let new = f.orchestrator.request_block(&quadkey).unwrap();
    assert_ne!(old, new);
    assert_eq!(f.image.requests_for(&quadkey), 2);

    assert!(f.image.complete_ok(&quadkey, &[1]));
    assert!(f.elevation.complete_ok(&quadkey, &[2]));
    let report = f.orchestrator.tick();
    assert_eq!(report.completions, 2);
    assert_eq!(report.released, 1);

    let block = f.orchestrator.block(new).unwrap();
    assert_eq!(block.slot(LayerRef::image(0)), Some(&LayerSlot::Pending));
    assert_eq!(block.slot(LayerRef::elevation(0)), Some(&LayerSlot::Pending));
    assert!(f.orchestrator.block(old).is_none());
    assert_eq!(f.orchestrator.stats().stale_dropped, 2);
    assert_eq!(f.orchestrator.get_cached_block(&quadkey), Some(new));
}

#[test]
fn test_invalid_fill_factor_rejected() {
    let image = ScriptedProvider::new("imagery");
    let result = TileOrchestrator::new(
        vec![as_dyn(&image)],
        vec![],
        OrchestratorConfig::default().with_fill_factor(0.0),
    );
    assert!(matches!(result, Err(OrchestratorError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_high_priority_block_survives_purge() {
    let mut f = fixture(small_cache());
    let (a, b, c) = (qk("0"), qk("1"), qk("2"));

    let kept = f
        .orchestrator
        .request_block_with_priority(&a, CachePriority::High)
        .unwrap();
    f.orchestrator.request_block(&b).unwrap();
    f.orchestrator.request_block(&c).unwrap();
    f.orchestrator.tick();

    assert!(f.orchestrator.block(kept).is_some());
    assert!(f.orchestrator.get_cached_block(&b).is_none());
    assert!(f.orchestrator.get_cached_block(&c).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_idle_block_expires() {
    let config = OrchestratorConfig::default().with_expire_after_idle(Duration::from_secs(10));
    let mut f = fixture(config);
    let quadkey = qk("031");

    let handle = f.orchestrator.request_block(&quadkey).unwrap();
    f.image.complete_ok(&quadkey, &[1]);
    f.elevation.complete_ok(&quadkey, &[2]);
    f.orchestrator.tick();

    tokio::time::advance(Duration::from_secs(6)).await;
    assert_eq!(f.orchestrator.get_cached_block(&quadkey), Some(handle));

    tokio::time::advance(Duration::from_secs(6)).await;
    assert_eq!(f.orchestrator.get_cached_block(&quadkey), Some(handle));

    tokio::time::advance(Duration::from_secs(11)).await;
    assert!(f.orchestrator.get_cached_block(&quadkey).is_none());

    assert_eq!(f.orchestrator.tick().released, 1);
    assert!(f.orchestrator.block(handle).is_none());

    f.orchestrator.request_block(&quadkey).unwrap();
    assert_eq!(f.image.requests_for(&quadkey), 2);
}

// ============================================================================
// Level of Detail and Teardown
// ============================================================================

#[test]
fn test_max_lod_uses_elevation_minus_one() {
    let f = fixture(OrchestratorConfig::default());
    // imagery 18, terrain 15
    assert_eq!(f.orchestrator.max_lod(), 14);

    let image = ScriptedProvider::with_max_lod("imagery", 18);
    let images_only =
        TileOrchestrator::new(vec![as_dyn(&image)], vec![], OrchestratorConfig::default())
            .unwrap();
    assert_eq!(images_only.max_lod(), 18);

    let empty = TileOrchestrator::new(vec![], vec![], OrchestratorConfig::default()).unwrap();
    assert_eq!(empty.max_lod(), 0);
}

#[tokio::test]
async fn test_destroy_releases_everything() {
    let mut f = fixture(OrchestratorConfig::default());
    let quadkey = qk("0123");
    let handle = f.orchestrator.request_block(&quadkey).unwrap();

    f.orchestrator.destroy();

    assert_eq!(f.orchestrator.block_count(), 0);
    assert_eq!(f.orchestrator.in_flight(), 0);
    assert!(f.orchestrator.block(handle).is_none());
    assert!(!f.orchestrator.is_ready());
    assert_eq!(
        f.orchestrator.request_block(&quadkey),
        Err(OrchestratorError::NotReady)
    );

    // The fetch futures were dropped with their receivers.
    assert!(!f.image.complete_ok(&quadkey, &[1]));
}
