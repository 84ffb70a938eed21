//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use globecache::coord::QuadKey;
use globecache::provider::{ProviderError, TileData, TileFuture, TileProvider};

type Reply = oneshot::Sender<Result<TileData, ProviderError>>;

/// A provider whose requests stay pending until the test answers them.
pub struct ScriptedProvider {
    name: String,
    max_lod: u8,
    ready: AtomicBool,
    failed: AtomicBool,
    uncovered: Mutex<HashSet<QuadKey>>,
    pending: Mutex<HashMap<QuadKey, Vec<Reply>>>,
    requests: Mutex<Vec<QuadKey>>,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_max_lod(name, 18)
    }

    pub fn with_max_lod(name: &str, max_lod: u8) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            max_lod,
            ready: AtomicBool::new(true),
            failed: AtomicBool::new(false),
            uncovered: Mutex::new(HashSet::new()),
            pending: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_failed(&self, failed: bool) {
        self.failed.store(failed, Ordering::SeqCst);
    }

    pub fn uncover(&self, quadkey: &QuadKey) {
        self.uncovered.lock().insert(quadkey.clone());
    }

    /// Answer the oldest open request for `quadkey`. Returns false if
    /// there is none or its receiver is gone.
    pub fn complete(&self, quadkey: &QuadKey, result: Result<TileData, ProviderError>) -> bool {
        let reply = {
            let mut pending = self.pending.lock();
            match pending.get_mut(quadkey) {
                Some(replies) if !replies.is_empty() => replies.remove(0),
                _ => return false,
            }
        };
        reply.send(result).is_ok()
    }

    pub fn complete_ok(&self, quadkey: &QuadKey, bytes: &[u8]) -> bool {
        let tile = TileData::new(quadkey.clone(), "image/png", bytes.to_vec());
        self.complete(quadkey, Ok(tile))
    }

    pub fn fail(&self, quadkey: &QuadKey, reason: &str) -> bool {
        self.complete(quadkey, Err(ProviderError::HttpError(reason.to_string())))
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests_for(&self, quadkey: &QuadKey) -> usize {
        self.requests.lock().iter().filter(|q| *q == quadkey).count()
    }
}

impl TileProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn min_lod(&self) -> u8 {
        0
    }

    fn max_lod(&self) -> u8 {
        self.max_lod
    }

    fn contains(&self, quadkey: &QuadKey) -> bool {
        !self.uncovered.lock().contains(quadkey)
    }

    fn request_tile(&self, quadkey: &QuadKey) -> TileFuture {
        let (tx, rx) = oneshot::channel();
        self.requests.lock().push(quadkey.clone());
        self.pending
            .lock()
            .entry(quadkey.clone())
            .or_default()
            .push(tx);

        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(ProviderError::ProviderSpecific("request dropped".into())))
        })
    }
}

pub fn qk(s: &str) -> QuadKey {
    s.parse().expect("valid quadkey")
}

pub fn as_dyn(provider: &Arc<ScriptedProvider>) -> Arc<dyn TileProvider> {
    Arc::clone(provider) as Arc<dyn TileProvider>
}
