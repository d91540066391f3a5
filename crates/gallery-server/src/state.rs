//! Shared application state.
//!
//! `CatalogState` owns the process-wide mutable catalog values (shuffle epoch,
//! cached counts); `AppState` is what Actix handlers receive.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::events::EventBus;
use crate::service::CatalogService;
use crate::shuffle::ShuffleEpoch;

/// Process-wide catalog counters and randomization state.
pub struct CatalogState {
    epoch: RwLock<ShuffleEpoch>,
    total_videos: AtomicUsize,
    watched_directories: AtomicUsize,
}

impl CatalogState {
    pub fn new(initial_total: usize) -> Self {
        Self::with_epoch(ShuffleEpoch::initial(), initial_total)
    }

    pub fn with_epoch(epoch: ShuffleEpoch, initial_total: usize) -> Self {
        Self {
            epoch: RwLock::new(epoch),
            total_videos: AtomicUsize::new(initial_total),
            watched_directories: AtomicUsize::new(0),
        }
    }

    /// Snapshot of the current epoch.
    pub fn epoch(&self) -> ShuffleEpoch {
        *self.epoch.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the epoch with a freshly seeded one and return it.
    pub fn reshuffle(&self) -> ShuffleEpoch {
        let mut guard = self.epoch.write().unwrap_or_else(|e| e.into_inner());
        *guard = guard.next();
        *guard
    }

    pub fn total_videos(&self) -> usize {
        self.total_videos.load(Ordering::Relaxed)
    }

    pub fn set_total_videos(&self, total: usize) {
        self.total_videos.store(total, Ordering::Relaxed);
    }

    pub fn watched_directories(&self) -> usize {
        self.watched_directories.load(Ordering::Relaxed)
    }

    pub fn set_watched_directories(&self, count: usize) {
        self.watched_directories.store(count, Ordering::Relaxed);
    }
}

/// Filesystem locations used by the server.
#[derive(Clone, Debug)]
pub struct Paths {
    /// Media root (canonical).
    pub media_dir: PathBuf,
    /// Directory holding generated thumbnails and preview clips.
    pub artifacts_dir: PathBuf,
}

/// Shared application state for Actix handlers.
pub struct AppState {
    pub service: CatalogService,
    pub events: EventBus,
}

impl AppState {
    pub fn new(service: CatalogService, events: EventBus) -> Self {
        Self { service, events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reshuffle_replaces_seed_and_bumps_generation() {
        let state = CatalogState::with_epoch(ShuffleEpoch { seed: 0.5, generation: 0 }, 3);
        let next = state.reshuffle();
        assert_eq!(next.generation, 1);
        assert_eq!(state.epoch(), next);
    }

    #[test]
    fn counters_round_trip() {
        let state = CatalogState::new(0);
        state.set_total_videos(12);
        state.set_watched_directories(4);
        assert_eq!(state.total_videos(), 12);
        assert_eq!(state.watched_directories(), 4);
    }
}
