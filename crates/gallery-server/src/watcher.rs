//! Media root change watcher.
//!
//! One non-recursive watch is held on the root and on each collection
//! directory. Watch callbacks forward raw events into a channel consumed by a
//! single loop thread, which owns the watch set and applies catalog updates.
//! The watch set is rebuilt on a timer so new collection directories are
//! picked up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::catalog::Scanner;
use crate::errors::CatalogError;
use crate::events::EventBus;
use crate::state::CatalogState;

pub const DEFAULT_RESUBSCRIBE_INTERVAL: Duration = Duration::from_secs(60);

enum WatchCommand {
    Shutdown,
}

/// Handle to the watcher thread.
pub struct WatcherHandle {
    command_tx: Sender<WatchCommand>,
    thread: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Stop the loop and wait for the thread to exit.
    pub fn shutdown(mut self) {
        let _ = self.command_tx.send(WatchCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

pub struct ChangeWatcher {
    scanner: Scanner,
    catalog: Arc<CatalogState>,
    events: EventBus,
    watches: HashMap<String, RecommendedWatcher>,
    notify_tx: Sender<notify::Result<Event>>,
    notify_rx: Receiver<notify::Result<Event>>,
}

impl ChangeWatcher {
    pub fn new(scanner: Scanner, catalog: Arc<CatalogState>, events: EventBus) -> Self {
        let (notify_tx, notify_rx) = crossbeam_channel::unbounded();
        Self {
            scanner,
            catalog,
            events,
            watches: HashMap::new(),
            notify_tx,
            notify_rx,
        }
    }

    /// Subscribe and run the loop on a dedicated thread.
    pub fn spawn(mut self, resubscribe_interval: Duration) -> std::io::Result<WatcherHandle> {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name("gallery-watcher".into())
            .spawn(move || {
                self.resubscribe();
                self.run(command_rx, resubscribe_interval);
            })?;
        Ok(WatcherHandle {
            command_tx,
            thread: Some(thread),
        })
    }

    fn run(mut self, command_rx: Receiver<WatchCommand>, resubscribe_interval: Duration) {
        tracing::info!(
            root = %self.scanner.root().display(),
            interval_secs = resubscribe_interval.as_secs(),
            "change watcher started"
        );
        let ticker = crossbeam_channel::tick(resubscribe_interval);
        let notify_rx = self.notify_rx.clone();
        loop {
            crossbeam_channel::select! {
                recv(command_rx) -> cmd => match cmd {
                    Ok(WatchCommand::Shutdown) | Err(_) => break,
                },
                recv(notify_rx) -> event => {
                    let Ok(first) = event else { break };
                    // Coalesce a burst of notifications into one refresh.
                    let mut batch = vec![first];
                    batch.extend(notify_rx.try_iter());
                    self.handle_batch(batch);
                }
                recv(ticker) -> _ => self.resubscribe(),
            }
        }
        self.watches.clear();
        self.catalog.set_watched_directories(0);
        tracing::info!("change watcher stopped");
    }

    /// Drop every watch and watch the root plus each current collection directory.
    pub fn resubscribe(&mut self) {
        self.watches.clear();
        let root = self.scanner.root().to_path_buf();
        match self.scanner.collection_dirs() {
            Ok(dirs) => {
                self.add_watch(String::new(), root.clone());
                for dir in dirs {
                    let path = root.join(&dir);
                    self.add_watch(dir, path);
                }
            }
            Err(err) => tracing::warn!(error = %err, "cannot list media root for watching"),
        }
        self.catalog.set_watched_directories(self.watches.len());
        tracing::debug!(watches = self.watches.len(), "watch set rebuilt");
    }

    fn add_watch(&mut self, key: String, dir: PathBuf) {
        match self.watch_dir(&dir) {
            Ok(watcher) => {
                self.watches.insert(key, watcher);
            }
            Err(err) => tracing::warn!(error = %err, "skipping directory watch"),
        }
    }

    fn watch_dir(&self, dir: &Path) -> Result<RecommendedWatcher, CatalogError> {
        let failed = |err: notify::Error| CatalogError::WatchSubscriptionFailed {
            dir: dir.to_path_buf(),
            reason: err.to_string(),
        };
        let tx = self.notify_tx.clone();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .map_err(failed)?;
        watcher.watch(dir, RecursiveMode::NonRecursive).map_err(failed)?;
        Ok(watcher)
    }

    /// Apply one refresh if any event in `batch` touched a video file.
    fn handle_batch(&mut self, batch: Vec<notify::Result<Event>>) -> bool {
        let mut relevant = false;
        for event in batch {
            match event {
                Ok(event) => relevant |= is_video_event(&self.scanner, &event),
                Err(err) => tracing::debug!(error = %err, "watch error"),
            }
        }
        if !relevant {
            return false;
        }

        match self.scanner.count() {
            Ok(total) => self.catalog.set_total_videos(total),
            Err(err) => tracing::warn!(error = %err, "recount after change failed"),
        }
        let epoch = self.catalog.reshuffle();
        let total = self.catalog.total_videos();
        tracing::info!(total, generation = epoch.generation, "catalog changed");
        self.events.catalog_changed(total);
        self.resubscribe();
        true
    }
}

/// True when a non-access event names a file with a recognized video extension.
fn is_video_event(scanner: &Scanner, event: &Event) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.iter().any(|path| {
        path.file_name()
            .is_some_and(|name| scanner.is_video_name(name))
    })
}
