//! Shared test doubles and fixtures.

use std::path::Path;
use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::artifacts::{ArtifactPipeline, ArtifactSettings};
use crate::catalog::{CatalogEntry, Scanner};
use crate::categories::CategoryMap;
use crate::durations::DurationCache;
use crate::events::EventBus;
use crate::service::CatalogService;
use crate::state::{AppState, CatalogState, Paths};
use crate::transcoder::{ClipRequest, FrameRequest, TranscodeError, Transcoder};

/// Transcoder that counts calls and writes a placeholder target file.
#[derive(Default)]
pub struct StubTranscoder {
    frames: AtomicUsize,
    clips: AtomicUsize,
    lookups: AtomicUsize,
    duration: Mutex<Option<f64>>,
    fail: bool,
}

impl StubTranscoder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn frame_calls(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    pub fn clip_calls(&self) -> usize {
        self.clips.load(Ordering::SeqCst)
    }

    pub fn duration_calls(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Duration reported by every later lookup.
    pub fn set_duration(&self, secs: Option<f64>) {
        *self.duration.lock().unwrap() = secs;
    }

    fn write(&self, target: &Path) -> Result<(), TranscodeError> {
        if self.fail {
            return Err(TranscodeError::Failed {
                status: Some(1),
                stderr: "stub failure".to_string(),
            });
        }
        std::fs::write(target, b"artifact").map_err(|_| TranscodeError::NoOutput(target.to_path_buf()))
    }
}

#[async_trait]
impl Transcoder for StubTranscoder {
    async fn extract_frame(&self, req: &FrameRequest) -> Result<(), TranscodeError> {
        self.frames.fetch_add(1, Ordering::SeqCst);
        self.write(&req.target)
    }

    async fn extract_clip(&self, req: &ClipRequest) -> Result<(), TranscodeError> {
        self.clips.fetch_add(1, Ordering::SeqCst);
        self.write(&req.target)
    }

    async fn read_duration(&self, _source: &Path) -> Option<f64> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        *self.duration.lock().unwrap()
    }
}

/// Catalog entry with no modification time.
pub fn entry(collection: Option<&str>, file_name: &str) -> CatalogEntry {
    CatalogEntry {
        relative_path: match collection {
            Some(c) => format!("{c}/{file_name}"),
            None => file_name.to_string(),
        },
        file_name: file_name.to_string(),
        collection: collection.map(str::to_string),
        is_root: collection.is_none(),
        modified: None,
    }
}

/// Create an empty file (and its parents) under a test media root.
pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, b"stub").unwrap();
}

/// Application state over `media_dir` with artifacts in `<media_dir>/.gallery`.
pub fn app_state(media_dir: &Path, transcoder: Arc<StubTranscoder>) -> AppState {
    let scanner = Scanner::new(media_dir.to_path_buf());
    let total = scanner.count().unwrap_or(0);
    let events = EventBus::new();
    let transcoder: Arc<dyn Transcoder> = transcoder;
    let pipeline = Arc::new(ArtifactPipeline::new(
        transcoder.clone(),
        ArtifactSettings::default(),
        events.clone(),
    ));
    let paths = Paths {
        media_dir: media_dir.to_path_buf(),
        artifacts_dir: media_dir.join(".gallery"),
    };
    let durations = DurationCache::new(transcoder);
    let service = CatalogService::new(
        scanner,
        Arc::new(CatalogState::new(total)),
        pipeline,
        paths,
        events.clone(),
    )
    .with_categories(CategoryMap::default())
    .with_durations(durations);
    AppState::new(service, events)
}
