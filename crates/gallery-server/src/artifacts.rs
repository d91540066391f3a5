//! Derived-artifact pipeline (thumbnails and preview clips).
//!
//! Requests enqueue jobs synchronously; two timers drain the pending sets in
//! small concurrent batches. Jobs are never retried: a failed job is dropped
//! and will be re-enqueued by the next listing that sees the artifact missing.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::join_all;
use rand::Rng;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use utoipa::ToSchema;

use crate::catalog::CatalogEntry;
use crate::errors::CatalogError;
use crate::events::EventBus;
use crate::transcoder::{ClipRequest, FramePosition, FrameRequest, Transcoder};

/// Candidate positions (percent of duration) for thumbnail frames.
const THUMBNAIL_PERCENTS: [u8; 5] = [5, 10, 15, 20, 25];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Thumbnail,
    PreviewClip,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Thumbnail => "thumbnail",
            ArtifactKind::PreviewClip => "preview_clip",
        }
    }
}

/// One unit of derived-artifact work. Identity is `(target_path, kind)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactJob {
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub kind: ArtifactKind,
}

/// Target locations of both artifacts for one catalog entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactTargets {
    pub thumbnail: PathBuf,
    pub preview: PathBuf,
}

impl ArtifactTargets {
    pub fn for_entry(entry: &CatalogEntry, artifacts_dir: &Path) -> Self {
        Self {
            thumbnail: artifacts_dir.join(thumbnail_name(entry)),
            preview: artifacts_dir.join(preview_name(entry)),
        }
    }
}

/// `<collection>_<stem>.jpg`, or `<stem>.jpg` for root entries.
pub fn thumbnail_name(entry: &CatalogEntry) -> String {
    format!("{}.jpg", artifact_base(entry))
}

/// `<collection>_<stem>_preview.mp4`, or `<stem>_preview.mp4` for root entries.
pub fn preview_name(entry: &CatalogEntry) -> String {
    format!("{}_preview.mp4", artifact_base(entry))
}

fn artifact_base(entry: &CatalogEntry) -> String {
    let stem = Path::new(&entry.file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| entry.file_name.clone());
    match entry.collection.as_deref() {
        Some(collection) => format!("{collection}_{stem}"),
        None => stem,
    }
}

/// Tunables for artifact generation.
#[derive(Clone, Debug, PartialEq)]
pub struct ArtifactSettings {
    pub batch_size: usize,
    pub thumbnail_interval: Duration,
    pub preview_interval: Duration,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub preview_offset_secs: f64,
    pub preview_duration_secs: f64,
    pub preview_width: u32,
    pub preview_fps: u32,
    pub preview_bitrate_kbps: u32,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            batch_size: 2,
            thumbnail_interval: Duration::from_millis(3000),
            preview_interval: Duration::from_millis(10_000),
            thumbnail_width: 640,
            thumbnail_height: 360,
            preview_offset_secs: 10.0,
            preview_duration_secs: 4.0,
            preview_width: 320,
            preview_fps: 15,
            preview_bitrate_kbps: 400,
        }
    }
}

impl ArtifactSettings {
    fn interval(&self, kind: ArtifactKind) -> Duration {
        match kind {
            ArtifactKind::Thumbnail => self.thumbnail_interval,
            ArtifactKind::PreviewClip => self.preview_interval,
        }
    }
}

/// Insertion-ordered set of pending jobs keyed by target path.
///
/// Keys stay reserved while a job is in flight so a concurrent enqueue of the
/// same target does not schedule a second attempt.
#[derive(Default)]
struct PendingSet {
    queue: VecDeque<ArtifactJob>,
    reserved: HashSet<PathBuf>,
}

impl PendingSet {
    fn insert(&mut self, job: ArtifactJob) -> bool {
        if !self.reserved.insert(job.target_path.clone()) {
            return false;
        }
        self.queue.push_back(job);
        true
    }

    fn take_batch(&mut self, max: usize) -> Vec<ArtifactJob> {
        let n = max.min(self.queue.len());
        self.queue.drain(..n).collect()
    }

    fn release(&mut self, target: &Path) {
        self.reserved.remove(target);
    }
}

/// Background generator of thumbnails and preview clips.
pub struct ArtifactPipeline {
    transcoder: Arc<dyn Transcoder>,
    settings: ArtifactSettings,
    thumbnails: Mutex<PendingSet>,
    previews: Mutex<PendingSet>,
    events: EventBus,
}

impl ArtifactPipeline {
    pub fn new(transcoder: Arc<dyn Transcoder>, settings: ArtifactSettings, events: EventBus) -> Self {
        Self {
            transcoder,
            settings,
            thumbnails: Mutex::new(PendingSet::default()),
            previews: Mutex::new(PendingSet::default()),
            events,
        }
    }

    /// Add a job unless an equal one is already pending or in flight.
    /// Returns `true` when the job was newly scheduled.
    pub fn enqueue(&self, job: ArtifactJob) -> bool {
        self.pending(job.kind).insert(job)
    }

    pub fn pending_count(&self, kind: ArtifactKind) -> usize {
        self.pending(kind).queue.len()
    }

    /// Process up to `batch_size` pending jobs of `kind` concurrently and wait
    /// for all of them. Returns the number of jobs that produced an artifact.
    pub async fn tick(&self, kind: ArtifactKind) -> usize {
        let batch = self.pending(kind).take_batch(self.settings.batch_size.max(1));
        if batch.is_empty() {
            return 0;
        }
        tracing::debug!(kind = kind.as_str(), jobs = batch.len(), "processing artifact batch");
        let results = join_all(batch.iter().map(|job| self.process(job))).await;

        let mut produced = 0;
        let mut pending = self.pending(kind);
        for (job, result) in batch.iter().zip(results) {
            pending.release(&job.target_path);
            match result {
                Ok(()) => produced += 1,
                Err(err @ CatalogError::ArtifactSourceMissing { .. }) => {
                    tracing::debug!(error = %err, "dropping artifact job");
                }
                Err(err) => {
                    tracing::warn!(kind = kind.as_str(), error = %err, "artifact generation failed");
                }
            }
        }
        produced
    }

    async fn process(&self, job: &ArtifactJob) -> Result<(), CatalogError> {
        if !job.source_path.is_file() {
            return Err(CatalogError::ArtifactSourceMissing {
                path: job.source_path.clone(),
            });
        }
        let failed = |reason: String| CatalogError::ArtifactGenerationFailed {
            target: job.target_path.clone(),
            reason,
        };
        if let Some(parent) = job.target_path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| failed(err.to_string()))?;
        }

        let result = match job.kind {
            ArtifactKind::Thumbnail => {
                let pct = THUMBNAIL_PERCENTS[rand::rng().random_range(0..THUMBNAIL_PERCENTS.len())];
                let req = FrameRequest {
                    source: job.source_path.clone(),
                    target: job.target_path.clone(),
                    position: FramePosition::Percent(pct),
                    width: self.settings.thumbnail_width,
                    height: self.settings.thumbnail_height,
                };
                self.transcoder.extract_frame(&req).await
            }
            ArtifactKind::PreviewClip => {
                let req = ClipRequest {
                    source: job.source_path.clone(),
                    target: job.target_path.clone(),
                    start_secs: self.settings.preview_offset_secs,
                    duration_secs: self.settings.preview_duration_secs,
                    width: self.settings.preview_width,
                    fps: self.settings.preview_fps,
                    bitrate_kbps: self.settings.preview_bitrate_kbps,
                };
                self.transcoder.extract_clip(&req).await
            }
        };
        result.map_err(|err| failed(err.to_string()))?;

        let file_name = job
            .target_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        tracing::info!(kind = job.kind.as_str(), file = %file_name, "artifact ready");
        self.events.artifact_ready(job.kind, file_name);
        Ok(())
    }

    fn pending(&self, kind: ArtifactKind) -> MutexGuard<'_, PendingSet> {
        let set = match kind {
            ArtifactKind::Thumbnail => &self.thumbnails,
            ArtifactKind::PreviewClip => &self.previews,
        };
        set.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Start the thumbnail and preview timers on the current actix runtime.
pub fn spawn_artifact_timers(pipeline: Arc<ArtifactPipeline>) {
    for kind in [ArtifactKind::Thumbnail, ArtifactKind::PreviewClip] {
        let pipeline = pipeline.clone();
        let period = pipeline.settings.interval(kind);
        actix_web::rt::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                pipeline.tick(kind).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GalleryEvent;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::test_support::{StubTranscoder, entry};
    use crate::transcoder::TranscodeError;

    fn pipeline_with(stub: Arc<StubTranscoder>) -> (ArtifactPipeline, EventBus) {
        let events = EventBus::new();
        let pipeline = ArtifactPipeline::new(stub, ArtifactSettings::default(), events.clone());
        (pipeline, events)
    }

    fn job(dir: &Path, name: &str, kind: ArtifactKind) -> ArtifactJob {
        let source = dir.join(format!("{name}.mp4"));
        std::fs::write(&source, b"stub").unwrap();
        ArtifactJob {
            source_path: source,
            target_path: dir.join("art").join(format!("{name}.jpg")),
            kind,
        }
    }

    /// Blocks every frame extraction until `gate` is notified.
    #[derive(Default)]
    struct GatedTranscoder {
        started: Notify,
        gate: Notify,
    }

    #[async_trait]
    impl Transcoder for GatedTranscoder {
        async fn extract_frame(&self, req: &FrameRequest) -> Result<(), TranscodeError> {
            self.started.notify_one();
            self.gate.notified().await;
            std::fs::write(&req.target, b"frame").map_err(|_| TranscodeError::NoOutput(req.target.clone()))
        }

        async fn extract_clip(&self, req: &ClipRequest) -> Result<(), TranscodeError> {
            Err(TranscodeError::NoOutput(req.target.clone()))
        }

        async fn read_duration(&self, _source: &Path) -> Option<f64> {
            None
        }
    }

    #[test]
    fn artifact_names_follow_layout() {
        let root = entry(None, "clip.one.mp4");
        let nested = entry(Some("Foo"), "c.mkv");
        assert_eq!(thumbnail_name(&root), "clip.one.jpg");
        assert_eq!(preview_name(&root), "clip.one_preview.mp4");
        assert_eq!(thumbnail_name(&nested), "Foo_c.jpg");
        assert_eq!(preview_name(&nested), "Foo_c_preview.mp4");
    }

    #[actix_web::test]
    async fn duplicate_enqueue_is_processed_once() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubTranscoder::default());
        let (pipeline, _) = pipeline_with(stub.clone());
        let job = job(dir.path(), "a", ArtifactKind::Thumbnail);

        assert!(pipeline.enqueue(job.clone()));
        assert!(!pipeline.enqueue(job.clone()));
        assert_eq!(pipeline.pending_count(ArtifactKind::Thumbnail), 1);

        assert_eq!(pipeline.tick(ArtifactKind::Thumbnail).await, 1);
        assert_eq!(pipeline.tick(ArtifactKind::Thumbnail).await, 0);
        assert_eq!(stub.frame_calls(), 1);
        assert!(job.target_path.is_file());
    }

    #[actix_web::test]
    async fn job_in_flight_cannot_be_enqueued_again() {
        let dir = tempfile::tempdir().unwrap();
        let gated = Arc::new(GatedTranscoder::default());
        let pipeline = Arc::new(ArtifactPipeline::new(
            gated.clone(),
            ArtifactSettings::default(),
            EventBus::new(),
        ));
        let job = job(dir.path(), "a", ArtifactKind::Thumbnail);
        assert!(pipeline.enqueue(job.clone()));

        let running = {
            let pipeline = pipeline.clone();
            actix_web::rt::spawn(async move { pipeline.tick(ArtifactKind::Thumbnail).await })
        };
        gated.started.notified().await;
        assert_eq!(pipeline.pending_count(ArtifactKind::Thumbnail), 0);
        assert!(!pipeline.enqueue(job.clone()));
        assert_eq!(pipeline.pending_count(ArtifactKind::Thumbnail), 0);

        gated.gate.notify_one();
        assert_eq!(running.await.unwrap(), 1);
        assert!(job.target_path.is_file());
        assert!(pipeline.enqueue(job));
    }

    #[actix_web::test]
    async fn kinds_have_independent_queues() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubTranscoder::default());
        let (pipeline, _) = pipeline_with(stub.clone());
        let thumb = job(dir.path(), "a", ArtifactKind::Thumbnail);
        let mut preview = thumb.clone();
        preview.kind = ArtifactKind::PreviewClip;

        assert!(pipeline.enqueue(thumb));
        assert!(pipeline.enqueue(preview));
        assert_eq!(pipeline.pending_count(ArtifactKind::Thumbnail), 1);
        assert_eq!(pipeline.pending_count(ArtifactKind::PreviewClip), 1);

        pipeline.tick(ArtifactKind::PreviewClip).await;
        assert_eq!(stub.clip_calls(), 1);
        assert_eq!(stub.frame_calls(), 0);
        assert_eq!(pipeline.pending_count(ArtifactKind::Thumbnail), 1);
    }

    #[actix_web::test]
    async fn tick_respects_batch_size_in_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubTranscoder::default());
        let (pipeline, _) = pipeline_with(stub.clone());
        let jobs: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|n| job(dir.path(), n, ArtifactKind::Thumbnail))
            .collect();
        for job in &jobs {
            pipeline.enqueue(job.clone());
        }

        assert_eq!(pipeline.tick(ArtifactKind::Thumbnail).await, 2);
        assert_eq!(pipeline.pending_count(ArtifactKind::Thumbnail), 1);
        assert!(jobs[0].target_path.is_file());
        assert!(jobs[1].target_path.is_file());
        assert!(!jobs[2].target_path.exists());
    }

    #[actix_web::test]
    async fn missing_source_is_dropped_without_transcoding() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubTranscoder::default());
        let (pipeline, _) = pipeline_with(stub.clone());
        let job = ArtifactJob {
            source_path: dir.path().join("gone.mp4"),
            target_path: dir.path().join("gone.jpg"),
            kind: ArtifactKind::Thumbnail,
        };
        pipeline.enqueue(job.clone());

        assert_eq!(pipeline.tick(ArtifactKind::Thumbnail).await, 0);
        assert_eq!(stub.frame_calls(), 0);
        assert_eq!(pipeline.pending_count(ArtifactKind::Thumbnail), 0);
        assert!(pipeline.enqueue(job));
    }

    #[actix_web::test]
    async fn failed_job_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubTranscoder::failing());
        let (pipeline, _) = pipeline_with(stub.clone());
        pipeline.enqueue(job(dir.path(), "a", ArtifactKind::Thumbnail));

        assert_eq!(pipeline.tick(ArtifactKind::Thumbnail).await, 0);
        assert_eq!(pipeline.tick(ArtifactKind::Thumbnail).await, 0);
        assert_eq!(stub.frame_calls(), 1);
    }

    #[actix_web::test]
    async fn success_publishes_artifact_ready() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubTranscoder::default());
        let (pipeline, events) = pipeline_with(stub);
        let mut rx = events.subscribe();
        pipeline.enqueue(job(dir.path(), "a", ArtifactKind::Thumbnail));
        pipeline.tick(ArtifactKind::Thumbnail).await;

        match rx.try_recv() {
            Ok(GalleryEvent::ArtifactReady { artifact, file_name }) => {
                assert_eq!(artifact, ArtifactKind::Thumbnail);
                assert_eq!(file_name, "a.jpg");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
