//! Probed durations for files whose names carry no duration tag.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::transcoder::Transcoder;

/// `m:ss` labels keyed by path and modification time. Failed lookups are
/// cached as `None` so a broken file is read once per modification.
pub struct DurationCache {
    transcoder: Arc<dyn Transcoder>,
    labels: Mutex<HashMap<PathBuf, (Option<SystemTime>, Option<String>)>>,
}

impl DurationCache {
    pub fn new(transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            transcoder,
            labels: Mutex::new(HashMap::new()),
        }
    }

    pub async fn label(&self, source: &Path, modified: Option<SystemTime>) -> Option<String> {
        if let Some(hit) = self.cached(source, modified) {
            return hit;
        }
        let label = self
            .transcoder
            .read_duration(source)
            .await
            .map(format_duration);
        if label.is_none() {
            tracing::debug!(path = %source.display(), "duration lookup failed");
        }
        if let Ok(mut labels) = self.labels.lock() {
            labels.insert(source.to_path_buf(), (modified, label.clone()));
        }
        label
    }

    fn cached(&self, source: &Path, modified: Option<SystemTime>) -> Option<Option<String>> {
        let labels = self.labels.lock().ok()?;
        labels
            .get(source)
            .filter(|(stamp, _)| *stamp == modified)
            .map(|(_, label)| label.clone())
    }
}

/// Whole minutes and zero-padded seconds, e.g. `83.9` -> `1:23`.
pub fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::StubTranscoder;

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_duration(0.4), "0:00");
        assert_eq!(format_duration(83.9), "1:23");
        assert_eq!(format_duration(3605.0), "60:05");
    }

    #[actix_web::test]
    async fn reads_once_per_modification() {
        let stub = Arc::new(StubTranscoder::default());
        stub.set_duration(Some(125.0));
        let cache = DurationCache::new(stub.clone());
        let path = Path::new("/media/a.mp4");
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(10);

        assert_eq!(cache.label(path, Some(t0)).await.as_deref(), Some("2:05"));
        assert_eq!(cache.label(path, Some(t0)).await.as_deref(), Some("2:05"));
        assert_eq!(stub.duration_calls(), 1);

        stub.set_duration(Some(61.0));
        let t1 = t0 + Duration::from_secs(5);
        assert_eq!(cache.label(path, Some(t1)).await.as_deref(), Some("1:01"));
        assert_eq!(stub.duration_calls(), 2);
    }

    #[actix_web::test]
    async fn failed_reads_are_cached() {
        let stub = Arc::new(StubTranscoder::default());
        let cache = DurationCache::new(stub.clone());
        let path = Path::new("/media/broken.mp4");

        assert_eq!(cache.label(path, None).await, None);
        assert_eq!(cache.label(path, None).await, None);
        assert_eq!(stub.duration_calls(), 1);
    }
}
