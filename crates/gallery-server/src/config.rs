//! Configuration loading and parsing.
//!
//! Defines the server config schema and resolves defaults.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::artifacts::ArtifactSettings;
use crate::catalog::DEFAULT_VIDEO_EXTENSIONS;
use crate::categories::CategoryMap;
use crate::watcher::DEFAULT_RESUBSCRIBE_INTERVAL;

/// Name of the artifact directory created under the media root by default.
pub const DEFAULT_ARTIFACTS_DIR_NAME: &str = ".gallery";

/// Top-level server configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    /// Bind address (host:port).
    pub bind: Option<String>,
    /// Media library root directory.
    pub media_dir: Option<String>,
    /// Where thumbnails and preview clips are written.
    pub artifacts_dir: Option<String>,
    /// ffmpeg binary (defaults to `ffmpeg` on PATH).
    pub ffmpeg_path: Option<String>,
    /// ffprobe binary (defaults to `ffprobe` on PATH).
    pub ffprobe_path: Option<String>,
    /// Recognized video extensions, without dots.
    pub extensions: Option<Vec<String>>,
    /// Extra origins allowed by CORS.
    pub cors_origins: Option<Vec<String>>,
    /// Artifact generation settings.
    pub artifacts: Option<ArtifactsConfig>,
    /// Change watcher settings.
    pub watcher: Option<WatcherConfig>,
    /// `[categories]` table: category name to file-name keywords. Replaces
    /// the built-in table when present.
    pub categories: Option<HashMap<String, Vec<String>>>,
}

/// `[artifacts]` table.
#[derive(Debug, Default, Deserialize)]
pub struct ArtifactsConfig {
    /// Jobs processed concurrently per timer tick.
    pub batch_size: Option<usize>,
    pub thumbnail_interval_ms: Option<u64>,
    pub preview_interval_ms: Option<u64>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
    /// Start of the preview clip within the source.
    pub preview_offset_secs: Option<f64>,
    pub preview_duration_secs: Option<f64>,
    pub preview_width: Option<u32>,
    pub preview_fps: Option<u32>,
    pub preview_bitrate_kbps: Option<u32>,
}

/// `[watcher]` table.
#[derive(Debug, Default, Deserialize)]
pub struct WatcherConfig {
    /// How often the watch set is rebuilt.
    pub resubscribe_interval_secs: Option<u64>,
}

impl ServerConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg = toml::from_str::<ServerConfig>(&raw)
            .with_context(|| format!("parse config {:?}", path))?;
        Ok(cfg)
    }
}

/// Extract the media directory from config.
pub fn media_dir_from_config(cfg: &ServerConfig) -> Result<PathBuf> {
    let dir = non_empty(cfg.media_dir.as_deref())
        .ok_or_else(|| anyhow::anyhow!("media_dir is required; use --media-dir or config"))?;
    Ok(PathBuf::from(dir))
}

/// Parse an optional bind address from config.
pub fn bind_from_config(cfg: &ServerConfig) -> Result<Option<SocketAddr>> {
    let Some(bind) = cfg.bind.as_deref() else {
        return Ok(None);
    };
    let addr = bind.parse().with_context(|| format!("parse bind {bind}"))?;
    Ok(Some(addr))
}

/// Artifact directory, defaulting to a hidden directory under the media root.
pub fn artifacts_dir_from_config(cfg: &ServerConfig, media_dir: &Path) -> PathBuf {
    non_empty(cfg.artifacts_dir.as_deref())
        .map(PathBuf::from)
        .unwrap_or_else(|| media_dir.join(DEFAULT_ARTIFACTS_DIR_NAME))
}

/// Root child to hide from the scan when the artifact directory lives inside
/// the media root. Both directories must exist.
pub fn artifacts_exclusion(media_dir: &Path, artifacts_dir: &Path) -> Result<Option<PathBuf>> {
    let media = media_dir
        .canonicalize()
        .with_context(|| format!("resolve media dir {:?}", media_dir))?;
    let artifacts = artifacts_dir
        .canonicalize()
        .with_context(|| format!("resolve artifacts dir {:?}", artifacts_dir))?;
    anyhow::ensure!(
        artifacts != media,
        "artifacts_dir must not be the media root ({:?})",
        media_dir
    );
    Ok(artifacts
        .strip_prefix(&media)
        .ok()
        .and_then(|rel| rel.components().next())
        .map(|first| media_dir.join(first)))
}

pub fn categories_from_config(cfg: &ServerConfig) -> CategoryMap {
    match cfg.categories.as_ref() {
        Some(table) => CategoryMap::new(table.clone()),
        None => CategoryMap::default(),
    }
}

/// Recognized video extensions.
pub fn extensions_from_config(cfg: &ServerConfig) -> Vec<String> {
    match cfg.extensions.as_ref().filter(|exts| !exts.is_empty()) {
        Some(exts) => exts.clone(),
        None => DEFAULT_VIDEO_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
    }
}

/// `(ffmpeg, ffprobe)` binaries.
pub fn transcoder_paths_from_config(cfg: &ServerConfig) -> (PathBuf, PathBuf) {
    let ffmpeg = non_empty(cfg.ffmpeg_path.as_deref()).unwrap_or("ffmpeg");
    let ffprobe = non_empty(cfg.ffprobe_path.as_deref()).unwrap_or("ffprobe");
    (PathBuf::from(ffmpeg), PathBuf::from(ffprobe))
}

/// Merge `[artifacts]` over the built-in defaults.
pub fn artifact_settings_from_config(cfg: &ServerConfig) -> Result<ArtifactSettings> {
    let mut settings = ArtifactSettings::default();
    let Some(artifacts) = cfg.artifacts.as_ref() else {
        return Ok(settings);
    };
    if let Some(batch_size) = artifacts.batch_size {
        anyhow::ensure!(batch_size > 0, "artifacts.batch_size must be at least 1");
        settings.batch_size = batch_size;
    }
    if let Some(ms) = artifacts.thumbnail_interval_ms {
        settings.thumbnail_interval = positive_millis(ms, "artifacts.thumbnail_interval_ms")?;
    }
    if let Some(ms) = artifacts.preview_interval_ms {
        settings.preview_interval = positive_millis(ms, "artifacts.preview_interval_ms")?;
    }
    if let Some(width) = artifacts.thumbnail_width {
        settings.thumbnail_width = width;
    }
    if let Some(height) = artifacts.thumbnail_height {
        settings.thumbnail_height = height;
    }
    if let Some(offset) = artifacts.preview_offset_secs {
        anyhow::ensure!(offset >= 0.0, "artifacts.preview_offset_secs must not be negative");
        settings.preview_offset_secs = offset;
    }
    if let Some(duration) = artifacts.preview_duration_secs {
        anyhow::ensure!(duration > 0.0, "artifacts.preview_duration_secs must be positive");
        settings.preview_duration_secs = duration;
    }
    if let Some(width) = artifacts.preview_width {
        settings.preview_width = width;
    }
    if let Some(fps) = artifacts.preview_fps {
        settings.preview_fps = fps;
    }
    if let Some(kbps) = artifacts.preview_bitrate_kbps {
        settings.preview_bitrate_kbps = kbps;
    }
    Ok(settings)
}

pub fn resubscribe_interval_from_config(cfg: &ServerConfig) -> Duration {
    cfg.watcher
        .as_ref()
        .and_then(|w| w.resubscribe_interval_secs)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RESUBSCRIBE_INTERVAL)
}

fn positive_millis(ms: u64, key: &str) -> Result<Duration> {
    anyhow::ensure!(ms > 0, "{key} must be positive");
    Ok(Duration::from_millis(ms))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
