//! Catalog operations exposed to the HTTP layer.
//!
//! Every listing re-scans the media root; only the shuffle epoch and the
//! cached counters live in memory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use gallery_types::{
    CategoriesResponse, CategoryInfo, CollectionInfo, ReshuffleResponse, SortOrder, StatsResponse,
    Suggestion, VideoItem, VideosResponse,
};
use rand::Rng;

use crate::artifacts::{ArtifactJob, ArtifactKind, ArtifactPipeline};
use crate::catalog::Scanner;
use crate::categories::CategoryMap;
use crate::durations::DurationCache;
use crate::errors::CatalogError;
use crate::events::EventBus;
use crate::naming::format_name;
use crate::query::{self, CatalogQuery, EnrichedEntry};
use crate::state::{CatalogState, Paths};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 200;
const MIN_SUGGESTION_CHARS: usize = 2;
const MAX_SUGGESTIONS: usize = 5;

/// Listing parameters as received from a client.
#[derive(Clone, Debug, Default)]
pub struct ListRequest {
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
    pub search: Option<String>,
    pub collection: Option<String>,
    pub category: Option<String>,
    pub sort: SortOrder,
}

#[derive(Clone)]
pub struct CatalogService {
    scanner: Scanner,
    catalog: Arc<CatalogState>,
    pipeline: Arc<ArtifactPipeline>,
    paths: Paths,
    events: EventBus,
    categories: CategoryMap,
    durations: Option<Arc<DurationCache>>,
}

impl CatalogService {
    pub fn new(
        scanner: Scanner,
        catalog: Arc<CatalogState>,
        pipeline: Arc<ArtifactPipeline>,
        paths: Paths,
        events: EventBus,
    ) -> Self {
        Self {
            scanner,
            catalog,
            pipeline,
            paths,
            events,
            categories: CategoryMap::default(),
            durations: None,
        }
    }

    pub fn with_categories(mut self, categories: CategoryMap) -> Self {
        self.categories = categories;
        self
    }

    /// Read durations of files whose names carry no duration tag.
    pub fn with_durations(mut self, durations: DurationCache) -> Self {
        self.durations = Some(Arc::new(durations));
        self
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn pipeline(&self) -> &Arc<ArtifactPipeline> {
        &self.pipeline
    }

    /// True when `path` names a file with a recognized video extension.
    pub fn is_video_path(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| self.scanner.is_video_name(name))
    }

    /// One page of the catalog. Missing artifacts of the returned items are
    /// scheduled for generation.
    pub async fn list_videos(&self, request: ListRequest) -> Result<VideosResponse, CatalogError> {
        let page = request.page.max(1);
        let limit = request.limit.clamp(1, MAX_PAGE_SIZE);
        let query = CatalogQuery {
            start: (page - 1).saturating_mul(limit),
            limit,
            search: request.search,
            collection: request.collection,
            category: request.category,
            sort: request.sort,
        };
        let seed = self.catalog.epoch().seed;
        let result = query::run(
            &self.scanner,
            seed,
            &self.categories,
            &self.paths.artifacts_dir,
            &query,
        )?;
        let durations = join_all(result.items.iter().map(|item| self.duration_of(item))).await;
        let videos = result
            .items
            .into_iter()
            .zip(durations)
            .map(|(item, duration)| self.present(item, duration))
            .collect();
        Ok(VideosResponse {
            videos,
            has_more: result.has_more,
            total: result.total,
            page,
            limit,
        })
    }

    /// Replace the shuffle epoch. Returns the cached total.
    pub fn reshuffle(&self) -> ReshuffleResponse {
        let epoch = self.catalog.reshuffle();
        tracing::info!(generation = epoch.generation, "catalog reshuffled");
        self.events.reshuffled(epoch.generation);
        ReshuffleResponse {
            message: "Order reshuffled!".to_string(),
            total: self.catalog.total_videos(),
        }
    }

    pub fn stats(&self) -> StatsResponse {
        StatsResponse {
            total_videos: self.catalog.total_videos(),
            watched_directory_count: self.catalog.watched_directories(),
            pending_thumbnail_count: self.pipeline.pending_count(ArtifactKind::Thumbnail),
            pending_preview_count: self.pipeline.pending_count(ArtifactKind::PreviewClip),
            shuffle_generation: self.catalog.epoch().generation,
        }
    }

    pub fn list_collections(&self) -> Result<Vec<CollectionInfo>, CatalogError> {
        Ok(self
            .scanner
            .collections()?
            .into_iter()
            .map(|summary| CollectionInfo {
                image_url: summary
                    .image_file
                    .as_ref()
                    .map(|_| format!("/api/collections/{}/image", urlencoding::encode(&summary.name))),
                name: summary.name,
                display_name: summary.display_name,
                video_count: summary.video_count,
            })
            .collect())
    }

    /// Absolute path of a collection's cover image, if it has one.
    pub fn collection_image(&self, name: &str) -> Result<Option<PathBuf>, CatalogError> {
        Ok(self
            .scanner
            .collections()?
            .into_iter()
            .find(|summary| summary.name == name)
            .and_then(|summary| {
                summary
                    .image_file
                    .map(|file| self.paths.media_dir.join(&summary.name).join(file))
            }))
    }

    /// A uniformly chosen video from the unfiltered catalog.
    pub async fn random_video(&self) -> Result<Option<VideoItem>, CatalogError> {
        let mut entries = self.scanner.scan()?;
        if entries.is_empty() {
            return Ok(None);
        }
        let index = rand::rng().random_range(0..entries.len());
        let entry = entries.swap_remove(index);
        let item = EnrichedEntry::new(entry, &self.categories, &self.paths.artifacts_dir);
        let duration = self.duration_of(&item).await;
        Ok(Some(self.present(item, duration)))
    }

    /// Category usage over the whole catalog, most used first.
    pub fn list_categories(&self) -> Result<CategoriesResponse, CatalogError> {
        let entries = self.scanner.scan()?;
        let categories = self
            .categories
            .tally(&entries)
            .into_iter()
            .map(|(name, count)| CategoryInfo {
                display_name: format_name(&name),
                name,
                count,
            })
            .collect();
        Ok(CategoriesResponse { categories })
    }

    /// Collections, then categories, whose display name contains `q`,
    /// case-insensitively.
    pub fn suggestions(&self, q: &str) -> Result<Vec<Suggestion>, CatalogError> {
        let term = q.trim().to_lowercase();
        if term.chars().count() < MIN_SUGGESTION_CHARS {
            return Ok(Vec::new());
        }
        let mut out = self
            .scanner
            .collections()?
            .into_iter()
            .filter(|summary| summary.display_name.to_lowercase().contains(&term))
            .take(MAX_SUGGESTIONS)
            .map(|summary| Suggestion {
                kind: "collection".to_string(),
                text: summary.display_name,
                value: summary.name,
                count: summary.video_count,
            })
            .collect::<Vec<_>>();
        out.extend(
            self.list_categories()?
                .categories
                .into_iter()
                .filter(|category| category.display_name.to_lowercase().contains(&term))
                .take(MAX_SUGGESTIONS)
                .map(|category| Suggestion {
                    kind: "category".to_string(),
                    text: category.display_name,
                    value: category.name,
                    count: category.count,
                }),
        );
        Ok(out)
    }

    async fn duration_of(&self, item: &EnrichedEntry) -> Option<String> {
        if let Some(label) = &item.info.duration_label {
            return Some(label.clone());
        }
        let durations = self.durations.as_ref()?;
        let source = item.entry.absolute_path(&self.paths.media_dir);
        durations.label(&source, item.entry.modified).await
    }

    fn present(&self, item: EnrichedEntry, duration: Option<String>) -> VideoItem {
        let source = item.entry.absolute_path(&self.paths.media_dir);
        if !item.thumbnail_exists {
            self.pipeline.enqueue(ArtifactJob {
                source_path: source.clone(),
                target_path: item.targets.thumbnail.clone(),
                kind: ArtifactKind::Thumbnail,
            });
        }
        if !item.preview_exists {
            self.pipeline.enqueue(ArtifactJob {
                source_path: source,
                target_path: item.targets.preview.clone(),
                kind: ArtifactKind::PreviewClip,
            });
        }

        let entry = item.entry;
        VideoItem {
            id: entry.relative_path.clone(),
            video_url: format!("/api/stream?path={}", urlencoding::encode(&entry.relative_path)),
            thumbnail_url: artifact_url(&item.targets.thumbnail),
            preview_url: artifact_url(&item.targets.preview),
            thumbnail_exists: item.thumbnail_exists,
            preview_exists: item.preview_exists,
            collection_display_name: entry.collection_display_name(),
            relative_path: entry.relative_path,
            file_name: entry.file_name,
            collection: entry.collection,
            is_root: entry.is_root,
            title: item.info.title,
            quality: item.info.quality,
            duration,
            categories: item.categories,
        }
    }
}

fn artifact_url(target: &Path) -> String {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("/artifacts/{}", urlencoding::encode(&name))
}
