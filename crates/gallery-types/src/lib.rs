use serde::{Deserialize, Serialize};

/// Ordering applied to a video listing.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Seeded shuffle for unfiltered listings, scan order when filtered.
    #[default]
    Random,
    /// Most recently modified files first.
    Newest,
    /// Least recently modified files first.
    Oldest,
    /// Alphabetical by display title.
    Name,
}

impl SortOrder {
    /// Parse a query-string value, falling back to [`SortOrder::Random`].
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "newest" => SortOrder::Newest,
            "oldest" => SortOrder::Oldest,
            "name" => SortOrder::Name,
            _ => SortOrder::Random,
        }
    }
}

/// One catalog entry as presented to clients.
///
/// The `id` is the entry's path relative to the media root; it is the join key
/// used by the stream endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    /// Stable identifier (relative path).
    pub id: String,
    /// Path relative to the media root, using `/` separators.
    pub relative_path: String,
    /// Base file name including extension.
    pub file_name: String,
    /// Collection (top-level subdirectory) name, absent for root files.
    pub collection: Option<String>,
    /// Human-formatted collection name.
    pub collection_display_name: Option<String>,
    /// `true` when the file lives directly in the media root.
    pub is_root: bool,
    /// Title derived from the file name.
    pub title: String,
    /// Quality tag extracted from the file name (e.g. `1080P`).
    pub quality: Option<String>,
    /// Duration tag from the file name, else `m:ss` read from the file.
    pub duration: Option<String>,
    /// Keyword categories matched in the file name (`general` when none).
    pub categories: Vec<String>,
    /// URL of the byte-range stream for this video.
    pub video_url: String,
    /// URL of the thumbnail image (may not exist yet).
    pub thumbnail_url: String,
    /// URL of the preview clip (may not exist yet).
    pub preview_url: String,
    /// Whether the thumbnail file exists on disk.
    pub thumbnail_exists: bool,
    /// Whether the preview clip exists on disk.
    pub preview_exists: bool,
}

/// Paginated video listing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct VideosResponse {
    /// Items on the requested page.
    pub videos: Vec<VideoItem>,
    /// `true` when more items follow this page.
    pub has_more: bool,
    /// Number of entries matching the filters.
    pub total: usize,
    /// 1-based page number that was served.
    pub page: usize,
    /// Page size that was applied.
    pub limit: usize,
}

/// Result of a reshuffle request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ReshuffleResponse {
    /// Human readable confirmation.
    pub message: String,
    /// Cached total number of videos.
    pub total: usize,
}

/// Operational counters.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Cached total number of videos in the catalog.
    pub total_videos: usize,
    /// Number of directories currently watched for changes.
    pub watched_directory_count: usize,
    /// Thumbnail jobs waiting to be processed.
    pub pending_thumbnail_count: usize,
    /// Preview clip jobs waiting to be processed.
    pub pending_preview_count: usize,
    /// Number of reshuffles since startup.
    pub shuffle_generation: u64,
}

/// A collection (top-level subdirectory) with at least one video.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    /// Directory name, used as the `collection` filter value.
    pub name: String,
    /// Human-formatted name.
    pub display_name: String,
    /// Number of recognized videos directly inside the directory.
    pub video_count: usize,
    /// URL of the collection cover image, when one exists.
    pub image_url: Option<String>,
}

/// Collection listing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CollectionsResponse {
    pub collections: Vec<CollectionInfo>,
}

/// A filename-derived category with the number of videos tagged with it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    /// Category key, used as the `category` filter value.
    pub name: String,
    pub display_name: String,
    pub count: usize,
}

/// Category listing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryInfo>,
}

/// A single search suggestion.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Suggestion source: `collection` or `category`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Text shown to the user.
    pub text: String,
    /// Value to submit as a filter.
    pub value: String,
    /// Number of videos behind the suggestion.
    pub count: usize,
}

/// Search suggestion listing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
}

/// Error payload returned by the API.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    pub error: String,
}
