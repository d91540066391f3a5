use utoipa::OpenApi;

use crate::api;
use crate::artifacts::ArtifactKind;
use crate::events::GalleryEvent;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::videos::list_videos,
        api::videos::random_video,
        api::videos::search_suggestions,
        api::stats::reshuffle,
        api::stats::stats,
        api::collections::list_collections,
        api::collections::collection_image,
        api::categories::list_categories,
        api::media::stream_video,
        api::streams::events_stream,
        api::health::health,
    ),
    components(
        schemas(
            gallery_types::SortOrder,
            gallery_types::VideoItem,
            gallery_types::VideosResponse,
            gallery_types::ReshuffleResponse,
            gallery_types::StatsResponse,
            gallery_types::CollectionInfo,
            gallery_types::CollectionsResponse,
            gallery_types::CategoryInfo,
            gallery_types::CategoriesResponse,
            gallery_types::Suggestion,
            gallery_types::SuggestionsResponse,
            gallery_types::ErrorResponse,
            api::health::HealthResponse,
            ArtifactKind,
            GalleryEvent,
        )
    ),
    tags(
        (name = "gallery-server", description = "Video gallery catalog API")
    )
)]
pub struct ApiDoc;
