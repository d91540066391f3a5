//! Video listing API handlers.

use actix_web::{get, web, HttpResponse, Responder};
use gallery_types::{SortOrder, SuggestionsResponse, VideosResponse, VideoItem};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::errors::ApiError;
use crate::service::{DEFAULT_PAGE_SIZE, ListRequest};
use crate::state::AppState;

/// Query parameters for the video listing.
#[derive(Deserialize, ToSchema, IntoParams)]
pub struct VideosQuery {
    /// 1-based page number (default 1).
    pub page: Option<usize>,
    /// Page size, clamped to 1..=200 (default 20).
    pub limit: Option<usize>,
    /// Case-insensitive substring over title, collection and file name.
    pub search: Option<String>,
    /// Restrict to one collection directory.
    pub collection: Option<String>,
    /// Restrict to one keyword category.
    pub category: Option<String>,
    /// `random` (default), `newest`, `oldest` or `name`.
    pub sort: Option<String>,
}

#[derive(Deserialize, ToSchema, IntoParams)]
pub struct SuggestionsQuery {
    /// Search prefix; at least two characters.
    pub q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/videos",
    params(VideosQuery),
    responses(
        (status = 200, description = "One page of videos", body = VideosResponse),
        (status = 503, description = "Media root unavailable", body = gallery_types::ErrorResponse)
    )
)]
#[get("/api/videos")]
/// List videos, shuffled unless a filter or explicit sort is given.
pub async fn list_videos(state: web::Data<AppState>, query: web::Query<VideosQuery>) -> impl Responder {
    let query = query.into_inner();
    let request = ListRequest {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        search: query.search,
        collection: query.collection,
        category: query.category,
        sort: query
            .sort
            .as_deref()
            .map(SortOrder::parse_lenient)
            .unwrap_or_default(),
    };
    match state.service.list_videos(request).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(err) => ApiError::from(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/random-video",
    responses(
        (status = 200, description = "A random video", body = VideoItem),
        (status = 404, description = "Catalog is empty", body = gallery_types::ErrorResponse)
    )
)]
#[get("/api/random-video")]
/// Pick one video uniformly from the whole catalog.
pub async fn random_video(state: web::Data<AppState>) -> impl Responder {
    match state.service.random_video().await {
        Ok(Some(item)) => HttpResponse::Ok().json(item),
        Ok(None) => ApiError::NotFound("no videos found".to_string()).into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/search/suggestions",
    params(SuggestionsQuery),
    responses(
        (status = 200, description = "Collection and category suggestions", body = SuggestionsResponse)
    )
)]
#[get("/api/search/suggestions")]
pub async fn search_suggestions(
    state: web::Data<AppState>,
    query: web::Query<SuggestionsQuery>,
) -> impl Responder {
    let q = query.q.as_deref().unwrap_or_default();
    match state.service.suggestions(q) {
        Ok(suggestions) => HttpResponse::Ok().json(SuggestionsResponse { suggestions }),
        Err(err) => ApiError::from(err).into_response(),
    }
}
