//! Collection API handlers.

use actix_files::NamedFile;
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use gallery_types::CollectionsResponse;

use crate::errors::ApiError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/collections",
    responses(
        (status = 200, description = "Collections with at least one video", body = CollectionsResponse),
        (status = 503, description = "Media root unavailable", body = gallery_types::ErrorResponse)
    )
)]
#[get("/api/collections")]
pub async fn list_collections(state: web::Data<AppState>) -> impl Responder {
    match state.service.list_collections() {
        Ok(collections) => HttpResponse::Ok().json(CollectionsResponse { collections }),
        Err(err) => ApiError::from(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/collections/{name}/image",
    params(
        ("name" = String, Path, description = "Collection directory name")
    ),
    responses(
        (status = 200, description = "Cover image"),
        (status = 404, description = "No image for this collection")
    )
)]
#[get("/api/collections/{name}/image")]
/// Serve the first image file found in a collection directory.
pub async fn collection_image(
    state: web::Data<AppState>,
    req: HttpRequest,
    name: web::Path<String>,
) -> HttpResponse {
    let name = name.into_inner();
    let path = match state.service.collection_image(&name) {
        Ok(Some(path)) => path,
        Ok(None) => return ApiError::NotFound(format!("no image for {name}")).into_response(),
        Err(err) => return ApiError::from(err).into_response(),
    };
    match NamedFile::open_async(&path).await {
        Ok(file) => file.into_response(&req),
        Err(_) => ApiError::NotFound(format!("no image for {name}")).into_response(),
    }
}
