//! Category API handler.

use actix_web::{get, web, HttpResponse, Responder};
use gallery_types::CategoriesResponse;

use crate::errors::ApiError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Keyword categories with video counts", body = CategoriesResponse),
        (status = 503, description = "Media root unavailable", body = gallery_types::ErrorResponse)
    )
)]
#[get("/api/categories")]
pub async fn list_categories(state: web::Data<AppState>) -> impl Responder {
    match state.service.list_categories() {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(err) => ApiError::from(err).into_response(),
    }
}
