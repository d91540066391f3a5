//! Catalog status and ordering handlers.

use actix_web::{get, post, web, HttpResponse, Responder};
use gallery_types::{ReshuffleResponse, StatsResponse};

use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Catalog counters", body = StatsResponse)
    )
)]
#[get("/api/stats")]
pub async fn stats(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.service.stats())
}

#[utoipa::path(
    post,
    path = "/api/reshuffle",
    responses(
        (status = 200, description = "New shuffle order in effect", body = ReshuffleResponse)
    )
)]
#[post("/api/reshuffle")]
/// Draw a new seed for the unfiltered listing order.
pub async fn reshuffle(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.service.reshuffle())
}
