//! Video byte streaming with HTTP range support.

use std::path::{Component, Path, PathBuf};

use actix_web::body::SizedStream;
use actix_web::http::{header, StatusCode};
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use utoipa::{IntoParams, ToSchema};

use crate::errors::{ApiError, CatalogError};
use crate::state::AppState;

/// Query parameters for stream requests.
#[derive(Deserialize, ToSchema, IntoParams)]
pub struct StreamQuery {
    /// Video path relative to the media root.
    pub path: String,
}

#[utoipa::path(
    get,
    path = "/api/stream",
    params(StreamQuery),
    responses(
        (status = 200, description = "Full file stream"),
        (status = 206, description = "Partial content"),
        (status = 400, description = "Path escapes the media root"),
        (status = 404, description = "Not found"),
        (status = 416, description = "Invalid range")
    )
)]
#[get("/api/stream")]
/// Stream a video with HTTP range support.
pub async fn stream_video(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<StreamQuery>,
) -> impl Responder {
    let path = match canonicalize_under_root(&state.service.paths().media_dir, &query.path) {
        Ok(path) => path,
        Err(err) => return err.into_response(),
    };
    if !state.service.is_video_path(&path) {
        return ApiError::NotFound(format!("not a video: {}", query.path)).into_response();
    }

    let mut file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(_) => return HttpResponse::NotFound().finish(),
    };
    let meta = match file.metadata().await {
        Ok(m) if m.is_file() => m,
        _ => return HttpResponse::NotFound().finish(),
    };
    let total_len = meta.len();

    let range_header = req
        .headers()
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());
    let range = match range_header.and_then(|h| parse_single_range(h, total_len)) {
        Some(r) => Some(r),
        None if range_header.is_some() => {
            return HttpResponse::RangeNotSatisfiable()
                .insert_header((header::ACCEPT_RANGES, "bytes"))
                .insert_header((header::CONTENT_RANGE, format!("bytes */{total_len}")))
                .finish();
        }
        None => None,
    };

    let (start, len, status_code) = if let Some((start, end)) = range {
        let len = end.saturating_sub(start).saturating_add(1);
        (start, len, StatusCode::PARTIAL_CONTENT)
    } else {
        (0, total_len, StatusCode::OK)
    };

    if start > 0 && file.seek(std::io::SeekFrom::Start(start)).await.is_err() {
        return HttpResponse::InternalServerError().finish();
    }

    let stream = ReaderStream::new(file.take(len));
    let body = SizedStream::new(len, stream);

    let mut resp = HttpResponse::build(status_code);
    resp.insert_header((header::ACCEPT_RANGES, "bytes"));
    resp.insert_header((header::CONTENT_TYPE, content_type_for(&path)));
    if let Some((start, end)) = range {
        resp.insert_header((
            header::CONTENT_RANGE,
            format!("bytes {start}-{end}/{total_len}"),
        ));
    }
    resp.body(body)
}

/// Resolve a client-supplied relative path to a canonical file under `root`.
pub(crate) fn canonicalize_under_root(root: &Path, relative: &str) -> Result<PathBuf, ApiError> {
    let relative = Path::new(relative);
    if relative.as_os_str().is_empty()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(ApiError::BadRequest(format!(
            "path must be relative to the media root: {:?}",
            relative
        )));
    }
    let root = root.canonicalize().map_err(|source| {
        ApiError::Catalog(CatalogError::CatalogUnavailable {
            root: root.to_path_buf(),
            source,
        })
    })?;
    let canon = root
        .join(relative)
        .canonicalize()
        .map_err(|_| ApiError::NotFound(format!("path does not exist: {:?}", relative)))?;
    if !canon.starts_with(&root) {
        return Err(ApiError::BadRequest(format!(
            "path outside media root: {:?}",
            relative
        )));
    }
    Ok(canon)
}

pub(crate) fn parse_single_range(header: &str, total_len: u64) -> Option<(u64, u64)> {
    let header = header.trim();
    let range = header.strip_prefix("bytes=")?;
    let first = range.split(',').next()?;
    let (start_s, end_s) = first.trim().split_once('-')?;
    if start_s.is_empty() {
        // Suffix range: the last N bytes.
        let suffix = end_s.parse::<u64>().ok().filter(|n| *n > 0)?;
        if total_len == 0 {
            return None;
        }
        return Some((total_len.saturating_sub(suffix), total_len - 1));
    }
    let start = start_s.parse::<u64>().ok()?;
    let end = if end_s.is_empty() {
        total_len.saturating_sub(1)
    } else {
        end_s.parse::<u64>().ok()?
    };
    if start >= total_len || end < start {
        return None;
    }
    Some((start, end.min(total_len.saturating_sub(1))))
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}
