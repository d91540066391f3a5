//! Error taxonomy for the catalog core.
//!
//! Only `CatalogUnavailable` ever reaches an HTTP client; the other variants
//! are recovered locally and exist so the recovery sites can log a typed value.

use std::path::PathBuf;

use actix_web::HttpResponse;
use gallery_types::ErrorResponse;

/// Failures raised by the scanner, artifact pipeline and change watcher.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The media root itself could not be listed.
    #[error("media root {root:?} is unavailable: {source}")]
    CatalogUnavailable {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// One collection directory failed to enumerate; it is skipped for this scan.
    #[error("collection {dir:?} could not be read: {source}")]
    CollectionUnreadable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An artifact job's source file disappeared before it was processed.
    #[error("artifact source {path:?} no longer exists")]
    ArtifactSourceMissing { path: PathBuf },
    /// The external transcoder reported a failure.
    #[error("artifact generation for {target:?} failed: {reason}")]
    ArtifactGenerationFailed { target: PathBuf, reason: String },
    /// A directory watch could not be established.
    #[error("watch on {dir:?} failed: {reason}")]
    WatchSubscriptionFailed { dir: PathBuf, reason: String },
}

/// Errors returned by API-facing service operations.
#[derive(Debug)]
pub(crate) enum ApiError {
    Catalog(CatalogError),
    BadRequest(String),
    NotFound(String),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl ApiError {
    /// Convert a service error into an HTTP response.
    pub(crate) fn into_response(self) -> HttpResponse {
        match self {
            ApiError::Catalog(err @ CatalogError::CatalogUnavailable { .. }) => {
                tracing::error!(error = %err, "catalog query failed");
                HttpResponse::ServiceUnavailable().json(ErrorResponse {
                    error: "media library unavailable".to_string(),
                })
            }
            ApiError::Catalog(err) => {
                tracing::error!(error = %err, "catalog operation failed");
                HttpResponse::InternalServerError().json(ErrorResponse {
                    error: err.to_string(),
                })
            }
            ApiError::BadRequest(msg) => {
                HttpResponse::BadRequest().json(ErrorResponse { error: msg })
            }
            ApiError::NotFound(msg) => HttpResponse::NotFound().json(ErrorResponse { error: msg }),
        }
    }
}
