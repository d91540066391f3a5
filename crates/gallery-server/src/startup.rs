//! Actix server startup + app wiring.
//!
//! Builds the shared state, background workers, routes, middleware, and
//! OpenAPI endpoints.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_cors::Cors;
use actix_files::Files;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse};
use actix_web::{web, App, Error, HttpServer};
use anyhow::{Context as _, Result};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api;
use crate::artifacts::{spawn_artifact_timers, ArtifactPipeline};
use crate::catalog::Scanner;
use crate::config;
use crate::events::EventBus;
use crate::openapi;
use crate::service::CatalogService;
use crate::state::{AppState, CatalogState, Paths};
use crate::durations::DurationCache;
use crate::transcoder::{FfmpegTranscoder, Transcoder};
use crate::watcher::{ChangeWatcher, WatcherHandle};

const DEFAULT_BIND: &str = "0.0.0.0:3000";
const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];

/// Build server state and start the Actix HTTP server.
pub(crate) async fn run(args: crate::Args) -> Result<()> {
    let cfg = load_config(args.config.as_ref())?;
    let bind = resolve_bind(args.bind, &cfg)?;
    let media_dir = resolve_media_dir(args.media_dir, &cfg)?;
    let artifacts_dir = config::artifacts_dir_from_config(&cfg, &media_dir);
    std::fs::create_dir_all(&artifacts_dir)
        .with_context(|| format!("create artifacts dir {:?}", artifacts_dir))?;

    let mut scanner =
        Scanner::with_extensions(media_dir.clone(), config::extensions_from_config(&cfg));
    if let Some(excluded) = config::artifacts_exclusion(&media_dir, &artifacts_dir)? {
        tracing::debug!(dir = %excluded.display(), "artifact directory hidden from the catalog");
        scanner = scanner.excluding(excluded);
    }
    let total = scanner
        .count()
        .with_context(|| format!("scan media dir {:?}", media_dir))?;
    tracing::info!(
        bind = %bind,
        media_dir = %media_dir.display(),
        artifacts_dir = %artifacts_dir.display(),
        total,
        "starting gallery-server"
    );

    let events = EventBus::new();
    let catalog = Arc::new(CatalogState::new(total));
    let (ffmpeg, ffprobe) = config::transcoder_paths_from_config(&cfg);
    let transcoder: Arc<dyn Transcoder> = Arc::new(FfmpegTranscoder::new(ffmpeg, ffprobe));
    let pipeline = Arc::new(ArtifactPipeline::new(
        transcoder.clone(),
        config::artifact_settings_from_config(&cfg)?,
        events.clone(),
    ));
    let paths = Paths {
        media_dir,
        artifacts_dir: artifacts_dir.clone(),
    };
    let service = CatalogService::new(
        scanner.clone(),
        catalog.clone(),
        pipeline.clone(),
        paths,
        events.clone(),
    )
    .with_categories(config::categories_from_config(&cfg))
    .with_durations(DurationCache::new(transcoder));
    let state = web::Data::new(AppState::new(service, events.clone()));

    let watcher = ChangeWatcher::new(scanner, catalog, events)
        .spawn(config::resubscribe_interval_from_config(&cfg))
        .context("start change watcher")?;
    setup_shutdown(watcher);
    spawn_artifact_timers(pipeline);

    let extra_origins = cfg.cors_origins.clone().unwrap_or_default();
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "HEAD"])
            .allowed_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::RANGE,
            ])
            .max_age(3600);
        for origin in DEV_ORIGINS.iter().copied().chain(extra_origins.iter().map(String::as_str)) {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(FilteredLogger)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", openapi::ApiDoc::openapi()),
            )
            .service(api::list_videos)
            .service(api::stats::reshuffle)
            .service(api::stats::stats)
            .service(api::list_collections)
            .service(api::list_categories)
            .service(api::collection_image)
            .service(api::random_video)
            .service(api::search_suggestions)
            .service(api::stream_video)
            .service(api::events_stream)
            .service(api::health::health)
            .service(Files::new("/artifacts", artifacts_dir.clone()))
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}

/// Return true when the request path should be logged.
fn should_log_path(path: &str) -> bool {
    !(path == "/api/stream"
        || path == "/api/events"
        || path == "/health"
        || path.starts_with("/artifacts/"))
}

/// Actix middleware that filters noisy paths from logging.
struct FilteredLogger;

impl<S, B> actix_web::dev::Transform<S, ServiceRequest> for FilteredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = FilteredLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(FilteredLoggerMiddleware { service })
    }
}

/// Service wrapper that applies the logging filter.
struct FilteredLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for FilteredLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();
        let should_log = should_log_path(&path);
        let method = req.method().clone();
        let peer = req.connection_info().realip_remote_addr().unwrap_or("-").to_string();
        let start = std::time::Instant::now();
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            if should_log {
                tracing::info!(
                    method = %method,
                    path = %path,
                    status = %res.status().as_u16(),
                    peer = %peer,
                    elapsed_ms = %start.elapsed().as_millis(),
                    "http request"
                );
            }
            Ok(res)
        })
    }
}

/// Load server config from `--config`, a `config.toml` next to the binary, or defaults.
fn load_config(path: Option<&PathBuf>) -> Result<config::ServerConfig> {
    if let Some(path) = path {
        return config::ServerConfig::load(path);
    }
    let auto_path = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join("config.toml")))
        .filter(|path| path.exists());
    match auto_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using config next to executable");
            config::ServerConfig::load(&path)
        }
        None => Ok(config::ServerConfig::default()),
    }
}

/// Resolve the final bind address from args + config.
fn resolve_bind(bind: Option<SocketAddr>, cfg: &config::ServerConfig) -> Result<SocketAddr> {
    match bind {
        Some(addr) => Ok(addr),
        None => match config::bind_from_config(cfg)? {
            Some(addr) => Ok(addr),
            None => DEFAULT_BIND.parse().context("parse default bind"),
        },
    }
}

/// Resolve the media directory from args + config; the result is canonical.
fn resolve_media_dir(dir: Option<PathBuf>, cfg: &config::ServerConfig) -> Result<PathBuf> {
    let dir = match dir {
        Some(dir) => dir,
        None => config::media_dir_from_config(cfg)?,
    };
    dir.canonicalize()
        .with_context(|| format!("media dir {:?} is not accessible", dir))
}

/// Install Ctrl+C handler that stops the watcher and the actix system.
fn setup_shutdown(watcher: WatcherHandle) {
    let mut watcher = Some(watcher);
    let _ = ctrlc::set_handler(move || {
        if let Some(handle) = watcher.take() {
            handle.shutdown();
        }
        if let Some(system) = actix_web::rt::System::try_current() {
            system.stop();
        } else {
            std::process::exit(0);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noisy_paths_are_not_logged() {
        assert!(!should_log_path("/api/stream"));
        assert!(!should_log_path("/api/events"));
        assert!(!should_log_path("/health"));
        assert!(!should_log_path("/artifacts/Foo_c.jpg"));
        assert!(should_log_path("/api/videos"));
        assert!(should_log_path("/api/reshuffle"));
    }

    #[test]
    fn bind_prefers_cli_then_config_then_default() {
        let cfg = config::ServerConfig {
            bind: Some("127.0.0.1:9000".to_string()),
            ..config::ServerConfig::default()
        };
        let cli: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        assert_eq!(resolve_bind(Some(cli), &cfg).unwrap(), cli);
        assert_eq!(resolve_bind(None, &cfg).unwrap(), "127.0.0.1:9000".parse().unwrap());
        assert_eq!(
            resolve_bind(None, &config::ServerConfig::default()).unwrap(),
            DEFAULT_BIND.parse().unwrap()
        );
    }

    #[test]
    fn media_dir_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_media_dir(Some(dir.path().to_path_buf()), &config::ServerConfig::default()).unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap());
        assert!(resolve_media_dir(Some(dir.path().join("nope")), &config::ServerConfig::default()).is_err());
    }
}
