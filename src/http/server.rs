//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all dispatcher
//! - Wire up middleware (request ID, tracing, CORS, panics, timeout, body limit)
//! - Reformat layer rejections (413, 408) as structured errors
//! - Gate every route behind the rate limiter
//! - Classify each request and hand it to the matching handler
//! - Serve until the shutdown signal fires

use std::any::Any;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, FromRequest, Multipart, State},
    http::{header, Request},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::assets::StaticAssetTable;
use crate::cache::{BoundedCache, EdgeCache, SharedCache};
use crate::config::EdgeConfig;
use crate::error::{AppError, ErrorContext};
use crate::handlers::{image, listing, pages, upload};
use crate::http::middleware::{cors_middleware, format_layer_rejections};
use crate::http::request::{request_origin, request_url};
use crate::observability::metrics;
use crate::routing::{Route, Router as EdgeRouter};
use crate::security::{rate_limit_middleware, RateLimiter};
use crate::storage::{StorageClient, StorageResult, WebDavClient};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EdgeConfig>,
    pub router: Arc<EdgeRouter>,
    pub storage: Arc<dyn StorageClient>,
    pub cache: SharedCache,
    pub edge_cache: EdgeCache,
    pub rate_limiter: Arc<RateLimiter>,
    pub assets: Arc<StaticAssetTable>,
}

impl AppState {
    pub fn new(config: EdgeConfig, storage: Arc<dyn StorageClient>) -> Self {
        let cache: SharedCache = Arc::new(BoundedCache::new(config.cache.capacity));
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit, cache.clone()));
        let edge_cache = EdgeCache::new(&config.edge_cache);
        let router = Arc::new(EdgeRouter::new(&config.site.upload_page_path));

        Self {
            config: Arc::new(config),
            router,
            storage,
            cache,
            edge_cache,
            rate_limiter,
            assets: Arc::new(StaticAssetTable::embedded()),
        }
    }
}

/// HTTP server for the image edge.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server around an existing storage client.
    pub fn new(config: EdgeConfig, storage: Arc<dyn StorageClient>) -> Self {
        let state = AppState::new(config, storage);
        let router = app(state.clone());
        Self { router, state }
    }

    /// Create a server backed by the configured WebDAV endpoint.
    pub fn from_config(config: EdgeConfig) -> StorageResult<Self> {
        let timeout = Duration::from_secs(config.timeouts.storage_secs);
        let storage = WebDavClient::new(&config.storage, timeout)?;
        tracing::info!(base_url = %storage.base_url(), "Storage client ready");
        Ok(Self::new(config, Arc::new(storage)))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
///
/// Layers are listed innermost first; the request id is assigned before anything else runs.
#[allow(deprecated)]
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .route("/", any(dispatch))
        .route("/{*path}", any(dispatch))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.upload.max_request_bytes))
        .layer(DefaultBodyLimit::disable())
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(middleware::map_response(format_layer_rejections))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(cors_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail = %detail, "Handler panicked");
    AppError::internal(ErrorContext::Main, "Internal server error").into_response()
}

/// Catch-all handler: classify, then dispatch to the route's handler.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let route = state
        .router
        .classify(request.method(), request.uri().path());
    let route_name = route.name();

    let origin = request_origin(
        request.headers(),
        request.uri(),
        state.config.site.public_origin.as_deref(),
    );
    let cache_key = request_url(&origin, request.uri());
    let if_none_match = request
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    tracing::debug!(route = route_name, "Dispatching request");

    let result = match route {
        Route::Preflight => Ok(pages::preflight()),
        Route::Redirect => pages::redirect(&state.config.site.root_redirect),
        Route::Upload => match Multipart::from_request(request, &state).await {
            Ok(multipart) => upload::handle_upload(&state, &origin, multipart).await,
            Err(rejection) => Err(AppError::validation(
                ErrorContext::Upload,
                rejection.body_text(),
            )
            .with_status(rejection.status())),
        },
        Route::ListImages { subpath } => {
            listing::handle_list_images(&state, &origin, &subpath).await
        }
        Route::Carousel { subpath } => pages::serve_carousel(&state, &subpath),
        Route::Static { filename } => pages::serve_static(&state, filename),
        Route::Image { path } => {
            image::handle_get_image(&state, &path, cache_key, if_none_match.as_deref()).await
        }
        Route::NotFound => Err(AppError::not_found(ErrorContext::Route)),
    };

    let response = result.unwrap_or_else(IntoResponse::into_response);
    metrics::record_request(route_name, response.status().as_u16(), start);
    response
}
