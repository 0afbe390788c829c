pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;

use crate::api::middleware::request_id::{REQUEST_ID_HEADER, request_id_middleware};
use crate::config::AppConfig;
use crate::services::background::{
    BackgroundRemovalStrategy, BackgroundRemover, CloudinaryStrategy, ExternalProcessStrategy,
    LocalAlphaStrategy,
};
use crate::services::mailer::Mailer;
use crate::services::media::{FfmpegTranscoder, MediaService};
use crate::services::pdf::PdfMergeService;
use crate::services::process::ProcessRunner;
use crate::services::storage::ArtifactStore;
use crate::services::tools::ToolService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware::from_fn,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Slack on top of the file limits for multipart framing and text fields.
const MULTIPART_OVERHEAD: u64 = 10 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::tools::list_tools,
        api::handlers::tools::get_tool,
        api::handlers::tools::create_tool,
        api::handlers::tools::update_tool,
        api::handlers::tools::delete_tool,
        api::handlers::pdf::merge_pdfs,
        api::handlers::media::compress_image,
        api::handlers::media::compress_audio,
        api::handlers::media::compress_video,
        api::handlers::media::remove_background,
        api::handlers::converter::html_to_react,
        api::handlers::contact::send_message,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            entities::tools::Model,
            entities::tools::ToolCategory,
            services::tools::CreateToolRequest,
            services::tools::UpdateToolRequest,
            api::handlers::tools::DeleteToolResponse,
            api::handlers::pdf::MergePdfResponse,
            api::handlers::media::CompressionResponse,
            api::handlers::media::RemoveBackgroundResponse,
            api::handlers::converter::HtmlToReactRequest,
            api::handlers::converter::HtmlToReactResponse,
            api::handlers::contact::ContactRequest,
            api::handlers::contact::ContactResponse,
        )
    ),
    tags(
        (name = "system", description = "Liveness and health"),
        (name = "tools", description = "Tool catalog"),
        (name = "pdf", description = "PDF utilities"),
        (name = "media", description = "Image, audio and video processing"),
        (name = "converter", description = "Code converters"),
        (name = "contact", description = "Contact form")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ArtifactStore>,
    pub tools: Arc<ToolService>,
    pub media: Arc<MediaService>,
    pub background: Arc<BackgroundRemover>,
    pub pdf: Arc<PdfMergeService>,
    pub mailer: Arc<Mailer>,
}

impl AppState {
    /// Wires every service from configuration. The process runner is
    /// injected so tests can stand in for ffmpeg and rembg.
    pub fn new(
        db: DatabaseConnection,
        config: AppConfig,
        storage: Arc<dyn ArtifactStore>,
        runner: Arc<dyn ProcessRunner>,
        mailer: Mailer,
    ) -> Self {
        let server = &config.server;

        let transcoder = FfmpegTranscoder::new(
            runner.clone(),
            server.ffmpeg_path.clone(),
            server.process_timeout,
        );
        let media = MediaService::new(transcoder, storage.clone(), server.temp_dir.clone());

        let strategies: Vec<Arc<dyn BackgroundRemovalStrategy>> = vec![
            Arc::new(ExternalProcessStrategy::new(
                runner,
                config.background_removal.clone(),
                server.public_dir.clone(),
                server.process_timeout,
            )),
            Arc::new(CloudinaryStrategy::new(
                reqwest::Client::new(),
                config.cloudinary.clone(),
            )),
            Arc::new(LocalAlphaStrategy::new(storage.clone())),
        ];
        let background = BackgroundRemover::new(strategies, server.temp_dir.clone());
        let pdf = PdfMergeService::new(server.public_dir.clone());

        Self {
            tools: Arc::new(ToolService::new(db.clone())),
            media: Arc::new(media),
            background: Arc::new(background),
            pdf: Arc::new(pdf),
            mailer: Arc::new(mailer),
            storage,
            db,
            config: Arc::new(config),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o.trim_end_matches('/')).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

pub fn create_app(state: AppState) -> Router {
    let limits = &state.config.uploads;
    let pdf_body_limit =
        (limits.max_pdf_size * limits.max_pdf_files as u64 + MULTIPART_OVERHEAD) as usize;
    let media_body_limit = (limits.max_media_size + MULTIPART_OVERHEAD) as usize;

    let media_routes = Router::new()
        .route(
            "/compress-image",
            post(api::handlers::media::compress_image),
        )
        .route(
            "/compress-audio",
            post(api::handlers::media::compress_audio),
        )
        .route(
            "/compress-video",
            post(api::handlers::media::compress_video),
        )
        .route("/remove-bg", post(api::handlers::media::remove_background))
        .layer(DefaultBodyLimit::max(media_body_limit));

    let pdf_routes = Router::new()
        .route("/merge", post(api::handlers::pdf::merge_pdfs))
        .layer(DefaultBodyLimit::max(pdf_body_limit));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(api::handlers::health::banner))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/api/tools",
            get(api::handlers::tools::list_tools).post(api::handlers::tools::create_tool),
        )
        .route(
            "/api/tools/:key",
            get(api::handlers::tools::get_tool)
                .put(api::handlers::tools::update_tool)
                .delete(api::handlers::tools::delete_tool),
        )
        .nest("/api/media", media_routes)
        .nest("/api/pdf", pdf_routes)
        .route(
            "/api/converter/html-to-react",
            post(api::handlers::converter::html_to_react),
        )
        .route(
            "/api/contact/send-message",
            post(api::handlers::contact::send_message),
        )
        .nest_service("/uploads", ServeDir::new(&state.config.server.public_dir))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    info!("📥 {} {}", request.method(), request.uri());
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        info!(
                            "📤 Finished in {:?} with status {}",
                            latency,
                            response.status()
                        );
                    },
                ),
        )
        // Outside the trace layer so the span sees a minted id.
        .layer(from_fn(request_id_middleware))
        .layer(cors_layer(&state.config.server.allowed_origins))
        .with_state(state)
}
