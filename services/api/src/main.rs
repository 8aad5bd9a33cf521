mod admin;
mod ask;
mod chat;
mod error;
mod extractors;
mod users;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::{routing::get, Json, Router};
use expertline_common::types::ServiceInfo;
use expertline_config::{init_tracing, AppConfig};
use expertline_db::bans::pg_repository::PgBanRepository;
use expertline_db::bans::repositories::BanRepository;
use expertline_db::chat::pg_repository::PgChatRepository;
use expertline_db::chat::repositories::ChatRepository;
use expertline_db::moderation::pg_repository::PgModerationRepository;
use expertline_db::moderation::repositories::ModerationRepository;
use expertline_db::questions::pg_repository::PgQuestionRepository;
use expertline_db::questions::repositories::QuestionRepository;
use expertline_db::users::pg_repository::PgUserRepository;
use expertline_db::users::repositories::{ExpertDirectory, UserRepository};
use expertline_matching::{AssignmentEngine, HttpSimilarityResolver, SimilarityConfig, SimilarityResolver};
use expertline_moderation::{
    spawn_alert_worker, AccessGuard, AlertConfig, AlertQueue, ChatSessions, HttpAlertSender,
    ModerationPipeline, ProfanityFilter,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

const SERVICE_NAME: &str = "expertline-api";
const ALERT_QUEUE_CAPACITY: usize = 256;

/// Store handles, one per concern. The Postgres repositories share a pool.
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub directory: Arc<dyn ExpertDirectory>,
    pub questions: Arc<dyn QuestionRepository>,
    pub chat: Arc<dyn ChatRepository>,
    pub moderation: Arc<dyn ModerationRepository>,
    pub bans: Arc<dyn BanRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        let users = Arc::new(PgUserRepository::new(pool.clone()));
        Self {
            users: users.clone(),
            directory: users,
            questions: Arc::new(PgQuestionRepository::new(pool.clone())),
            chat: Arc::new(PgChatRepository::new(pool.clone())),
            moderation: Arc::new(PgModerationRepository::new(pool.clone())),
            bans: Arc::new(PgBanRepository::new(pool)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub chat: Arc<dyn ChatRepository>,
    pub moderation: Arc<dyn ModerationRepository>,
    pub bans: Arc<dyn BanRepository>,
    pub engine: AssignmentEngine,
    pub sessions: ChatSessions,
    pub pipeline: ModerationPipeline,
    pub guard: AccessGuard,
    pub info: ServiceInfo,
    /// Peers allowed to name the client in `X-Forwarded-For`.
    pub trusted_proxies: Arc<[IpAddr]>,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        resolver: Arc<dyn SimilarityResolver>,
        filter: Arc<ProfanityFilter>,
        alerts: AlertQueue,
    ) -> Self {
        Self {
            engine: AssignmentEngine::new(resolver, repos.directory, repos.questions.clone()),
            sessions: ChatSessions::new(repos.chat.clone()),
            pipeline: ModerationPipeline::new(
                repos.chat.clone(),
                repos.questions.clone(),
                repos.users.clone(),
                filter,
                alerts,
            ),
            guard: AccessGuard::new(repos.bans.clone()),
            users: repos.users,
            questions: repos.questions,
            chat: repos.chat,
            moderation: repos.moderation,
            bans: repos.bans,
            info: ServiceInfo::new(SERVICE_NAME, env!("CARGO_PKG_VERSION")),
            trusted_proxies: Vec::<IpAddr>::new().into(),
        }
    }

    pub fn with_trusted_proxies(mut self, proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = proxies.into();
        self
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(state.info)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-user-email"),
        ])
}

fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .merge(ask::router())
        .merge(chat::router())
        .merge(users::router())
        .merge(admin::router())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = AppConfig::from_env().expect("failed to load config");
    tracing::info!(service = SERVICE_NAME, "starting");

    let pool = expertline_db::create_pool(&config.database_url)
        .await
        .expect("failed to create database pool");
    expertline_db::schema::ensure_schema(&pool)
        .await
        .expect("failed to prepare database schema");

    let words = config
        .blocklist
        .load_words()
        .expect("failed to load blocklist");
    if words.is_empty() {
        tracing::warn!("blocklist is empty; messages will not be redacted");
    }
    let filter = ProfanityFilter::new(words).expect("invalid blocklist");
    tracing::info!(words = filter.len(), "profanity filter ready");

    let resolver = HttpSimilarityResolver::new(SimilarityConfig::from(&config.similarity))
        .expect("failed to build similarity client");
    if config.similarity.url.is_none() {
        tracing::warn!("SIMILARITY_URL not set; topics match expertise verbatim only");
    }

    let sender = HttpAlertSender::new(AlertConfig::from(&config.alerts))
        .expect("failed to build alert client");
    let (alerts, _alert_worker) = spawn_alert_worker(
        Arc::new(sender),
        ALERT_QUEUE_CAPACITY,
        Duration::from_millis(config.alerts.timeout_ms),
    );

    let state = AppState::new(
        Repositories::postgres(pool),
        Arc::new(resolver),
        Arc::new(filter),
        alerts,
    )
    .with_trusted_proxies(config.trusted_proxies.clone());
    if !config.trusted_proxies.is_empty() {
        tracing::info!(proxies = config.trusted_proxies.len(), "honouring X-Forwarded-For from trusted proxies");
    }

    let app = build_router(state, &config.cors_origins);
    let addr: SocketAddr = config.bind_addr().parse().expect("invalid bind address");

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
