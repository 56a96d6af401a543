use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use stockscope_core::analysis::AnalysisRequester;
use stockscope_core::domain::analysis::FullAnalysis;
use stockscope_core::domain::note::{normalize_key, ExpertNote, NewNote};
use stockscope_core::domain::query::AssetQuery;
use stockscope_core::error::AnalysisError;
use stockscope_core::llm::gemini::GeminiClient;
use stockscope_core::storage::{memory::MemoryNoteStore, notes::PgNoteStore, NoteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockscope_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let notes = connect_note_store(&settings).await;

    let requester = match GeminiClient::from_settings(&settings) {
        Ok(client) => Some(AnalysisRequester::new(Arc::new(client))),
        Err(e) => {
            tracing::error!(error = %e, "analysis provider unavailable; /api/analysis will return 503");
            None
        }
    };

    let state = AppState {
        notes,
        requester,
        analysis_timeout: settings.analysis_timeout(),
    };

    let app = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn connect_note_store(settings: &stockscope_core::config::Settings) -> Arc<dyn NoteStore> {
    let db_url = match settings.require_database_url() {
        Ok(db_url) => db_url,
        Err(e) => {
            tracing::error!(error = %e, "DATABASE_URL missing; keeping notes in memory");
            return Arc::new(MemoryNoteStore::new());
        }
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "db connect failed; keeping notes in memory");
            return Arc::new(MemoryNoteStore::new());
        }
    };

    match stockscope_core::storage::migrate(&pool).await {
        Ok(()) => Arc::new(PgNoteStore::new(pool)),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "db migrations failed; keeping notes in memory");
            Arc::new(MemoryNoteStore::new())
        }
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/notes", get(list_notes).post(create_note))
        .route("/api/notes/:id", delete(delete_note))
        .route("/api/analysis", post(create_analysis))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    notes: Arc<dyn NoteStore>,
    requester: Option<AnalysisRequester>,
    analysis_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(err: anyhow::Error) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        let status = match &err {
            AnalysisError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AnalysisError::MalformedResponse { .. } | AnalysisError::Provider(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        Self::new(status, err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct NotesQuery {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    market: Option<String>,
}

async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<NotesQuery>,
) -> Result<Json<Vec<ExpertNote>>, ApiError> {
    let symbol = normalize_key(query.symbol.as_deref().unwrap_or_default());
    if symbol.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "symbol query parameter is required",
        ));
    }
    let market = normalize_key(query.market.as_deref().unwrap_or_default());

    let notes = state
        .notes
        .list(&symbol, &market)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(notes))
}

async fn create_note(
    State(state): State<AppState>,
    payload: Result<Json<NewNote>, JsonRejection>,
) -> Result<(StatusCode, Json<ExpertNote>), ApiError> {
    let Json(note) = payload?;
    let note = note.normalized();
    note.validate()
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let created = state.notes.create(note).await.map_err(ApiError::internal)?;
    tracing::info!(
        id = %created.id,
        symbol = %created.symbol,
        market = %created.market,
        backend = state.notes.backend_name(),
        "note created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = Uuid::parse_str(id.trim())
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid note id: {id}")))?;

    let removed = state.notes.delete(id).await.map_err(ApiError::internal)?;
    if !removed {
        return Err(ApiError::new(StatusCode::NOT_FOUND, format!("note {id} not found")));
    }
    tracing::info!(%id, "note deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn create_analysis(
    State(state): State<AppState>,
    payload: Result<Json<AssetQuery>, JsonRejection>,
) -> Result<Json<FullAnalysis>, ApiError> {
    let Json(query) = payload?;
    query.validate()?;
    let Some(requester) = &state.requester else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "analysis provider is not configured",
        ));
    };

    match tokio::time::timeout(state.analysis_timeout, requester.request_analysis(&query)).await {
        Ok(result) => Ok(Json(result?)),
        Err(_) => {
            tracing::warn!(
                asset_type = %query.asset_type,
                timeout_secs = state.analysis_timeout.as_secs(),
                "analysis timed out"
            );
            Err(ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                "The analysis took too long. Please try again.",
            ))
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &stockscope_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
