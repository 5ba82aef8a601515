use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::Json,
    routing::{get, post},
    Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod events;
mod extract;
mod generator;
mod hf;
mod prompt;
mod python;
mod registry;
mod worker;

use config::Config;
use events::TaskEvent;
use generator::AiTestGenerator;
use registry::{ClaimError, TaskRegistry};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: TaskRegistry,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting test generation server...");

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let registry = TaskRegistry::new(config.queue_capacity, config.task_ttl);

    // Evict expired task entries in the background
    let sweeper_registry = registry.clone();
    tokio::spawn(async move {
        registry::run_sweeper(sweeper_registry).await;
    });

    let state = AppState {
        config: config.clone(),
        registry,
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/generate-tests", post(generate_tests))
        .route("/generate-tests/stream/:task_id", get(stream_task))
        .route("/generate-ai-tests", post(generate_ai_tests))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

// === Request / Response Types ===

#[derive(Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Serialize)]
pub struct TaskCreated {
    pub task_id: String,
}

#[derive(Serialize)]
pub struct TestCodeResponse {
    pub test_code: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

// === API Handlers ===

/// Start a background pynguin generation task and return a task id.
async fn generate_tests(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<TaskCreated>), (StatusCode, Json<ErrorResponse>)> {
    let code = match req.code {
        Some(code) if !code.is_empty() => code,
        _ => return Err(error_response(StatusCode::BAD_REQUEST, "No code provided")),
    };

    let (task_id, tx) = state.registry.create();
    tracing::info!("Created generation task {}", task_id);

    tokio::spawn(worker::run_generation(
        task_id.clone(),
        code,
        state.config.clone(),
        state.registry.clone(),
        tx,
    ));

    Ok((StatusCode::ACCEPTED, Json(TaskCreated { task_id })))
}

/// SSE stream for a running generation task.
async fn stream_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ErrorResponse>)>
{
    let rx = match state.registry.claim(&task_id) {
        Ok(rx) => rx,
        Err(ClaimError::UnknownTask) => {
            return Err(error_response(StatusCode::NOT_FOUND, "Unknown task id"));
        }
        Err(ClaimError::AlreadyStreaming) => {
            return Err(error_response(
                StatusCode::CONFLICT,
                "Task is already being streamed",
            ));
        }
    };

    tracing::info!("Streaming task {}", task_id);

    // The channel closes once the worker is done; a single terminal marker
    // follows the drained queue.
    let stream = ReceiverStream::new(rx)
        .chain(stream::once(async { TaskEvent::Done }))
        .map(|event| {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Ok(Event::default().data(data))
        });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

/// Generate tests inline via the chat completions endpoint.
async fn generate_ai_tests(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<TestCodeResponse>, (StatusCode, Json<ErrorResponse>)> {
    let code = match req.code {
        Some(code) if !code.is_empty() => code,
        _ => return Err(error_response(StatusCode::BAD_REQUEST, "No code provided")),
    };

    let generator = AiTestGenerator::new(&state.config);
    let result = generator.generate_tests(&code).await;

    if let Some(error) = result.error {
        tracing::error!("AI test generation failed: {}", error);
        return Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, &error));
    }

    Ok(Json(TestCodeResponse {
        test_code: result.test_code,
    }))
}
