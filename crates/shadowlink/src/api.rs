use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::catalog::Catalog;
use crate::directive::DirectiveEnvelope;
use crate::directive::DirectiveHandler;
use crate::gateway::ActuatorCommand;
use crate::gateway::ActuatorGateway;
use crate::shadow::ShadowStore;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
    appliances: usize,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SwitchState {
    On,
    Off,
}

/// Body of POST /v1/maintenance/lights
#[derive(Debug, Deserialize)]
struct LightsRequest {
    state: SwitchState,
}

/// Body of POST /v1/maintenance/current-temperature
#[derive(Debug, Deserialize)]
struct CurrentTemperatureRequest {
    value: f64,
}

/// Shared application state
pub struct AppState {
    version: &'static str,
    catalog: Arc<Catalog>,
    directives: DirectiveHandler,
    gateway: Arc<dyn ActuatorGateway>,
    room: String,
}

impl AppState {
    pub fn new(
        catalog: Arc<Catalog>,
        shadow: Arc<dyn ShadowStore>,
        gateway: Arc<dyn ActuatorGateway>,
        room: String,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            directives: DirectiveHandler::new(catalog.clone(), shadow),
            catalog,
            gateway,
            room,
        }
    }
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
            appliances: state.catalog.len(),
        }),
    )
}

/// Handler for POST /v1/directive
///
/// Directive failures are answered with an `ErrorResponse` event and a 200,
/// as the voice platform expects.
#[tracing::instrument(skip_all)]
async fn directive(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<DirectiveEnvelope>,
) -> impl IntoResponse {
    tracing::debug!("Handling /v1/directive request");
    let reply = state.directives.handle(&envelope.directive).await;
    (StatusCode::OK, Json(reply))
}

async fn actuate(state: &AppState, command: ActuatorCommand) -> axum::response::Response {
    match state.gateway.apply(&command).await {
        Ok(()) => (
            StatusCode::OK,
            Json(PingResponse {
                status: "ok".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Maintenance command {:?} failed: {}", command, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Handler for POST /v1/maintenance/lights
#[tracing::instrument(skip(state))]
async fn all_lights(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LightsRequest>,
) -> impl IntoResponse {
    let on = request.state == SwitchState::On;
    actuate(&state, ActuatorCommand::AllLights { on }).await
}

/// Handler for POST /v1/maintenance/current-temperature
#[tracing::instrument(skip(state))]
async fn current_temperature(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CurrentTemperatureRequest>,
) -> impl IntoResponse {
    let command = ActuatorCommand::CurrentTemperature {
        room: state.room.clone(),
        value: request.value,
    };
    actuate(&state, command).await
}

/// Create the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/directive", post(directive))
        .route("/v1/maintenance/lights", post(all_lights))
        .route("/v1/maintenance/current-temperature", post(current_temperature))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
///
/// Binds to `listen:port` and serves until `shutdown_rx` fires.
pub async fn serve(
    listen: &str,
    port: u16,
    state: Arc<AppState>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}
