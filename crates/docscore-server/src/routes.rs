//! HTTP routes and handlers

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{BytesRejection, JsonRejection},
        DefaultBodyLimit, FromRequest, Multipart, Path, Request, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docscore_core::{Error, EvaluationSummary, ModelId};
use docscore_service::PositiveSource;
use docscore_telemetry::{metrics::record_error, TrainingMetrics};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::state::AppState;
use crate::upload::documents_from_upload;

/// Multipart field carrying the JSON-lines upload
const UPLOAD_FIELD: &str = "file";

pub fn create_router(state: AppState) -> Router {
    let max_body = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/train", post(train))
        .route("/score", post(score))
        .route("/models", get(list_models))
        .route("/models/:model_id/metrics", get(model_metrics))
        .fallback(fallback)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_body)),
        )
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

#[derive(Debug, Serialize)]
struct TrainResponse {
    model_id: String,
    metrics: EvaluationSummary,
}

/// Train from an uploaded positive set, or from the local pool when nothing is uploaded
///
/// Accepts `multipart/form-data` with a `file` field, or a raw JSON-lines body.
async fn train(State(state): State<AppState>, req: Request) -> Result<Json<TrainResponse>, AppError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let source = if is_multipart {
        let mut multipart = Multipart::from_request(req, &state).await?;
        let mut upload = None;
        while let Some(field) = multipart.next_field().await? {
            if field.name() == Some(UPLOAD_FIELD) {
                upload = Some(field.bytes().await?);
                break;
            }
            debug!(field = ?field.name(), "Ignoring multipart field");
        }
        match upload {
            Some(body) => PositiveSource::Documents(documents_from_upload(&body)?),
            None => PositiveSource::LocalPool,
        }
    } else {
        let body = Bytes::from_request(req, &state).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            PositiveSource::LocalPool
        } else {
            PositiveSource::Documents(documents_from_upload(&body)?)
        }
    };

    match &source {
        PositiveSource::Documents(docs) => info!(documents = docs.len(), "Training from upload"),
        PositiveSource::LocalPool => info!("Training from local positive pool"),
    }

    let outcome = state.service.train(source).await?;

    Ok(Json(TrainResponse {
        model_id: outcome.model_id.to_string(),
        metrics: outcome.metrics.eval_metrics,
    }))
}

#[derive(Debug, Deserialize)]
struct ScoreRequest {
    model_id: String,
    documents: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ScoreResponse {
    scores: Vec<f32>,
}

async fn score(
    State(state): State<AppState>,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<ScoreResponse>, AppError> {
    let Json(req) = payload?;
    let id = ModelId::from_str(&req.model_id)?;

    debug!(model_id = %id, documents = req.documents.len(), "Score request");
    let scores = state.service.score(&id, &req.documents).await?;

    Ok(Json(ScoreResponse { scores }))
}

#[derive(Debug, Serialize)]
struct ModelsResponse {
    models: Vec<String>,
}

async fn list_models(State(state): State<AppState>) -> Result<Json<ModelsResponse>, AppError> {
    let models = state.service.list_models().await?;
    Ok(Json(ModelsResponse {
        models: models.iter().map(ToString::to_string).collect(),
    }))
}

async fn model_metrics(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> Result<Json<TrainingMetrics>, AppError> {
    let id = ModelId::from_str(&model_id)?;

    let service = state.service.clone();
    let found = tokio::task::spawn_blocking(move || service.metrics_for(&id))
        .await
        .map_err(|e| Error::internal(format!("metrics lookup task failed: {e}")))??;

    found
        .map(Json)
        .ok_or_else(|| Error::model_not_found(model_id).into())
}

async fn fallback() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "message": "Not found",
                "type": "not_found",
            }
        })),
    )
}

/// Application error type
#[derive(Debug)]
enum AppError {
    /// Failure raised by the service layer
    Service(Error),
    /// Request rejected before it reached the service layer
    Rejected { status: StatusCode, message: String },
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Service(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Rejected {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::Service(err) => {
                let kind = err.kind();
                let status = match kind {
                    docscore_core::ErrorKind::Input => StatusCode::BAD_REQUEST,
                    docscore_core::ErrorKind::DataSufficiency => StatusCode::UNPROCESSABLE_ENTITY,
                    docscore_core::ErrorKind::Lookup => StatusCode::NOT_FOUND,
                    docscore_core::ErrorKind::Fault => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    error!(error = %err, kind = kind.as_str(), "Request failed");
                } else {
                    warn!(error = %err, kind = kind.as_str(), "Request rejected");
                }
                (status, kind.as_str(), err.to_string())
            }
            AppError::Rejected { status, message } => {
                warn!(%status, %message, "Malformed request");
                (status, "input", message)
            }
        };

        record_error(kind);

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
