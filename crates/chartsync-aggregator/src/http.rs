//! JSON surface for the aggregator
//!
//! One resource, four verbs:
//! - `GET /patient-data?patient_id=<id>` — full bundle
//! - `PUT /patient-data` `{table, id, updates}` — partial update
//! - `POST /patient-data` `{table, record}` — insert
//! - `DELETE /patient-data?table=<t>&id=<id>` — hard delete
//!
//! Validation failures answer 400, store failures 500, both as
//! `{"error": message}`.

use crate::service::{AggregateError, AggregatorService};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chartsync_domain::{PatientRecordBundle, Record};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Error payload carried to HTTP callers
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Caller mistake: missing parameter, unknown table, whitelist miss
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Unrecoverable backend failure
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        if err.is_validation() {
            Self::bad_request(err.to_string())
        } else {
            Self::internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct FetchParams {
    #[serde(default)]
    patient_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateBody {
    #[serde(default)]
    table: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    updates: Record,
}

#[derive(Debug, Deserialize)]
struct CreateBody {
    #[serde(default)]
    table: String,
    #[serde(default)]
    record: Record,
}

#[derive(Debug, Deserialize)]
struct DeleteParams {
    #[serde(default)]
    table: String,
    #[serde(default)]
    id: String,
}

/// Build the `/patient-data` router over a shared service
#[must_use]
pub fn router(service: Arc<AggregatorService>) -> Router {
    Router::new()
        .route(
            "/patient-data",
            get(fetch_bundle)
                .put(update_row)
                .post(create_row)
                .delete(delete_row),
        )
        .with_state(service)
}

async fn fetch_bundle(
    State(service): State<Arc<AggregatorService>>,
    Query(params): Query<FetchParams>,
) -> Result<Json<PatientRecordBundle>, ApiError> {
    let patient_id = params.patient_id.unwrap_or_default();
    if patient_id.trim().is_empty() {
        return Err(ApiError::bad_request("patient_id required"));
    }
    Ok(Json(service.fetch_bundle(&patient_id).await?))
}

async fn update_row(
    State(service): State<Arc<AggregatorService>>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<Value>, ApiError> {
    if body.table.is_empty() || body.id.is_empty() {
        return Err(ApiError::bad_request("table and id are required"));
    }
    let row = service.update(&body.table, &body.id, body.updates).await?;
    Ok(Json(json!({ "data": row })))
}

async fn create_row(
    State(service): State<Arc<AggregatorService>>,
    Json(body): Json<CreateBody>,
) -> Result<Json<Value>, ApiError> {
    if body.table.is_empty() {
        return Err(ApiError::bad_request("table is required"));
    }
    let row = service.create(&body.table, body.record).await?;
    Ok(Json(json!({ "data": row })))
}

async fn delete_row(
    State(service): State<Arc<AggregatorService>>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<Value>, ApiError> {
    if params.table.is_empty() || params.id.is_empty() {
        return Err(ApiError::bad_request("table and id are required"));
    }
    service.delete(&params.table, &params.id).await?;
    Ok(Json(json!({ "success": true })))
}
