//! Route table and handlers.
//!
//! Every route is mounted twice: at the root and under `/api`, the prefix the
//! browser client uses.

use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::model::attachment::AttachmentKind;
use crate::model::chunk::TimeRange;
use crate::model::page::{MessagePage, ReloadOutcome, ServerStats};
use crate::service::ChatService;

use super::error::ApiError;

type AppState = Arc<ChatService>;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TimeParams {
    pub timestamp: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReloadParams {
    #[serde(default)]
    pub force: bool,
}

/// Build the application router over a shared service.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes())
        .nest("/api", routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages", get(messages))
        .route("/time-range", get(time_range))
        .route("/messages-by-time", get(messages_by_time))
        .route("/attachment/{name}", get(attachment))
        .route("/stats", get(stats))
        .route("/reload", post(reload))
}

/// Run a service call off the async executor; the first call may parse the
/// whole export.
async fn blocking<T, F>(state: AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ChatService) -> crate::error::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| ApiError::internal(format!("worker failed: {e}")))?
        .map_err(ApiError::from)
}

async fn messages(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<MessagePage>, ApiError> {
    let Query(params) = params?;
    let offset = params.offset.unwrap_or(0);
    let page = blocking(state, move |svc| svc.messages(offset, params.limit)).await?;
    Ok(Json(page))
}

async fn time_range(State(state): State<AppState>) -> Result<Json<TimeRange>, ApiError> {
    blocking(state, |svc| svc.time_range())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No messages"))
}

async fn messages_by_time(
    State(state): State<AppState>,
    params: Result<Query<TimeParams>, QueryRejection>,
) -> Result<Json<MessagePage>, ApiError> {
    let Query(params) = params?;
    let raw = params
        .timestamp
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing 'timestamp' parameter"))?;
    let page = blocking(state, move |svc| svc.messages_by_time(&raw, params.limit)).await?;
    Ok(Json(page))
}

/// Stream an attachment from disk. Range requests are honoured.
async fn attachment(
    State(state): State<AppState>,
    name: Result<Path<String>, PathRejection>,
    request: Request,
) -> Result<Response, ApiError> {
    let Path(name) = name?;
    let lookup = name.clone();
    let path = blocking(state, move |svc| svc.attachment_path(&lookup)).await?;
    let served = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let mut response = served.into_response();
    if response.status().is_success() {
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(AttachmentKind::content_type(&name)),
        );
    }
    Ok(response)
}

async fn stats(State(state): State<AppState>) -> Result<Json<ServerStats>, ApiError> {
    Ok(Json(blocking(state, |svc| svc.stats()).await?))
}

async fn reload(
    State(state): State<AppState>,
    params: Result<Query<ReloadParams>, QueryRejection>,
) -> Result<Json<ReloadOutcome>, ApiError> {
    let Query(params) = params?;
    let outcome = blocking(state, move |svc| svc.reload(params.force)).await?;
    Ok(Json(outcome))
}
