//! HTTP surface for the stored maps.
//!
//! `GET /` lists the stored map identifiers, `GET /map/{id}` renders one map
//! as SVG. Every response is marked `no-cache` since node status may change
//! between requests.

use std::fmt::Write as _;
use std::net::SocketAddr;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::MapperError;
use crate::service::MapService;
use crate::svg::escape_xml;

const NO_CACHE: (header::HeaderName, &str) = (header::CACHE_CONTROL, "no-cache");

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unprocessable: {0}")]
    Unprocessable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unprocessable(_) => "MALFORMED_MAP",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<MapperError> for ApiError {
    fn from(err: MapperError) -> Self {
        match err {
            MapperError::UnknownMapDocument(_) => Self::NotFound(err.to_string()),
            MapperError::InvalidMapId(_) => Self::BadRequest(err.to_string()),
            MapperError::MalformedMapDocument { .. } => Self::Unprocessable(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
        };

        warn!(
            error_code = body.error,
            error_message = %body.message,
            status = %status,
            "map request failed"
        );

        (status, [NO_CACHE], Json(body)).into_response()
    }
}

pub fn build_router(service: MapService) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/map/{id}", get(map))
        .with_state(service)
}

async fn index(State(service): State<MapService>) -> Result<Response, ApiError> {
    let listing = blocking(move || service.list()).await?;
    let mut body = String::new();
    for id in &listing.maps {
        let id = escape_xml(id);
        let _ = writeln!(body, "<a href=\"/map/{id}\">{id}</a><br />");
    }
    Ok(([NO_CACHE], Html(body)).into_response())
}

async fn map(
    State(service): State<MapService>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let svg = blocking(move || service.render(&id)).await?;
    Ok((
        [(header::CONTENT_TYPE, "image/svg+xml"), NO_CACHE],
        svg,
    )
        .into_response())
}

async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, MapperError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .map_err(ApiError::from)
}

/// Serves `service` on `bind` until the process is stopped.
pub fn serve(service: MapService, bind: SocketAddr) -> Result<(), MapperError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| MapperError::Server(err.to_string()))?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .map_err(|err| MapperError::Server(format!("bind {bind}: {err}")))?;
        info!(%bind, "serving maps");
        axum::serve(listener, build_router(service))
            .await
            .map_err(|err| MapperError::Server(err.to_string()))
    })
}
