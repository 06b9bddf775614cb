pub mod auth;
pub mod deliveries;
pub mod drivers;
pub mod pairing;
pub mod ws;

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Request, State};
use axum::http::header::ALLOW;
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::engine::locator::LocatorStrategy;
use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor whose rejection is turned into an `AppError`.
pub type JsonBody<T> = Result<Json<T>, JsonRejection>;

pub type PathId = Result<Path<Uuid>, PathRejection>;

/// Successful response: `{ "ok": true, ...body }`.
#[derive(Serialize)]
pub struct Success<T> {
    ok: bool,
    #[serde(flatten)]
    body: T,
}

pub fn success<T: Serialize>(body: T) -> Json<Success<T>> {
    Json(Success { ok: true, body })
}

pub fn router(state: Arc<AppState>) -> Router {
    let business = Router::new()
        .merge(pairing::router())
        .merge(deliveries::router())
        .merge(drivers::router())
        .route("/ws", get(ws::ws_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    Router::new()
        .merge(business)
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(method_not_allowed_as_json)),
        )
        .with_state(state)
}

async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {method} {}", uri.path()))
}

/// Gives axum's bodiless 405 the same JSON shape as every other error,
/// keeping its `Allow` header.
async fn method_not_allowed_as_json(
    method: Method,
    uri: Uri,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let allow = response.headers().get(ALLOW).cloned();
    let mut json =
        AppError::MethodNotAllowed(format!("{method} is not allowed on {}", uri.path()))
            .into_response();
    if let Some(allow) = allow {
        json.headers_mut().insert(ALLOW, allow);
    }
    json
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    status: &'static str,
    locator: &'static str,
    scheduler_enabled: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let locator = match LocatorStrategy::for_store(state.store.as_ref()) {
        LocatorStrategy::GeoIndex => "geo_index",
        LocatorStrategy::Haversine => "haversine",
    };

    Json(HealthResponse {
        ok: true,
        status: "ok",
        locator,
        scheduler_enabled: state.scheduler.enabled,
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
