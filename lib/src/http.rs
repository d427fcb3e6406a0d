//! HTTP transport for a ready [`PredictionService`].
//!
//! ```text
//! GET  /          health
//! POST /predict   {workout_type, duration_minutes, calories_intake, sleep_hours}
//! GET  /metrics   RMSE, MAE, R2, CV_RMSE, CV_R2
//! ```
//!
//! Errors are answered with `{"error": ...}` and the status class of the
//! underlying [`PerfError`]; none of them affect the service. Requests warp
//! turns away before a handler runs (unknown path, wrong method, oversized
//! body) get the same JSON shape.

use crate::error::{PerfError, Result};
use crate::service::{ErrorResponse, PredictionService, Ready};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use tracing::{info, warn};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge};
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

/// Largest accepted request body.
const MAX_BODY_BYTES: u64 = 16 * 1024;

fn ok_json<T: serde::Serialize>(value: &T) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(value), StatusCode::OK)
}

fn error_json(err: &PerfError) -> WithStatus<Json> {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warp::reply::with_status(warp::reply::json(&ErrorResponse::from(err)), status)
}

fn status_json(status: StatusCode, message: impl Into<String>) -> WithStatus<Json> {
    let body = ErrorResponse {
        error: message.into(),
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}

async fn handle_rejection(err: Rejection) -> std::result::Result<WithStatus<Json>, Infallible> {
    let reply = if err.is_not_found() {
        status_json(StatusCode::NOT_FOUND, "not found")
    } else if let Some(e) = err.find::<PayloadTooLarge>() {
        status_json(StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
    } else if let Some(e) = err.find::<LengthRequired>() {
        status_json(StatusCode::LENGTH_REQUIRED, e.to_string())
    } else if let Some(e) = err.find::<MethodNotAllowed>() {
        status_json(StatusCode::METHOD_NOT_ALLOWED, e.to_string())
    } else {
        warn!(rejection = ?err, "unhandled rejection");
        status_json(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    };
    Ok(reply)
}

fn handle_predict(service: &PredictionService<Ready>, body: &[u8]) -> WithStatus<Json> {
    let parsed = serde_json::from_slice(body)
        .map_err(|e| PerfError::InvalidInput(format!("malformed JSON body: {}", e)));
    match parsed.and_then(|value| service.predict(&value)) {
        Ok(response) => ok_json(&response),
        Err(err) => {
            warn!(error = %err, "rejected prediction request");
            error_json(&err)
        }
    }
}

/// All routes of the prediction API.
pub fn routes(
    service: PredictionService<Ready>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = {
        let service = service.clone();
        warp::path::end()
            .and(warp::get())
            .map(move || ok_json(&service.health()))
    };

    let predict = {
        let service = service.clone();
        warp::path("predict")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::content_length_limit(MAX_BODY_BYTES))
            .and(warp::body::bytes())
            .map(move |body: Bytes| handle_predict(&service, &body))
    };

    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || match service.metrics() {
            Ok(map) => ok_json(&map),
            Err(err) => error_json(&err),
        });

    health
        .or(predict)
        .unify()
        .or(metrics)
        .unify()
        .recover(handle_rejection)
        .unify()
}

/// Bind `addr` and serve until `shutdown` resolves.
///
/// Returns the bound address and the server future; binding errors surface
/// here, before anything is served.
pub fn bind(
    service: PredictionService<Ready>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = ()>)> {
    let (bound, server) = warp::serve(routes(service))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .map_err(|e| PerfError::Io(std::io::Error::new(std::io::ErrorKind::AddrInUse, e)))?;
    info!(addr = %bound, "listening");
    Ok((bound, server))
}
