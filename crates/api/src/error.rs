//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dispatch::{EngineError, GeocodeError};
use domain::{DomainError, ErrorClass};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Error from the delivery engine.
    Engine(EngineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Engine(err) => engine_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn engine_error_to_response(err: EngineError) -> (StatusCode, String) {
    let status = match &err {
        EngineError::Domain(domain_err) => domain_status(domain_err),
        EngineError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        EngineError::Store(store_err) if store_err.is_conflict() => StatusCode::CONFLICT,
        EngineError::Geocode(GeocodeError::StreetRequired) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err.class() {
        ErrorClass::Validation => StatusCode::BAD_REQUEST,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::Invariant => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Engine(EngineError::Domain(err))
    }
}

#[cfg(test)]
mod tests {
    use domain::{Axis, CourierError, LocationError};

    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn maps_errors_to_status_codes() {
        let validation = DomainError::from(LocationError::OutOfRange {
            axis: Axis::X,
            value: 11,
        });
        assert_eq!(status_of(validation.into()), StatusCode::BAD_REQUEST);

        let conflict = DomainError::from(CourierError::AlreadyBusy);
        assert_eq!(status_of(conflict.into()), StatusCode::CONFLICT);

        let missing = EngineError::Store(StoreError::NotFound {
            kind: "Order",
            id: "B1".to_string(),
        });
        assert_eq!(status_of(missing.into()), StatusCode::NOT_FOUND);

        let outage = EngineError::Store(StoreError::Database(sqlx::Error::PoolClosed));
        assert_eq!(status_of(outage.into()), StatusCode::INTERNAL_SERVER_ERROR);

        let street = EngineError::Geocode(GeocodeError::StreetRequired);
        assert_eq!(status_of(street.into()), StatusCode::BAD_REQUEST);

        assert_eq!(
            status_of(ApiError::BadRequest("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn body_carries_the_error_message() {
        let response = ApiError::BadRequest("unknown transport".to_string()).into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "unknown transport" }));
    }
}
