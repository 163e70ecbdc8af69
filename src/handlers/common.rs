use crate::{errors::ServiceError, ApiResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// 201 with the created resource wrapped in `ApiResponse`
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Turns a lookup miss into `NotFound` naming the resource.
pub fn found<T>(value: Option<T>, resource: &str, id: i32) -> Result<T, ServiceError> {
    value.ok_or_else(|| ServiceError::NotFound(format!("{resource} {id} not found")))
}

/// 204 when the row was removed, `NotFound` otherwise.
pub fn deleted(removed: bool, resource: &str, id: i32) -> Result<Response, ServiceError> {
    if removed {
        Ok(no_content_response())
    } else {
        Err(ServiceError::NotFound(format!("{resource} {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_become_not_found() {
        let err = found::<i32>(None, "Order", 9).unwrap_err();
        assert_eq!(err.to_string(), "Not found: Order 9 not found");
        assert_eq!(found(Some(3), "Order", 9).unwrap(), 3);
    }

    #[test]
    fn delete_maps_to_no_content() {
        let response = deleted(true, "Shipment", 1).unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(matches!(
            deleted(false, "Shipment", 1),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn created_uses_201() {
        assert_eq!(created_response("x").status(), StatusCode::CREATED);
    }
}
