use std::convert::Infallible;

use serde_json::{json, Value};
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidHeader, InvalidQuery, LengthRequired, MethodNotAllowed, MissingHeader,
        PayloadTooLarge, UnsupportedMediaType,
    },
    reply::Response,
    Rejection,
};

use crate::error::ApiRejection;

use super::routes::json_response;

/// JSON body for an error raised by a handler.
///
/// 400s carry either a field map (validation) or `{"errors": ...}`; everything else is
/// `{"detail": ...}`. Internal errors never leak their detail.
fn render_error(error: &potion::Error) -> (StatusCode, Value) {
    let status =
        StatusCode::from_u16(error.code as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let info = error.info.clone().unwrap_or_default();

    match status {
        StatusCode::BAD_REQUEST => match serde_json::from_str::<Value>(&info) {
            Ok(fields @ Value::Object(_)) => (status, fields),
            _ => (status, json!({ "errors": info })),
        },
        s if s.is_server_error() => {
            log::error!("Request failed: {info}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "detail": "Internal server error." }),
            )
        }
        _ => (status, json!({ "detail": info })),
    }
}

fn detail(status: StatusCode, message: &str) -> (StatusCode, Value) {
    (status, json!({ "detail": message }))
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, body) = if let Some(ApiRejection(error)) = err.find() {
        render_error(error)
    } else if err.is_not_found() {
        detail(StatusCode::NOT_FOUND, "Not found.")
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, json!({ "errors": e.to_string() }))
    } else if let Some(e) = err.find::<InvalidQuery>() {
        (StatusCode::BAD_REQUEST, json!({ "errors": e.to_string() }))
    } else if let Some(e) = err.find::<InvalidHeader>() {
        (StatusCode::BAD_REQUEST, json!({ "errors": e.to_string() }))
    } else if let Some(e) = err.find::<MissingHeader>() {
        (StatusCode::BAD_REQUEST, json!({ "errors": e.to_string() }))
    } else if err.find::<PayloadTooLarge>().is_some() {
        detail(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large.")
    } else if err.find::<LengthRequired>().is_some() {
        detail(StatusCode::LENGTH_REQUIRED, "Content-Length is required.")
    } else if err.find::<UnsupportedMediaType>().is_some() {
        detail(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type in request.",
        )
    } else if err.find::<MethodNotAllowed>().is_some() {
        detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else {
        log::error!("Unhandled rejection: {err:?}");
        detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
    };

    Ok(json_response(&body, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{reject, ApiError, HtmlError, ValidationError, NOT_AUTHENTICATED};

    async fn render(err: Rejection) -> (StatusCode, Value) {
        let response = handle_rejection(err).await.unwrap();
        let status = response.status();
        let body = warp::hyper::body::to_bytes(response.into_body())
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_render_as_field_map() {
        let error: potion::Error = ValidationError::field("name", "This field is required.").into();
        let (status, body) = render(reject(error)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "name": ["This field is required."] }));
    }

    #[tokio::test]
    async fn plain_bad_requests_render_as_errors() {
        let (status, body) =
            render(reject(HtmlError::InvalidRequest.new("Shopping cart is empty"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "errors": "Shopping cart is empty" }));
    }

    #[tokio::test]
    async fn auth_errors_render_as_detail() {
        let (status, body) = render(reject(HtmlError::Unauthorized.new(NOT_AUTHENTICATED))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            json!({ "detail": "Authentication credentials were not provided." })
        );

        let (status, _) = render(reject(ApiError::PermissionDenied.default())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn internal_errors_hide_their_detail() {
        let (status, body) =
            render(reject(HtmlError::InternalServerError.new("connection refused"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "detail": "Internal server error." }));
    }

    #[tokio::test]
    async fn unmatched_routes_are_not_found() {
        let (status, body) = render(warp::reject::not_found()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "detail": "Not found." }));
    }
}
