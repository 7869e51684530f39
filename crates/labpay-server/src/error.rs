//! API Error Mapping
//!
//! One place turns a `PaymentError` into an HTTP response: user-facing kinds
//! carry their message, internal kinds surface a generic one, and the full
//! error text rides in a separate `detail` field only when the debug toggle
//! is on.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use labpay_catalog::CatalogError;
use labpay_payments::PaymentError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// An API failure ready to serialize.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn from_payment(error: PaymentError, debug_detail: bool) -> Self {
        Self {
            status: status_for(&error),
            message: error.user_message(),
            detail: debug_detail.then(|| error.to_string()),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            detail: None,
        }
    }
}

fn status_for(error: &PaymentError) -> StatusCode {
    match error {
        PaymentError::Validation(_) | PaymentError::Signature(_) => StatusCode::BAD_REQUEST,
        PaymentError::NotFound(_) | PaymentError::Catalog(CatalogError::NotFound { .. }) => {
            StatusCode::NOT_FOUND
        }
        PaymentError::SoldOut(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
                detail: self.detail,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PaymentError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (PaymentError::NotFound("lab \"x\"".into()), StatusCode::NOT_FOUND),
            (PaymentError::SoldOut("lab_1".into()), StatusCode::CONFLICT),
            (
                PaymentError::ProcessorUnavailable("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PaymentError::Catalog(CatalogError::NotFound {
                    collection: "labs".into(),
                    key: "x".into(),
                }),
                StatusCode::NOT_FOUND,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(status_for(&error), expected);
        }
    }

    #[test]
    fn test_detail_only_in_debug_mode() {
        let error = PaymentError::Configuration("missing key".into());
        assert!(ApiError::from_payment(error, false).detail.is_none());

        let error = PaymentError::Configuration("missing key".into());
        let with_detail = ApiError::from_payment(error, true);
        assert!(with_detail.detail.as_deref().is_some_and(|d| d.contains("missing key")));
        // The public message stays generic either way.
        assert!(!with_detail.message.contains("missing key"));
    }
}
