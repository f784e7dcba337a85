use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pinboard_core::CoreError;
use pinboard_types::api::ApiResponse;
use tracing::error;

/// A failed request: HTTP status plus the message of a `status: 0` envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{} not found", what))
    }

    /// Log the cause and hide it from the client.
    pub fn internal(cause: anyhow::Error) -> Self {
        error!("Internal error: {:#}", cause);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(what) => Self::not_found(what),
            CoreError::NoInvitation => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            CoreError::AccessDenied | CoreError::PasswordRequired | CoreError::PasswordInvalid => {
                Self::forbidden(err.to_string())
            }
            CoreError::Validation(message) => Self::bad_request(message),
            CoreError::Aggregate { .. } | CoreError::Deadline(_) => {
                error!("Aggregation failed: {}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load board contents")
            }
            CoreError::Cache(_) => {
                error!("Permission cache failure: {}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            CoreError::Store(cause) => Self::internal(cause),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::fail(self.message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_statuses() {
        let cases = [
            (CoreError::NotFound("board"), StatusCode::NOT_FOUND),
            (CoreError::AccessDenied, StatusCode::FORBIDDEN),
            (CoreError::NoInvitation, StatusCode::NOT_FOUND),
            (CoreError::PasswordInvalid, StatusCode::FORBIDDEN),
            (CoreError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                CoreError::Deadline(std::time::Duration::from_millis(5)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CoreError::Aggregate {
                    unit: "notes",
                    cause: anyhow::anyhow!("boom"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn access_denied_keeps_its_message() {
        let err = ApiError::from(CoreError::AccessDenied);
        assert_eq!(err.message, "User does not have the access");
        assert_eq!(ApiError::from(CoreError::NotFound("board")).message, "board not found");
    }
}
