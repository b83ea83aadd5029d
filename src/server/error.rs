use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::error::ErrorKind;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    UnprocessableEntity,
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad request",
            ApiError::NotFound => "not found",
            ApiError::UnprocessableEntity => "unprocessable entity",
            ApiError::Internal(_) => "internal server error",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: u16,
    message: &'static str,
}

/// Error code of a failed request. Error bodies are sent with HTTP 200, this
/// extension keeps the real code around for [`mirror_logical_status`].
#[derive(Clone, Copy, Debug)]
pub struct LogicalStatus(pub StatusCode);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::BadRequest(reason) => tracing::info!("Rejected request: {reason}"),
            ApiError::Internal(error) => tracing::error!("Internal error: {error:#}"),
            _ => {}
        }
        let status = self.status();
        let mut response = Json(ErrorBody {
            success: false,
            error: status.as_u16(),
            message: self.message(),
        })
        .into_response();
        response.extensions_mut().insert(LogicalStatus(status));
        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> ApiError {
        match error {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            sqlx::Error::Database(ref db_error)
                if matches!(
                    db_error.kind(),
                    ErrorKind::ForeignKeyViolation
                        | ErrorKind::UniqueViolation
                        | ErrorKind::NotNullViolation
                        | ErrorKind::CheckViolation
                ) =>
            {
                tracing::info!("Constraint violation: {db_error}");
                ApiError::UnprocessableEntity
            }
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> ApiError {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<prometheus::Error> for ApiError {
    fn from(error: prometheus::Error) -> ApiError {
        ApiError::Internal(error.into())
    }
}

/// Moves the logical error code onto the HTTP status line.
pub async fn mirror_logical_status(mut response: Response) -> Response {
    if let Some(LogicalStatus(status)) = response.extensions().get::<LogicalStatus>().copied() {
        *response.status_mut() = status;
    }
    response
}
