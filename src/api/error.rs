use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

use crate::domain::order::OrderError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: u16,
    error: &'static str,
    message: String,
}

impl ResponseError for OrderError {
    fn status_code(&self) -> StatusCode {
        match self {
            OrderError::NotFound(_) => StatusCode::NOT_FOUND,
            OrderError::AccessDenied(_) => StatusCode::FORBIDDEN,
            OrderError::InvalidState(_) | OrderError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            OrderError::InvalidTransition { .. } => StatusCode::CONFLICT,
            OrderError::ReferenceError { caller_supplied: true, .. } => StatusCode::BAD_REQUEST,
            OrderError::ReferenceError { caller_supplied: false, .. } | OrderError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Internal details stay in the logs
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(ErrorBody {
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error"),
            message,
        })
    }
}
