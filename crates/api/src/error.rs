use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not Found")] NotFound,
}

#[derive(Serialize)]
struct ErrorBody<'a> { error: ErrorObj<'a> }
#[derive(Serialize)]
struct ErrorObj<'a> { code: &'a str, message: &'a str }

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        };
        let msg = self.to_string();
        (status, Json(ErrorBody { error: ErrorObj { code, message: &msg } })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
