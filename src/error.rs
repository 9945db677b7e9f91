use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /* mapped errors */
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    UrlError(#[from] url::ParseError),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    #[error(transparent)]
    ConfigError(#[from] config::ConfigError),

    #[error(transparent)]
    SetLoggerError(#[from] log::SetLoggerError),

    /* bridge errors */
    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Controller rejected request during {0}: {1}")]
    DeviceError(String, String),

    #[error("Tank not found: {0}")]
    TankNotFound(String),
}

impl ApiError {
    pub fn service_error(msg: impl AsRef<str>) -> Self {
        Self::ServiceError(msg.as_ref().to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::TankNotFound(_) => StatusCode::NOT_FOUND,
            Self::ReqwestError(_) | Self::DeviceError(..) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
