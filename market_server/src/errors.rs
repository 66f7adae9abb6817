use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use market_engine::MarketError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Missing or invalid query parameter. {0}")]
    MissingParameter(String),
    #[error("The data was not found. {0}")]
    NotFound(String),
    #[error("Invalid reference. {0}")]
    InvalidReference(String),
    #[error("Not authorized. {0}")]
    Unauthorized(String),
    #[error("Validation failed. {0}")]
    ValidationFailed(String),
    #[error("The store is unavailable. {0}")]
    StoreUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::MissingParameter(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidReference(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<MarketError> for ServerError {
    fn from(e: MarketError) -> Self {
        match e {
            MarketError::NotFound(s) => Self::NotFound(s),
            MarketError::InvalidReference(s) => Self::InvalidReference(s),
            MarketError::Unauthorized(s) => Self::Unauthorized(s),
            MarketError::ValidationFailed(s) => Self::ValidationFailed(s),
            MarketError::StoreUnavailable(s) => Self::StoreUnavailable(s),
        }
    }
}
