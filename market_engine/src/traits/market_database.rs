use thiserror::Error;

use crate::{
    db_types::CheckoutStage,
    traits::{CartManagement, CatalogManagement, ChatManagement, OrderManagement, ReviewManagement},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("The requested record was not found. {0}")]
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

impl MarketError {
    /// Wraps a storage failure with the purchase stage that was running when it happened.
    pub fn at_stage(stage: CheckoutStage, e: sqlx::Error) -> Self {
        Self::StoreUnavailable(format!("Purchase aborted during {stage}. {e}"))
    }
}

impl From<sqlx::Error> for MarketError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound(e.to_string()),
            e => Self::StoreUnavailable(e.to_string()),
        }
    }
}

/// The complete set of behaviour for a marketplace storage backend.
#[allow(async_fn_in_trait)]
pub trait MarketDatabase:
    Clone + CatalogManagement + CartManagement + OrderManagement + ReviewManagement + ChatManagement
{
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketError>;
}
