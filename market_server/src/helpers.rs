use std::{future::Future, time::Duration};

use log::*;
use market_engine::{db_types::ObjectId, MarketError};

use crate::errors::ServerError;

/// Runs an engine call within the request deadline.
///
/// If the deadline passes first, the call's future is dropped, which rolls back any open transaction, and the request
/// fails with `StoreUnavailable`.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, ServerError>
where F: Future<Output = Result<T, MarketError>> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(ServerError::from),
        Err(_) => {
            warn!("💻️ Request did not complete within {}ms. Abandoning it.", deadline.as_millis());
            let msg = format!("The request did not complete within {}ms", deadline.as_millis());
            Err(ServerError::StoreUnavailable(msg))
        },
    }
}

/// Parses the value of the named parameter as an object id.
pub fn parse_id(name: &str, value: &str) -> Result<ObjectId, ServerError> {
    value.parse::<ObjectId>().map_err(|e| {
        debug!("💻️ Invalid {name} parameter. {e}");
        ServerError::InvalidReference(format!("{name}: {e}"))
    })
}
