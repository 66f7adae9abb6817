//! # Marketplace engine public API
//!
//! The `market_api` module exposes the programmatic API for the marketplace consistency flows.
//! The API is modular, so that clients of the API can pick and choose the functionality they want.
//!
//! * [`cart_api`] adds and removes product snapshots in a user's cart.
//! * [`order_flow_api`] handles checkout and direct purchase.
//! * [`review_api`] validates reviews, keeps product ratings in step with them and runs rating reconciliation.
//! * [`chat_api`] manages two-party chats, messages and unread counters.
//! * [`catalog_api`] seeds users and products.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the specific backend traits required by
//! the API. APIs that run multi-step flows also take a [`KeyLocks`] registry. Share one registry between every API
//! instance that talks to the same store, otherwise flows on the same key are not serialised against each other.
//!
//! ```rust,ignore
//! use market_engine::{CartApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements CartManagement
//! let api = CartApi::new(db);
//! let snapshot = api.add(&user_id, &product_id).await?;
//! ```
//!
//! [`KeyLocks`]: crate::helpers::KeyLocks

pub mod cart_api;
pub mod catalog_api;
pub mod chat_api;
pub mod order_flow_api;
pub mod review_api;

/// Longest review or chat message text, in characters.
pub const MAX_TEXT_LENGTH: usize = 4000;

/// Checks that `text` has between 1 and [`MAX_TEXT_LENGTH`] characters.
pub(crate) fn validate_text(field: &str, text: &str) -> Result<(), crate::traits::MarketError> {
    let len = text.chars().count();
    if len == 0 || len > MAX_TEXT_LENGTH {
        return Err(crate::traits::MarketError::ValidationFailed(format!(
            "{field} must be between 1 and {MAX_TEXT_LENGTH} characters long, but it has {len}"
        )));
    }
    Ok(())
}

/// Brings a requested page size into `[1, MAX_PAGE_LIMIT]`.
pub(crate) fn page_limit(limit: i64) -> i64 {
    limit.clamp(1, mkt_common::MAX_PAGE_LIMIT)
}
