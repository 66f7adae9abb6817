//! Marketplace Engine
//!
//! This library contains the consistency core of the marketplace backend: carts, purchases, product reviews and
//! two-party chats. It is transport-agnostic; the HTTP surface lives in `market_server`.
//!
//! The library is divided into two main sections:
//! 1. Storage ([`mod@sqlite`] and [`mod@traits`]). SQLite is the supported backend. You should never need to access
//!    the database directly. Instead, use the public API provided by the engine. The exception is the data types
//!    used in the database. These are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@market_api`]). This provides the public-facing functionality of the engine:
//!    validation, per-key serialisation of multi-step flows, and event publication. Backends need to implement the
//!    traits in [`mod@traits`] in order to be used by the APIs.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted after a flow has been
//! committed. For example, when an order is placed, an `OrderPlacedEvent` is emitted.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod market_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use market_api::{
    cart_api::CartApi,
    catalog_api::CatalogApi,
    chat_api::ChatApi,
    order_flow_api::{OrderFlowApi, OrderFlowOptions},
    review_api::ReviewApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    BuyRequest,
    CartManagement,
    CartView,
    CatalogManagement,
    ChatManagement,
    CheckoutRequest,
    MarketDatabase,
    MarketError,
    OrderManagement,
    OrderPlacement,
    ReviewManagement,
    ReviewOutcome,
};
