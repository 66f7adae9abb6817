//! # Storage backend contracts
//!
//! This module defines the behaviour a storage backend must expose to be used by the marketplace engine. The public
//! APIs in [`crate::market_api`] are generic over these traits, so a backend only needs to implement the traits for
//! the APIs it will be used with.
//!
//! * [`CatalogManagement`] creates and looks up users and products.
//! * [`CartManagement`] maintains the product snapshots held in each user's cart.
//! * [`OrderManagement`] turns carts (or single products) into orders. Every purchase runs as one atomic sequence of
//!   [`crate::db_types::CheckoutStage`]s.
//! * [`ReviewManagement`] stores reviews and keeps each product's rating aggregate in step with them.
//! * [`ChatManagement`] stores two-party chats and messages and keeps the per-member unread counters consistent with
//!   the read receipts on messages.
//! * [`MarketDatabase`] ties these together for a complete backend.
mod cart_management;
mod catalog_management;
mod chat_management;
mod data_objects;
mod market_database;
mod order_management;
mod review_management;

pub use cart_management::CartManagement;
pub use catalog_management::CatalogManagement;
pub use chat_management::ChatManagement;
pub use data_objects::{cart_total, BuyRequest, CartView, CheckoutRequest, OrderPlacement, ReviewOutcome};
pub use market_database::{MarketDatabase, MarketError};
pub use order_management::OrderManagement;
pub use review_management::ReviewManagement;
