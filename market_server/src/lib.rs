//! # Marketplace server
//! This crate hosts the HTTP surface of the marketplace backend. It is responsible for:
//! * Parsing query strings and request bodies, and turning malformed ids into `400 Bad Request` responses.
//! * Calling the engine APIs in [`market_engine`] within the configured request deadline.
//! * Mapping engine errors to HTTP status codes.
//! * Running the rating reconciliation worker in the background.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/add`, `/remove`, `/list`: cart management.
//! * `/checkout`, `/buy`, `/orders`: purchases and order history.
//! * `/products/{pid}/reviews`: submit and list product reviews.
//! * `/chats`, `/chats/{chat_id}/messages`, `/chats/{chat_id}/read`: two-party chats.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod reconcile_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
