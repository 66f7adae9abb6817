//! Query strings and JSON bodies accepted and returned by the routes.
//!
//! Identifiers arrive as plain strings and are parsed in the handlers, so that a malformed id is reported as an invalid
//! reference rather than a generic deserialization failure.
use market_engine::db_types::UpsertStatus;
use serde::{Deserialize, Serialize};

/// `?id=<productID>&userID=<userID>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUserParams {
    pub id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Optional idempotency key. Only `/buy` looks at it.
    pub key: Option<String>,
}

/// `?id=<userID>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserParams {
    pub id: String,
    /// Optional idempotency key. Only `/checkout` looks at it.
    pub key: Option<String>,
}

/// `?userID=<userID>&limit=<n>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerParams {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub limit: Option<String>,
}

/// `?limit=<n>`. Kept as a string so that a non-numeric limit falls back to the default page size.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitParams {
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub rating: f64,
    pub review: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatRequest {
    #[serde(rename = "peerId")]
    pub peer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkReadRequest {
    pub upto: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub status: UpsertStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { status: "ok".into() }
    }
}
