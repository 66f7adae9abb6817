use serde::{Deserialize, Serialize};

use crate::db_types::{Chat, Message, Order, RatingAggregate, Review, UpsertStatus};

/// Published after a checkout or direct purchase has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: Order,
}

impl OrderPlacedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Published after a review and the product's rating aggregate have been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmittedEvent {
    pub status: UpsertStatus,
    pub review: Review,
    pub rating: RatingAggregate,
}

/// Published after a message and the chat's unread counters have been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSentEvent {
    pub message: Message,
    pub chat: Chat,
}
