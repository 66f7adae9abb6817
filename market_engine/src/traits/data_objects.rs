use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        MissingProductPolicy,
        ObjectId,
        Order,
        OrderHistoryScope,
        Price,
        ProductSnapshot,
        RatingAggregate,
        Review,
        UpsertStatus,
    },
    traits::MarketError,
};

/// The exact sum of the snapshot prices.
pub fn cart_total(cart: &[ProductSnapshot]) -> Result<Price, MarketError> {
    Price::checked_sum(cart.iter().map(|p| p.price))
        .ok_or_else(|| MarketError::ValidationFailed("The cart total is too large to be represented".into()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub user_id: ObjectId,
    pub idempotency_key: Option<String>,
    pub scope: OrderHistoryScope,
}

impl CheckoutRequest {
    pub fn new(user_id: ObjectId) -> Self {
        Self { user_id, idempotency_key: None, scope: OrderHistoryScope::default() }
    }

    pub fn with_idempotency_key(mut self, key: Option<String>) -> Self {
        self.idempotency_key = key;
        self
    }

    pub fn with_scope(mut self, scope: OrderHistoryScope) -> Self {
        self.scope = scope;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyRequest {
    pub user_id: ObjectId,
    pub product_id: ObjectId,
    pub idempotency_key: Option<String>,
    pub scope: OrderHistoryScope,
    pub missing_product: MissingProductPolicy,
}

impl BuyRequest {
    pub fn new(user_id: ObjectId, product_id: ObjectId) -> Self {
        Self {
            user_id,
            product_id,
            idempotency_key: None,
            scope: OrderHistoryScope::default(),
            missing_product: MissingProductPolicy::default(),
        }
    }

    pub fn with_idempotency_key(mut self, key: Option<String>) -> Self {
        self.idempotency_key = key;
        self
    }

    pub fn with_scope(mut self, scope: OrderHistoryScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_missing_product_policy(mut self, policy: MissingProductPolicy) -> Self {
        self.missing_product = policy;
        self
    }
}

/// The order a purchase produced. `created` is false when an idempotency key matched an earlier order, in which case
/// `order` is that earlier order and nothing was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlacement {
    pub order: Order,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub status: UpsertStatus,
    pub review: Review,
    pub rating: RatingAggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartView {
    pub total: Price,
    pub cart: Vec<ProductSnapshot>,
}

impl CartView {
    /// Fails with `ValidationFailed` if the cart total does not fit in a `Price`.
    pub fn try_new(cart: Vec<ProductSnapshot>) -> Result<Self, MarketError> {
        let total = cart_total(&cart)?;
        Ok(Self { total, cart })
    }
}
