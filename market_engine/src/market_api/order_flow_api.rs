use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{MissingProductPolicy, ObjectId, Order, OrderHistoryScope},
    events::{EventProducers, OrderPlacedEvent},
    helpers::KeyLocks,
    traits::{BuyRequest, CheckoutRequest, MarketError, OrderManagement, OrderPlacement},
};

/// Settings for the legacy behaviours of the purchase flows. The defaults are the corrected behaviours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFlowOptions {
    pub scope: OrderHistoryScope,
    pub missing_product: MissingProductPolicy,
}

/// `OrderFlowApi` is the primary API for placing orders, either from the user's cart or for a single product.
///
/// Purchases for one user are serialised through the user's key lock, which is also held by [`crate::CartApi`].
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    locks: KeyLocks,
    options: OrderFlowOptions,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.options)
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, locks: KeyLocks::default(), options: OrderFlowOptions::default() }
    }

    pub fn with_locks(mut self, locks: KeyLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_options(mut self, options: OrderFlowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> OrderFlowOptions {
        self.options
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Turns the user's cart into a cash order and empties the cart.
    ///
    /// If `idempotency_key` has already been used by this user, the order recorded under it is returned and no new
    /// order is placed.
    pub async fn checkout(
        &self,
        user_id: &ObjectId,
        idempotency_key: Option<String>,
    ) -> Result<OrderPlacement, MarketError> {
        let _guard = self.locks.lock(KeyLocks::user_key(user_id)).await;
        let request = CheckoutRequest::new(user_id.clone())
            .with_idempotency_key(idempotency_key)
            .with_scope(self.options.scope);
        let placement = self.db.checkout(request).await?;
        if placement.created {
            info!(
                "📦️ Order {} placed for user {user_id}. {} items, total {}",
                placement.order.id,
                placement.order.items.len(),
                placement.order.price
            );
            self.call_order_placed_hook(&placement.order).await;
        } else {
            info!("📦️ Checkout for user {user_id} replayed. Returning existing order {}", placement.order.id);
        }
        Ok(placement)
    }

    /// Places a one-item cash order for the product without touching the user's cart.
    pub async fn buy(
        &self,
        user_id: &ObjectId,
        product_id: &ObjectId,
        idempotency_key: Option<String>,
    ) -> Result<OrderPlacement, MarketError> {
        let _guard = self.locks.lock(KeyLocks::user_key(user_id)).await;
        let request = BuyRequest::new(user_id.clone(), product_id.clone())
            .with_idempotency_key(idempotency_key)
            .with_scope(self.options.scope)
            .with_missing_product_policy(self.options.missing_product);
        let placement = self.db.buy(request).await?;
        if placement.created {
            info!("📦️ Order {} placed for user {user_id}. Bought product {product_id}", placement.order.id);
            self.call_order_placed_hook(&placement.order).await;
        } else {
            info!("📦️ Purchase by user {user_id} replayed. Returning existing order {}", placement.order.id);
        }
        Ok(placement)
    }

    pub async fn orders_for_user(&self, user_id: &ObjectId) -> Result<Vec<Order>, MarketError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    async fn call_order_placed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_placed_producer {
            debug!("📦️ Notifying order placed hook subscribers");
            emitter.publish_event(OrderPlacedEvent::new(order.clone())).await;
        }
    }
}
