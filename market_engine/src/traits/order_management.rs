use crate::{
    db_types::{ObjectId, Order},
    traits::{BuyRequest, CheckoutRequest, MarketError, OrderPlacement},
};

/// Purchases.
///
/// Both purchase flows run their stages (see [`crate::db_types::CheckoutStage`]) in a single atomic transaction. When
/// the request carries an idempotency key that the user has already used, the existing order is returned and nothing
/// is written.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Turns the user's current cart into a new cash order and empties the cart.
    ///
    /// * The order total is the sum of the snapshot prices in the cart. An empty cart gives an order for zero.
    /// * The cart items are attached according to the request's [`crate::db_types::OrderHistoryScope`].
    ///
    /// ## Failure modes:
    /// - `NotFound` if the user does not exist.
    /// - `StoreUnavailable` if any stage fails. Nothing is written in that case.
    async fn checkout(&self, request: CheckoutRequest) -> Result<OrderPlacement, MarketError>;

    /// Records a single-product order without touching the cart.
    ///
    /// A missing product is handled according to the request's [`crate::db_types::MissingProductPolicy`].
    async fn buy(&self, request: BuyRequest) -> Result<OrderPlacement, MarketError>;

    /// All the user's orders, oldest first. `NotFound` if the user does not exist.
    async fn fetch_orders_for_user(&self, user_id: &ObjectId) -> Result<Vec<Order>, MarketError>;
}
