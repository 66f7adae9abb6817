use crate::{
    db_types::{ObjectId, ProductSnapshot},
    traits::MarketError,
};

#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// Appends a snapshot of the product to the end of the user's cart. Adding the same product twice gives two cart
    /// entries.
    ///
    /// ## Failure modes:
    /// - `NotFound` if the product or the user does not exist.
    async fn add_to_cart(&self, user_id: &ObjectId, product_id: &ObjectId) -> Result<ProductSnapshot, MarketError>;

    /// Removes **every** entry for the product from the user's cart and returns how many were removed. Removing a
    /// product that is not in the cart is not an error.
    async fn remove_from_cart(&self, user_id: &ObjectId, product_id: &ObjectId) -> Result<u64, MarketError>;

    /// The user's cart, in the order the items were added. `NotFound` if the user does not exist.
    async fn fetch_cart(&self, user_id: &ObjectId) -> Result<Vec<ProductSnapshot>, MarketError>;
}
