use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{ObjectId, ProductSnapshot},
    helpers::KeyLocks,
    traits::{CartManagement, CartView, MarketError},
};

/// `CartApi` maintains the product snapshots in a user's cart.
///
/// Every call holds the user's key lock, so cart edits never interleave with a checkout for the same user.
pub struct CartApi<B> {
    db: B,
    locks: KeyLocks,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, locks: KeyLocks::default() }
    }

    pub fn with_locks(mut self, locks: KeyLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    /// Appends a snapshot of the product to the user's cart and returns it.
    pub async fn add(&self, user_id: &ObjectId, product_id: &ObjectId) -> Result<ProductSnapshot, MarketError> {
        let _guard = self.locks.lock(KeyLocks::user_key(user_id)).await;
        let snapshot = self.db.add_to_cart(user_id, product_id).await?;
        debug!("🛒️ Added {} ({}) to the cart of user {user_id}", snapshot.name, snapshot.price);
        Ok(snapshot)
    }

    /// Removes every entry for the product from the user's cart. Returns the number of entries removed.
    pub async fn remove(&self, user_id: &ObjectId, product_id: &ObjectId) -> Result<u64, MarketError> {
        let _guard = self.locks.lock(KeyLocks::user_key(user_id)).await;
        let removed = self.db.remove_from_cart(user_id, product_id).await?;
        debug!("🛒️ Removed {removed} entries for product {product_id} from the cart of user {user_id}");
        Ok(removed)
    }

    pub async fn view(&self, user_id: &ObjectId) -> Result<CartView, MarketError> {
        let cart = self.db.fetch_cart(user_id).await?;
        let view = CartView::try_new(cart)?;
        trace!("🛒️ Cart for user {user_id} has {} items totalling {}", view.cart.len(), view.total);
        Ok(view)
    }
}
