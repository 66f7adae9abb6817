use crate::{
    db_types::{NewProduct, NewUser, ObjectId, Product, User},
    traits::MarketError,
};

/// Users and products, as far as the consistency flows need them.
///
/// Sign-up, login and product search live outside this engine. This trait is the boundary they write through.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn insert_user(&self, user: NewUser) -> Result<User, MarketError>;

    async fn fetch_user(&self, user_id: &ObjectId) -> Result<Option<User>, MarketError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, MarketError>;

    /// Fetches the product, including its current rating aggregate.
    async fn fetch_product(&self, product_id: &ObjectId) -> Result<Option<Product>, MarketError>;
}
