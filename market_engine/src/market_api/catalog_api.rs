use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewProduct, NewUser, ObjectId, Product, User},
    traits::{CatalogManagement, MarketError},
};

/// Creates and looks up the users and products that the other flows refer to.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub async fn create_user(&self, user: NewUser) -> Result<User, MarketError> {
        if user.name.trim().is_empty() {
            return Err(MarketError::ValidationFailed("A user needs a name".into()));
        }
        if !user.email.contains('@') {
            return Err(MarketError::ValidationFailed(format!("'{}' is not an email address", user.email)));
        }
        let user = self.db.insert_user(user).await?;
        info!("🗃️ Created user {} ({})", user.id, user.name);
        Ok(user)
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product, MarketError> {
        if product.name.trim().is_empty() {
            return Err(MarketError::ValidationFailed("A product needs a name".into()));
        }
        if product.price.value() < 0 {
            return Err(MarketError::ValidationFailed(format!("Product price cannot be negative ({})", product.price)));
        }
        let product = self.db.insert_product(product).await?;
        info!("🗃️ Created product {} ({} at {})", product.id, product.name, product.price);
        Ok(product)
    }

    pub async fn user(&self, user_id: &ObjectId) -> Result<User, MarketError> {
        self.db.fetch_user(user_id).await?.ok_or_else(|| MarketError::NotFound(format!("User {user_id}")))
    }

    pub async fn product(&self, product_id: &ObjectId) -> Result<Product, MarketError> {
        self.db.fetch_product(product_id).await?.ok_or_else(|| MarketError::NotFound(format!("Product {product_id}")))
    }
}
