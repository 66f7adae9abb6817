use crate::{
    db_types::{NewReview, ObjectId, Review},
    traits::{MarketError, ReviewOutcome},
};

#[allow(async_fn_in_trait)]
pub trait ReviewManagement {
    /// Creates or replaces the user's review of a product, and updates the product's rating aggregate, in one atomic
    /// transaction:
    ///
    /// * If the user has already reviewed the product, the rating and text are replaced and the difference between the
    ///   new and old rating is added to the product's rating sum. The count is unchanged.
    /// * Otherwise the review is inserted, the count goes up by one and the rating is added to the sum.
    /// * Finally the average is recomputed as `sum / count`.
    ///
    /// The review is assumed to be valid. Range checks happen in [`crate::ReviewApi`].
    ///
    /// ## Failure modes:
    /// - `NotFound` if the product does not exist.
    /// - `Unauthorized` if none of the user's orders contain the product.
    async fn upsert_review(&self, review: NewReview) -> Result<ReviewOutcome, MarketError>;

    /// The most recently updated reviews for the product, newest first, at most `limit` of them.
    async fn fetch_reviews(&self, product_id: &ObjectId, limit: i64) -> Result<Vec<Review>, MarketError>;

    /// Rebuilds every product's rating aggregate from the stored reviews. Returns the number of products whose
    /// aggregate was out of step and has been corrected.
    async fn reconcile_ratings(&self) -> Result<u64, MarketError>;
}
