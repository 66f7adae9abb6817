use std::fmt::Debug;

use log::*;

use super::{page_limit, validate_text};
use crate::{
    db_types::{NewReview, ObjectId, Review},
    events::{EventProducers, ReviewSubmittedEvent},
    helpers::KeyLocks,
    traits::{MarketError, ReviewManagement, ReviewOutcome},
};

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

/// `ReviewApi` accepts reviews from users who have bought the product and keeps each product's rating aggregate
/// consistent with its reviews.
pub struct ReviewApi<B> {
    db: B,
    producers: EventProducers,
    locks: KeyLocks,
}

impl<B> Debug for ReviewApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReviewApi")
    }
}

impl<B> ReviewApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, locks: KeyLocks::default() }
    }

    pub fn with_locks(mut self, locks: KeyLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

/// Checks the rating range and text length. Nothing is written if this fails.
pub fn validate_review(rating: f64, text: &str) -> Result<(), MarketError> {
    if !rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(MarketError::ValidationFailed(format!(
            "Rating must be a number between {MIN_RATING} and {MAX_RATING}, but was {rating}"
        )));
    }
    validate_text("Review text", text)
}

impl<B> ReviewApi<B>
where B: ReviewManagement
{
    /// Creates the user's review of the product, or replaces it if they have already left one.
    pub async fn submit_review(
        &self,
        user_id: &ObjectId,
        product_id: &ObjectId,
        rating: f64,
        text: String,
    ) -> Result<ReviewOutcome, MarketError> {
        validate_review(rating, &text)?;
        let _guard = self.locks.lock(KeyLocks::review_key(product_id, user_id)).await;
        let review = NewReview { product_id: product_id.clone(), user_id: user_id.clone(), rating, text };
        let outcome = self.db.upsert_review(review).await?;
        info!(
            "⭐️ Review of {product_id} by {user_id} {}. Product rating is now {:.2} from {} reviews",
            outcome.status, outcome.rating.avg, outcome.rating.count
        );
        self.call_review_submitted_hook(&outcome).await;
        Ok(outcome)
    }

    /// The product's most recently updated reviews. `limit` is clamped to a sensible page size.
    pub async fn reviews_for_product(&self, product_id: &ObjectId, limit: i64) -> Result<Vec<Review>, MarketError> {
        self.db.fetch_reviews(product_id, page_limit(limit)).await
    }

    /// Recomputes every product's rating aggregate from its reviews. Returns the number of products that were
    /// corrected.
    pub async fn reconcile(&self) -> Result<u64, MarketError> {
        let fixed = self.db.reconcile_ratings().await?;
        if fixed > 0 {
            warn!("🔁 {fixed} product rating aggregates were out of step with their reviews and have been repaired");
        } else {
            debug!("🔁 All product rating aggregates match their reviews");
        }
        Ok(fixed)
    }

    async fn call_review_submitted_hook(&self, outcome: &ReviewOutcome) {
        for emitter in &self.producers.review_submitted_producer {
            debug!("⭐️ Notifying review submitted hook subscribers");
            let event = ReviewSubmittedEvent {
                status: outcome.status,
                review: outcome.review.clone(),
                rating: outcome.rating,
            };
            emitter.publish_event(event).await;
        }
    }
}
