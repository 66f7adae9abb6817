use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewReview, ObjectId, Review};

pub async fn fetch_review(
    product_id: &ObjectId,
    user_id: &ObjectId,
    conn: &mut SqliteConnection,
) -> Result<Option<Review>, sqlx::Error> {
    let review = sqlx::query_as("SELECT * FROM reviews WHERE product_id = $1 AND user_id = $2")
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(review)
}

pub async fn insert_review(review: NewReview, conn: &mut SqliteConnection) -> Result<Review, sqlx::Error> {
    let review: Review = sqlx::query_as(
        r#"
            INSERT INTO reviews (id, product_id, user_id, rating, text, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *;
        "#,
    )
    .bind(ObjectId::new())
    .bind(review.product_id)
    .bind(review.user_id)
    .bind(review.rating)
    .bind(review.text)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("⭐️ Review {} by {} for {} created", review.id, review.user_id, review.product_id);
    Ok(review)
}

/// Replaces the rating and text of an existing review.
pub async fn update_review(
    review_id: &ObjectId,
    rating: f64,
    text: &str,
    conn: &mut SqliteConnection,
) -> Result<Review, sqlx::Error> {
    let review: Review = sqlx::query_as(
        r#"
            UPDATE reviews SET rating = $1, text = $2, updated_at = $3
            WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(rating)
    .bind(text)
    .bind(Utc::now())
    .bind(review_id)
    .fetch_one(conn)
    .await?;
    debug!("⭐️ Review {} by {} for {} updated", review.id, review.user_id, review.product_id);
    Ok(review)
}

/// The newest reviews for the product by update time.
pub async fn fetch_reviews(
    product_id: &ObjectId,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Review>, sqlx::Error> {
    let reviews = sqlx::query_as(
        r#"
            SELECT * FROM reviews
            WHERE product_id = $1
            ORDER BY updated_at DESC, id DESC
            LIMIT $2;
        "#,
    )
    .bind(product_id)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(reviews)
}
