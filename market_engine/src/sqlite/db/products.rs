use chrono::Utc;
use log::{debug, trace};
use sqlx::{FromRow, SqliteConnection};

use crate::db_types::{NewProduct, ObjectId, Product, RatingAggregate};

/// Aggregates whose stored sum or average differ from the reviews by less than this are considered consistent.
const RATING_TOLERANCE: f64 = 1e-6;

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let product: Product = sqlx::query_as(
        r#"
            INSERT INTO products (id, name, price, image, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(ObjectId::new())
    .bind(product.name)
    .bind(product.price)
    .bind(product.image)
    .bind(product.description)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Product {} ({}) created at {}", product.id, product.name, product.price);
    Ok(product)
}

pub async fn fetch_product(product_id: &ObjectId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

/// Takes the write lock for the current transaction with a no-op write to the product row. Returns `false` if the
/// product does not exist.
pub async fn lock_product(product_id: &ObjectId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE products SET rating_cnt = rating_cnt WHERE id = $1")
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(FromRow)]
struct AggregateRow {
    rating_sum: f64,
    rating_cnt: i64,
    rating_avg: f64,
}

/// Adds `sum_delta` to the rating sum and `count_delta` to the rating count, then recomputes the average from the
/// new values. Returns the updated aggregate.
pub async fn apply_rating_delta(
    product_id: &ObjectId,
    sum_delta: f64,
    count_delta: i64,
    conn: &mut SqliteConnection,
) -> Result<RatingAggregate, sqlx::Error> {
    sqlx::query("UPDATE products SET rating_sum = rating_sum + $1, rating_cnt = rating_cnt + $2 WHERE id = $3")
        .bind(sum_delta)
        .bind(count_delta)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    let row: AggregateRow = sqlx::query_as(
        r#"
            UPDATE products
            SET rating_avg = CASE WHEN rating_cnt > 0 THEN rating_sum / rating_cnt ELSE 0 END
            WHERE id = $1
            RETURNING rating_sum, rating_cnt, rating_avg;
        "#,
    )
    .bind(product_id)
    .fetch_one(conn)
    .await?;
    trace!(
        "🗃️ Rating for {product_id} is now {:.3} ({} / {})",
        row.rating_avg,
        row.rating_sum,
        row.rating_cnt
    );
    Ok(RatingAggregate { sum: row.rating_sum, count: row.rating_cnt, avg: row.rating_avg })
}

/// Recomputes the rating aggregate of every product whose stored values disagree with its reviews. Returns the number
/// of products that were corrected.
pub async fn reconcile_rating_aggregates(conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            WITH actual AS (
                SELECT p.id AS product_id,
                       COALESCE(SUM(r.rating), 0.0) AS rating_sum,
                       COUNT(r.id) AS rating_cnt,
                       COALESCE(AVG(r.rating), 0.0) AS rating_avg
                FROM products p LEFT JOIN reviews r ON r.product_id = p.id
                GROUP BY p.id
            )
            UPDATE products
            SET rating_sum = actual.rating_sum,
                rating_cnt = actual.rating_cnt,
                rating_avg = actual.rating_avg
            FROM actual
            WHERE products.id = actual.product_id
              AND (products.rating_cnt != actual.rating_cnt
                OR ABS(products.rating_sum - actual.rating_sum) > $1
                OR ABS(products.rating_avg - actual.rating_avg) > $1);
        "#,
    )
    .bind(RATING_TOLERANCE)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
