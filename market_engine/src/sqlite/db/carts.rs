use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{ObjectId, ProductSnapshot};

/// Appends the snapshot to the end of the user's cart.
pub async fn append_item(
    user_id: &ObjectId,
    item: &ProductSnapshot,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO cart_items (user_id, product_id, name, price, rating, image, added_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7);
        "#,
    )
    .bind(user_id)
    .bind(&item.product_id)
    .bind(&item.name)
    .bind(item.price)
    .bind(item.rating)
    .bind(&item.image)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    trace!("🗃️ {} appended to cart of {user_id}", item.product_id);
    Ok(())
}

/// Removes every cart entry for the product. Returns the number of entries removed.
pub async fn remove_product(
    user_id: &ObjectId,
    product_id: &ObjectId,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_cart(user_id: &ObjectId, conn: &mut SqliteConnection) -> Result<Vec<ProductSnapshot>, sqlx::Error> {
    let items = sqlx::query_as(
        r#"
            SELECT product_id, name, price, rating, image FROM cart_items
            WHERE user_id = $1
            ORDER BY position ASC;
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Empties the cart. Returns the number of entries removed.
pub async fn clear_cart(user_id: &ObjectId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(conn).await?;
    Ok(result.rows_affected())
}
