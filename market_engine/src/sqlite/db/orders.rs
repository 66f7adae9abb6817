use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::db_types::{NewOrder, ObjectId, Order, Payment, Price, ProductSnapshot};

#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    id: ObjectId,
    user_id: ObjectId,
    price: Price,
    cash: bool,
    online: bool,
    idempotency_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<ProductSnapshot>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            items,
            price: self.price,
            payment: Payment { online: self.online, cash: self.cash },
            idempotency_key: self.idempotency_key,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct OrderItemRow {
    order_id: ObjectId,
    #[sqlx(flatten)]
    item: ProductSnapshot,
}

/// Appends a new order, with no items, to the user's order history.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let row: OrderRow = sqlx::query_as(
        r#"
            INSERT INTO orders (id, user_id, price, cash, online, idempotency_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, price, cash, online, idempotency_key, created_at;
        "#,
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.price)
    .bind(order.payment.cash)
    .bind(order.payment.online)
    .bind(order.idempotency_key)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order {} for {} inserted. Total {}", row.id, row.user_id, row.price);
    Ok(row.into_order(vec![]))
}

/// Returns the order the user previously placed with this idempotency key, if any.
pub async fn fetch_order_by_key(
    user_id: &ObjectId,
    key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let row: Option<OrderRow> = sqlx::query_as(
        r#"
            SELECT id, user_id, price, cash, online, idempotency_key, created_at FROM orders
            WHERE user_id = $1 AND idempotency_key = $2;
        "#,
    )
    .bind(user_id)
    .bind(key)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => {
            let items = fetch_items_for_order(&row.id, conn).await?;
            Ok(Some(row.into_order(items)))
        },
        None => Ok(None),
    }
}

async fn fetch_items_for_order(
    order_id: &ObjectId,
    conn: &mut SqliteConnection,
) -> Result<Vec<ProductSnapshot>, sqlx::Error> {
    let items = sqlx::query_as(
        "SELECT product_id, name, price, rating, image FROM order_items WHERE order_id = $1 ORDER BY position",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Attaches the items to a single order, keeping their order.
pub async fn attach_items(
    order_id: &ObjectId,
    items: &[ProductSnapshot],
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    if items.is_empty() {
        return Ok(0);
    }
    let mut builder =
        QueryBuilder::<Sqlite>::new("INSERT INTO order_items (order_id, product_id, name, price, rating, image) ");
    builder.push_values(items, |mut row, item| {
        row.push_bind(order_id)
            .push_bind(&item.product_id)
            .push_bind(&item.name)
            .push_bind(item.price)
            .push_bind(item.rating)
            .push_bind(&item.image);
    });
    let result = builder.build().execute(conn).await?;
    trace!("📝️ {} items attached to order {order_id}", result.rows_affected());
    Ok(result.rows_affected())
}

/// Attaches the items to **every** order the user has. Returns the number of order lines written.
pub async fn attach_items_to_all_orders(
    user_id: &ObjectId,
    items: &[ProductSnapshot],
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let mut total = 0;
    for item in items {
        let result = sqlx::query(
            r#"
                INSERT INTO order_items (order_id, product_id, name, price, rating, image)
                SELECT id, $2, $3, $4, $5, $6 FROM orders WHERE user_id = $1 ORDER BY seq;
            "#,
        )
        .bind(user_id)
        .bind(&item.product_id)
        .bind(&item.name)
        .bind(item.price)
        .bind(item.rating)
        .bind(&item.image)
        .execute(&mut *conn)
        .await?;
        total += result.rows_affected();
    }
    trace!("📝️ {total} order lines written across the order history of {user_id}");
    Ok(total)
}

/// All the user's orders with their items, oldest first.
pub async fn fetch_orders_for_user(user_id: &ObjectId, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let rows: Vec<OrderRow> = sqlx::query_as(
        r#"
            SELECT id, user_id, price, cash, online, idempotency_key, created_at FROM orders
            WHERE user_id = $1
            ORDER BY seq ASC;
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    let items: Vec<OrderItemRow> = sqlx::query_as(
        r#"
            SELECT i.order_id, i.product_id, i.name, i.price, i.rating, i.image
            FROM order_items i JOIN orders o ON o.id = i.order_id
            WHERE o.user_id = $1
            ORDER BY i.position ASC;
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    let mut items_by_order: HashMap<ObjectId, Vec<ProductSnapshot>> = HashMap::new();
    for row in items {
        items_by_order.entry(row.order_id).or_default().push(row.item);
    }
    let orders = rows
        .into_iter()
        .map(|row| {
            let items = items_by_order.remove(&row.id).unwrap_or_default();
            row.into_order(items)
        })
        .collect();
    Ok(orders)
}

/// True if any of the user's orders contains the product.
pub async fn user_has_purchased(
    user_id: &ObjectId,
    product_id: &ObjectId,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let purchased: bool = sqlx::query_scalar(
        r#"
            SELECT EXISTS(
                SELECT 1 FROM order_items i JOIN orders o ON o.id = i.order_id
                WHERE o.user_id = $1 AND i.product_id = $2
            );
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_one(conn)
    .await?;
    Ok(purchased)
}
