//! `SqliteDatabase` is a concrete implementation of a marketplace engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Every flow that writes more than one row runs in a single transaction which starts by locking the row that
//! owns the flow (the user for purchases and carts, the product for reviews, the chat for messages).
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{carts, chats, messages, new_pool, orders, products, reviews, users};
use crate::{
    db_types::{
        Chat,
        CheckoutStage,
        LastMessage,
        MemberPair,
        Message,
        MissingProductPolicy,
        NewMessage,
        NewOrder,
        NewProduct,
        NewReview,
        NewUser,
        ObjectId,
        Order,
        OrderHistoryScope,
        Price,
        Product,
        ProductSnapshot,
        Review,
        UpsertStatus,
        User,
    },
    traits::{
        cart_total,
        BuyRequest,
        CartManagement,
        CatalogManagement,
        ChatManagement,
        CheckoutRequest,
        MarketDatabase,
        MarketError,
        OrderManagement,
        OrderPlacement,
        ReviewManagement,
        ReviewOutcome,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl MarketDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), MarketError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_user(&self, user: NewUser) -> Result<User, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::insert_user(user, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_user(&self, user_id: &ObjectId) -> Result<Option<User>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_product(&self, product_id: &ObjectId) -> Result<Option<Product>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }
}

impl CartManagement for SqliteDatabase {
    async fn add_to_cart(&self, user_id: &ObjectId, product_id: &ObjectId) -> Result<ProductSnapshot, MarketError> {
        let mut tx = self.pool.begin().await?;
        if !users::lock_user(user_id, &mut tx).await? {
            return Err(MarketError::NotFound(format!("User {user_id} does not exist")));
        }
        let product = products::fetch_product(product_id, &mut tx)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Product {product_id} does not exist")))?;
        let snapshot = product.snapshot();
        carts::append_item(user_id, &snapshot, &mut tx).await?;
        tx.commit().await?;
        debug!("🛒️ {} ({}) added to the cart of {user_id}", snapshot.name, snapshot.product_id);
        Ok(snapshot)
    }

    async fn remove_from_cart(&self, user_id: &ObjectId, product_id: &ObjectId) -> Result<u64, MarketError> {
        let mut tx = self.pool.begin().await?;
        if !users::lock_user(user_id, &mut tx).await? {
            return Err(MarketError::NotFound(format!("User {user_id} does not exist")));
        }
        let removed = carts::remove_product(user_id, product_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🛒️ {removed} entries for {product_id} removed from the cart of {user_id}");
        Ok(removed)
    }

    async fn fetch_cart(&self, user_id: &ObjectId) -> Result<Vec<ProductSnapshot>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        if !users::user_exists(user_id, &mut conn).await? {
            return Err(MarketError::NotFound(format!("User {user_id} does not exist")));
        }
        let cart = carts::fetch_cart(user_id, &mut conn).await?;
        Ok(cart)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn checkout(&self, request: CheckoutRequest) -> Result<OrderPlacement, MarketError> {
        let CheckoutRequest { user_id, idempotency_key, scope } = request;
        let mut tx = self.pool.begin().await?;
        if !users::lock_user(&user_id, &mut tx).await? {
            return Err(MarketError::NotFound(format!("User {user_id} does not exist")));
        }
        if let Some(key) = idempotency_key.as_deref() {
            if let Some(order) = orders::fetch_order_by_key(&user_id, key, &mut tx).await? {
                debug!("📦️ Checkout for {user_id} with key '{key}' already recorded as order {}", order.id);
                return Ok(OrderPlacement { order, created: false });
            }
        }
        use CheckoutStage::*;
        let cart =
            carts::fetch_cart(&user_id, &mut tx).await.map_err(|e| MarketError::at_stage(TotalComputed, e))?;
        let total = cart_total(&cart)?;
        trace!("📦️ Checkout for {user_id}: {TotalComputed}. {} items, total {total}", cart.len());
        let new_order = NewOrder::new(user_id.clone(), total).with_idempotency_key(idempotency_key);
        trace!("📦️ Checkout for {user_id}: {OrderCreated}. Order {}", new_order.id);
        let mut order =
            orders::insert_order(new_order, &mut tx).await.map_err(|e| MarketError::at_stage(OrderAppended, e))?;
        trace!("📦️ Checkout for {user_id}: {OrderAppended}. Order {}", order.id);
        let lines = match scope {
            OrderHistoryScope::NewOrderOnly => orders::attach_items(&order.id, &cart, &mut tx).await,
            OrderHistoryScope::AllOrders => orders::attach_items_to_all_orders(&user_id, &cart, &mut tx).await,
        }
        .map_err(|e| MarketError::at_stage(ItemsAttached, e))?;
        trace!("📦️ Checkout for {user_id}: {ItemsAttached}. {lines} order lines written");
        carts::clear_cart(&user_id, &mut tx).await.map_err(|e| MarketError::at_stage(CartCleared, e))?;
        trace!("📦️ Checkout for {user_id}: {CartCleared}");
        tx.commit().await.map_err(|e| MarketError::at_stage(CartCleared, e))?;
        order.items = cart;
        debug!("📦️ Order {} placed by {user_id} for {}", order.id, order.price);
        Ok(OrderPlacement { order, created: true })
    }

    async fn buy(&self, request: BuyRequest) -> Result<OrderPlacement, MarketError> {
        let BuyRequest { user_id, product_id, idempotency_key, scope, missing_product } = request;
        let mut tx = self.pool.begin().await?;
        if !users::lock_user(&user_id, &mut tx).await? {
            return Err(MarketError::NotFound(format!("User {user_id} does not exist")));
        }
        if let Some(key) = idempotency_key.as_deref() {
            if let Some(order) = orders::fetch_order_by_key(&user_id, key, &mut tx).await? {
                debug!("📦️ Purchase by {user_id} with key '{key}' already recorded as order {}", order.id);
                return Ok(OrderPlacement { order, created: false });
            }
        }
        use CheckoutStage::*;
        let product =
            products::fetch_product(&product_id, &mut tx).await.map_err(|e| MarketError::at_stage(TotalComputed, e))?;
        let (price, items) = match (product, missing_product) {
            (Some(product), _) => (product.price, vec![product.snapshot()]),
            (None, MissingProductPolicy::Reject) => {
                return Err(MarketError::NotFound(format!("Product {product_id} does not exist")));
            },
            (None, MissingProductPolicy::ZeroPrice) => {
                warn!("📦️ Product {product_id} bought by {user_id} does not exist. Recording a zero-priced order");
                (Price::default(), vec![])
            },
        };
        let new_order = NewOrder::new(user_id.clone(), price).with_idempotency_key(idempotency_key);
        trace!("📦️ Purchase by {user_id}: {OrderCreated}. Order {}", new_order.id);
        let mut order =
            orders::insert_order(new_order, &mut tx).await.map_err(|e| MarketError::at_stage(OrderAppended, e))?;
        match scope {
            OrderHistoryScope::NewOrderOnly => orders::attach_items(&order.id, &items, &mut tx).await,
            OrderHistoryScope::AllOrders => orders::attach_items_to_all_orders(&user_id, &items, &mut tx).await,
        }
        .map_err(|e| MarketError::at_stage(ItemsAttached, e))?;
        tx.commit().await.map_err(|e| MarketError::at_stage(ItemsAttached, e))?;
        order.items = items;
        debug!("📦️ Order {} placed by {user_id} for {product_id} at {}", order.id, order.price);
        Ok(OrderPlacement { order, created: true })
    }

    async fn fetch_orders_for_user(&self, user_id: &ObjectId) -> Result<Vec<Order>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        if !users::user_exists(user_id, &mut conn).await? {
            return Err(MarketError::NotFound(format!("User {user_id} does not exist")));
        }
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }
}

impl ReviewManagement for SqliteDatabase {
    async fn upsert_review(&self, review: NewReview) -> Result<ReviewOutcome, MarketError> {
        let mut tx = self.pool.begin().await?;
        let product_id = review.product_id.clone();
        let user_id = review.user_id.clone();
        if !products::lock_product(&product_id, &mut tx).await? {
            return Err(MarketError::NotFound(format!("Product {product_id} does not exist")));
        }
        if !orders::user_has_purchased(&user_id, &product_id, &mut tx).await? {
            return Err(MarketError::Unauthorized(format!("{user_id} has not purchased product {product_id}")));
        }
        let existing = reviews::fetch_review(&product_id, &user_id, &mut tx).await?;
        let (status, stored, sum_delta, count_delta) = match existing {
            Some(existing) => {
                let delta = review.rating - existing.rating;
                let updated = reviews::update_review(&existing.id, review.rating, &review.text, &mut tx).await?;
                (UpsertStatus::Updated, updated, delta, 0)
            },
            None => {
                let rating = review.rating;
                let inserted = reviews::insert_review(review, &mut tx).await?;
                (UpsertStatus::Created, inserted, rating, 1)
            },
        };
        let rating = products::apply_rating_delta(&product_id, sum_delta, count_delta, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "⭐️ Review by {user_id} for {product_id} {status}. Rating is now {:.2} from {} reviews",
            rating.avg, rating.count
        );
        Ok(ReviewOutcome { status, review: stored, rating })
    }

    async fn fetch_reviews(&self, product_id: &ObjectId, limit: i64) -> Result<Vec<Review>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let reviews = reviews::fetch_reviews(product_id, limit, &mut conn).await?;
        Ok(reviews)
    }

    async fn reconcile_ratings(&self) -> Result<u64, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let fixed = products::reconcile_rating_aggregates(&mut conn).await?;
        Ok(fixed)
    }
}

impl ChatManagement for SqliteDatabase {
    async fn create_or_get_chat(&self, members: MemberPair) -> Result<(Chat, bool), MarketError> {
        let mut tx = self.pool.begin().await?;
        for member in [members.first(), members.second()] {
            if !users::lock_user(member, &mut tx).await? {
                return Err(MarketError::NotFound(format!("User {member} does not exist")));
            }
        }
        let created = chats::insert_chat_if_absent(&members, &mut tx).await?;
        let chat = chats::fetch_chat_by_members(&members, &mut tx).await?.ok_or_else(|| {
            MarketError::StoreUnavailable(format!("Chat for {} and {} vanished", members.first(), members.second()))
        })?;
        tx.commit().await?;
        Ok((chat, created))
    }

    async fn fetch_chat(&self, chat_id: &ObjectId) -> Result<Option<Chat>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let chat = chats::fetch_chat(chat_id, &mut conn).await?;
        Ok(chat)
    }

    async fn fetch_chats_for_member(&self, member: &ObjectId) -> Result<Vec<Chat>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let chats = chats::fetch_chats_for_member(member, &mut conn).await?;
        Ok(chats)
    }

    async fn insert_message(&self, message: NewMessage) -> Result<(Message, Chat), MarketError> {
        let NewMessage { chat_id, sender_id, text } = message;
        let mut tx = self.pool.begin().await?;
        if !chats::lock_chat(&chat_id, &mut tx).await? {
            return Err(MarketError::NotFound(format!("Chat {chat_id} does not exist")));
        }
        let chat = chats::fetch_chat(&chat_id, &mut tx)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Chat {chat_id} does not exist")))?;
        let recipient = chat
            .other_member(&sender_id)
            .cloned()
            .ok_or_else(|| MarketError::Unauthorized(format!("{sender_id} is not a member of chat {chat_id}")))?;
        let message = Message {
            id: ObjectId::new(),
            chat_id: chat_id.clone(),
            sender_id: sender_id.clone(),
            text,
            created_at: Utc::now(),
            read_by: [sender_id.clone()].into(),
        };
        messages::insert_message(&message, &mut tx).await?;
        let last = LastMessage { text: message.text.clone(), sender_id, created_at: message.created_at };
        chats::set_last_message(&chat_id, &last, &mut tx).await?;
        chats::increment_unread(&chat_id, &recipient, &mut tx).await?;
        let chat = chats::fetch_chat(&chat_id, &mut tx)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Chat {chat_id} does not exist")))?;
        tx.commit().await?;
        debug!(
            "💬️ Message {} sent in chat {chat_id}. {recipient} has {} unread",
            message.id,
            chat.unread_for(&recipient)
        );
        Ok((message, chat))
    }

    async fn fetch_messages(&self, chat_id: &ObjectId, limit: i64) -> Result<Vec<Message>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let messages = messages::fetch_messages(chat_id, limit, &mut conn).await?;
        Ok(messages)
    }

    async fn mark_read(
        &self,
        chat_id: &ObjectId,
        reader: &ObjectId,
        upto: Option<ObjectId>,
    ) -> Result<u64, MarketError> {
        let mut tx = self.pool.begin().await?;
        if !chats::lock_chat(chat_id, &mut tx).await? {
            return Err(MarketError::NotFound(format!("Chat {chat_id} does not exist")));
        }
        let chat = chats::fetch_chat(chat_id, &mut tx)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Chat {chat_id} does not exist")))?;
        if !chat.is_member(reader) {
            return Err(MarketError::Unauthorized(format!("{reader} is not a member of chat {chat_id}")));
        }
        let cutoff = match upto {
            Some(message_id) => match messages::fetch_message_in_chat(chat_id, &message_id, &mut tx).await? {
                Some(row) => Some(row.created_at),
                None => {
                    trace!("💬️ Message {message_id} is not in chat {chat_id}. Marking everything as read.");
                    None
                },
            },
            None => None,
        };
        let marked = messages::mark_read_upto(chat_id, reader, cutoff, &mut tx).await?;
        chats::reset_unread(chat_id, reader, &mut tx).await?;
        tx.commit().await?;
        debug!("💬️ {reader} read {marked} new messages in chat {chat_id}");
        Ok(marked)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object backed by a connection pool to `url`.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
