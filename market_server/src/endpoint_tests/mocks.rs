use market_engine::{
    db_types::{Chat, MemberPair, Message, NewMessage, NewReview, ObjectId, Order, ProductSnapshot, Review},
    traits::{
        BuyRequest,
        CartManagement,
        ChatManagement,
        CheckoutRequest,
        MarketError,
        OrderManagement,
        OrderPlacement,
        ReviewManagement,
        ReviewOutcome,
    },
};
use mockall::mock;

mock! {
    pub CartManager {}
    impl CartManagement for CartManager {
        async fn add_to_cart(&self, user_id: &ObjectId, product_id: &ObjectId) -> Result<ProductSnapshot, MarketError>;
        async fn remove_from_cart(&self, user_id: &ObjectId, product_id: &ObjectId) -> Result<u64, MarketError>;
        async fn fetch_cart(&self, user_id: &ObjectId) -> Result<Vec<ProductSnapshot>, MarketError>;
    }
}

mock! {
    pub OrderManager {}
    impl OrderManagement for OrderManager {
        async fn checkout(&self, request: CheckoutRequest) -> Result<OrderPlacement, MarketError>;
        async fn buy(&self, request: BuyRequest) -> Result<OrderPlacement, MarketError>;
        async fn fetch_orders_for_user(&self, user_id: &ObjectId) -> Result<Vec<Order>, MarketError>;
    }
}

mock! {
    pub ReviewManager {}
    impl ReviewManagement for ReviewManager {
        async fn upsert_review(&self, review: NewReview) -> Result<ReviewOutcome, MarketError>;
        async fn fetch_reviews(&self, product_id: &ObjectId, limit: i64) -> Result<Vec<Review>, MarketError>;
        async fn reconcile_ratings(&self) -> Result<u64, MarketError>;
    }
}

mock! {
    pub ChatManager {}
    impl ChatManagement for ChatManager {
        async fn create_or_get_chat(&self, members: MemberPair) -> Result<(Chat, bool), MarketError>;
        async fn fetch_chat(&self, chat_id: &ObjectId) -> Result<Option<Chat>, MarketError>;
        async fn fetch_chats_for_member(&self, member: &ObjectId) -> Result<Vec<Chat>, MarketError>;
        async fn insert_message(&self, message: NewMessage) -> Result<(Message, Chat), MarketError>;
        async fn fetch_messages(&self, chat_id: &ObjectId, limit: i64) -> Result<Vec<Message>, MarketError>;
        async fn mark_read(&self, chat_id: &ObjectId, reader: &ObjectId, upto: Option<ObjectId>)
            -> Result<u64, MarketError>;
    }
}
