use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
    str::FromStr,
    sync::atomic::{AtomicU32, Ordering},
};

use chrono::{DateTime, Utc};
use log::error;
pub use mkt_common::Price;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------       ObjectId        ---------------------------------------------------------
static OBJECT_ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A 12-byte identifier, rendered as 24 lowercase hex characters.
///
/// The first four bytes are the big-endian creation time in unix seconds, followed by five random bytes and a
/// three-byte counter. Because the hex form is always lowercase and fixed-width, ordering by the string is the same as
/// ordering by the underlying bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{0}' is not a valid object id. Expected 24 hex characters")]
pub struct ObjectIdError(pub String);

impl ObjectId {
    pub fn new() -> Self {
        let mut bytes = [0u8; 12];
        let secs = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::thread_rng().fill(&mut bytes[4..9]);
        let count = OBJECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The creation time embedded in the first four bytes.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let mut secs = [0u8; 4];
        hex::decode_to_slice(&self.0[..8], &mut secs).ok()?;
        DateTime::from_timestamp(i64::from(u32::from_be_bytes(secs)), 0)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 24 {
            return Err(ObjectIdError(s.to_string()));
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ObjectIdError(s.to_string()))?;
        Ok(Self(hex::encode(bytes)))
    }
}

impl TryFrom<String> for ObjectId {
    type Error = ObjectIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------         User          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl NewUser {
    pub fn new<S: Into<String>>(name: S, email: S) -> Self {
        Self { name: name.into(), email: email.into() }
    }
}

//--------------------------------------        Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ObjectId,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub description: String,
    pub rating_sum: f64,
    pub rating_cnt: i64,
    pub rating_avg: f64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Copies the fields a cart line or order line keeps about this product.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            product_id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            rating: self.rating_avg,
            image: self.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub image: String,
    pub description: String,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, price: Price) -> Self {
        Self { name: name.into(), price, image: String::default(), description: String::default() }
    }

    pub fn with_image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }
}

//--------------------------------------    ProductSnapshot    ---------------------------------------------------------
/// The copy of a product that is kept in a cart or an order. Later changes to the product do not touch it.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub product_id: ObjectId,
    pub name: String,
    pub price: Price,
    pub rating: f64,
    pub image: String,
}

//--------------------------------------     RatingAggregate   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub sum: f64,
    pub count: i64,
    pub avg: f64,
}

impl RatingAggregate {
    /// Builds an aggregate whose average agrees with its sum and count.
    pub fn from_parts(sum: f64, count: i64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let avg = if count > 0 { sum / count as f64 } else { 0.0 };
        Self { sum, count, avg }
    }
}

//--------------------------------------        Payment        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payment {
    pub online: bool,
    pub cash: bool,
}

impl Payment {
    pub fn cash() -> Self {
        Self { online: false, cash: true }
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub items: Vec<ProductSnapshot>,
    pub price: Price,
    pub payment: Payment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An order as it is about to be recorded. The id and timestamp are assigned up front so that every stage of a
/// purchase refers to the same order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub price: Price,
    pub payment: Payment,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(user_id: ObjectId, price: Price) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            price,
            payment: Payment::cash(),
            idempotency_key: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_idempotency_key(mut self, key: Option<String>) -> Self {
        self.idempotency_key = key;
        self
    }
}

//--------------------------------------    CheckoutStage      ---------------------------------------------------------
/// The steps a purchase moves through, in order.
///
/// Every stage of a purchase runs inside one storage transaction, so a failure at any stage leaves no trace. The stage
/// is still reported in errors and logs because the outcome of an interrupted *legacy* (non-transactional) run differs
/// by stage:
///
/// | Interrupted after | Legacy outcome                                                        |
/// |-------------------|-----------------------------------------------------------------------|
/// | `TotalComputed`   | Nothing written.                                                      |
/// | `OrderCreated`    | Nothing written. The order exists only in memory and is lost.         |
/// | `OrderAppended`   | An order with a price but no items; the cart is intact.               |
/// | `ItemsAttached`   | A complete order while the cart still holds the same items.           |
/// | `CartCleared`     | Complete.                                                             |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckoutStage {
    TotalComputed,
    OrderCreated,
    OrderAppended,
    ItemsAttached,
    CartCleared,
}

impl Display for CheckoutStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutStage::TotalComputed => write!(f, "TotalComputed"),
            CheckoutStage::OrderCreated => write!(f, "OrderCreated"),
            CheckoutStage::OrderAppended => write!(f, "OrderAppended"),
            CheckoutStage::ItemsAttached => write!(f, "ItemsAttached"),
            CheckoutStage::CartCleared => write!(f, "CartCleared"),
        }
    }
}

//--------------------------------------   OrderHistoryScope   ---------------------------------------------------------
/// Which orders receive the purchased items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderHistoryScope {
    /// Only the order being created.
    #[default]
    NewOrderOnly,
    /// Every order the user has, including the new one. This reproduces the legacy behaviour where a purchase also
    /// appeared inside all earlier orders.
    AllOrders,
}

//--------------------------------------  MissingProductPolicy ---------------------------------------------------------
/// What a direct purchase does when the product cannot be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingProductPolicy {
    /// Fail with `NotFound`.
    #[default]
    Reject,
    /// Record an order with a zero price and no items.
    ZeroPrice,
}

#[derive(Debug, Clone, Error)]
#[error("Invalid missing product policy: {0}")]
pub struct ConversionError(String);

impl FromStr for MissingProductPolicy {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "zero_price" | "zero" => Ok(Self::ZeroPrice),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for MissingProductPolicy {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid missing product policy: {value}. Defaulting to Reject");
            MissingProductPolicy::Reject
        })
    }
}

//--------------------------------------        Review         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ObjectId,
    pub product_id: ObjectId,
    pub user_id: ObjectId,
    pub rating: f64,
    #[serde(rename = "review")]
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub product_id: ObjectId,
    pub user_id: ObjectId,
    pub rating: f64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertStatus {
    Created,
    Updated,
}

impl Display for UpsertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpsertStatus::Created => write!(f, "created"),
            UpsertStatus::Updated => write!(f, "updated"),
        }
    }
}

//--------------------------------------         Chat          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub text: String,
    pub sender_id: ObjectId,
    pub created_at: DateTime<Utc>,
}

/// A conversation between exactly two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: ObjectId,
    /// Always sorted, so the same pair of users maps to the same chat.
    pub members: [ObjectId; 2],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_message: Option<LastMessage>,
    pub unread_by: BTreeMap<ObjectId, i64>,
}

impl Chat {
    pub fn is_member(&self, user: &ObjectId) -> bool {
        self.members.contains(user)
    }

    /// The member who is not `user`, or `None` if `user` is not in this chat.
    pub fn other_member(&self, user: &ObjectId) -> Option<&ObjectId> {
        match &self.members {
            [a, b] if a == user => Some(b),
            [a, b] if b == user => Some(a),
            _ => None,
        }
    }

    pub fn unread_for(&self, user: &ObjectId) -> i64 {
        self.unread_by.get(user).copied().unwrap_or_default()
    }
}

/// An unordered pair of distinct users, held in canonical (sorted) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPair([ObjectId; 2]);

impl MemberPair {
    /// Returns `None` when both ids are the same user.
    pub fn new(a: ObjectId, b: ObjectId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self([a, b])),
            std::cmp::Ordering::Greater => Some(Self([b, a])),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn first(&self) -> &ObjectId {
        &self.0[0]
    }

    pub fn second(&self) -> &ObjectId {
        &self.0[1]
    }

    pub fn into_inner(self) -> [ObjectId; 2] {
        self.0
    }
}

//--------------------------------------        Message        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: ObjectId,
    pub chat_id: ObjectId,
    pub sender_id: ObjectId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub read_by: BTreeSet<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: ObjectId,
    pub sender_id: ObjectId,
    pub text: String,
}
