//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution.
//!
//! Every engine call is wrapped in [`with_deadline`], so a request never waits on the store for longer than the
//! configured request timeout.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use market_engine::{
    db_types::ObjectId,
    traits::{CartManagement, ChatManagement, OrderManagement, ReviewManagement},
    CartApi,
    ChatApi,
    OrderFlowApi,
    ReviewApi,
};
use mkt_common::{clamp_limit, clamp_message_limit};

use crate::{
    config::ServerOptions,
    data_objects::{
        CallerParams,
        LimitParams,
        MarkReadRequest,
        NewChatRequest,
        ProductUserParams,
        ReviewRequest,
        ReviewResponse,
        SendMessageRequest,
        StatusResponse,
        UserParams,
    },
    errors::ServerError,
    helpers::{parse_id, with_deadline},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(add => Get "/add" impl CartManagement);
/// Route handler for adding a product to a user's cart.
///
/// `GET /add?id=<productID>&userID=<userID>`
///
/// A snapshot of the product (name, price, rating and image) is appended to the cart. Adding a product twice gives two
/// cart entries.
pub async fn add<B: CartManagement>(
    params: web::Query<ProductUserParams>,
    api: web::Data<CartApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received add to cart request for {params:?}");
    let product_id = parse_id("id", &params.id)?;
    let user_id = parse_id("userID", &params.user_id)?;
    with_deadline(options.request_timeout, api.add(&user_id, &product_id)).await?;
    Ok(HttpResponse::Ok().body("Item successfully added"))
}

route!(remove => Get "/remove" impl CartManagement);
/// Route handler for removing a product from a user's cart.
///
/// `GET /remove?id=<productID>&userID=<userID>`
///
/// Every entry for the product is removed. Removing a product that is not in the cart still succeeds.
pub async fn remove<B: CartManagement>(
    params: web::Query<ProductUserParams>,
    api: web::Data<CartApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received remove from cart request for {params:?}");
    let product_id = parse_id("id", &params.id)?;
    let user_id = parse_id("userID", &params.user_id)?;
    with_deadline(options.request_timeout, api.remove(&user_id, &product_id)).await?;
    Ok(HttpResponse::Ok().body("Item removed successfully"))
}

route!(list => Get "/list" impl CartManagement);
/// Route handler for viewing a user's cart.
///
/// `GET /list?id=<userID>` returns `{ "total": <sum of prices>, "cart": [<snapshots>] }`.
pub async fn list<B: CartManagement>(
    params: web::Query<UserParams>,
    api: web::Data<CartApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received cart request for {}", params.id);
    let user_id = parse_id("id", &params.id)?;
    let view = with_deadline(options.request_timeout, api.view(&user_id)).await?;
    Ok(HttpResponse::Ok().json(view))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(checkout => Get "/checkout" impl OrderManagement);
/// Route handler for checking out a user's cart.
///
/// `GET /checkout?id=<userID>[&key=<idempotency key>]`
///
/// The cart becomes a cash order and is emptied. When a `key` is given and the user has already checked out with it,
/// nothing changes and the response is the same as for the first call.
pub async fn checkout<B: OrderManagement>(
    params: web::Query<UserParams>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received checkout request for {params:?}");
    let params = params.into_inner();
    let user_id = parse_id("id", &params.id)?;
    let placement = with_deadline(options.request_timeout, api.checkout(&user_id, params.key)).await?;
    debug!("💻️ Checkout for {user_id} resulted in order {} (new: {})", placement.order.id, placement.created);
    Ok(HttpResponse::Ok().body("Order placed successfully"))
}

route!(buy => Get "/buy" impl OrderManagement);
/// Route handler for buying a single product without going through the cart.
///
/// `GET /buy?id=<productID>&userID=<userID>[&key=<idempotency key>]`
pub async fn buy<B: OrderManagement>(
    params: web::Query<ProductUserParams>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received buy request for {params:?}");
    let params = params.into_inner();
    let product_id = parse_id("id", &params.id)?;
    let user_id = parse_id("userID", &params.user_id)?;
    let placement = with_deadline(options.request_timeout, api.buy(&user_id, &product_id, params.key)).await?;
    debug!("💻️ Purchase by {user_id} resulted in order {} (new: {})", placement.order.id, placement.created);
    Ok(HttpResponse::Ok().body("Order placed successfully"))
}

route!(orders => Get "/orders" impl OrderManagement);
/// Route handler for a user's order history, oldest first.
///
/// `GET /orders?id=<userID>`
pub async fn orders<B: OrderManagement>(
    params: web::Query<UserParams>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received order history request for {}", params.id);
    let user_id = parse_id("id", &params.id)?;
    let orders = with_deadline(options.request_timeout, api.orders_for_user(&user_id)).await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Reviews  ----------------------------------------------------
route!(submit_review => Post "/products/{pid}/reviews" impl ReviewManagement);
/// Route handler for creating or replacing a review.
///
/// `POST /products/{pid}/reviews?userID=<userID>` with body `{ "rating": 0..=5, "review": "<text>" }`
///
/// Only users who have an order containing the product may review it. The response is `{ "status": "created" }` for
/// a first review and `{ "status": "updated" }` when an earlier review by the same user was replaced.
pub async fn submit_review<B: ReviewManagement>(
    path: web::Path<String>,
    params: web::Query<CallerParams>,
    body: web::Json<ReviewRequest>,
    api: web::Data<ReviewApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let product_id = parse_id("pid", &path)?;
    let user_id = parse_id("userID", &params.user_id)?;
    trace!("💻️ Received review of {product_id} from {user_id}");
    let ReviewRequest { rating, review } = body.into_inner();
    let submission = api.submit_review(&user_id, &product_id, rating, review);
    let outcome = with_deadline(options.request_timeout, submission).await?;
    Ok(HttpResponse::Ok().json(ReviewResponse { status: outcome.status }))
}

route!(list_reviews => Get "/products/{pid}/reviews" impl ReviewManagement);
/// Route handler for listing a product's reviews, most recently updated first.
///
/// `GET /products/{pid}/reviews?limit=<n>`. The limit defaults to 50 and is clamped to 1..=200.
pub async fn list_reviews<B: ReviewManagement>(
    path: web::Path<String>,
    params: web::Query<LimitParams>,
    api: web::Data<ReviewApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let product_id = parse_id("pid", &path)?;
    let limit = clamp_limit(params.limit.as_deref());
    trace!("💻️ Received request for {limit} reviews of {product_id}");
    let reviews = with_deadline(options.request_timeout, api.reviews_for_product(&product_id, limit)).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

//----------------------------------------------   Chats  ----------------------------------------------------
route!(create_chat => Post "/chats" impl ChatManagement);
/// Route handler for opening a chat with another user.
///
/// `POST /chats?userID=<userID>` with body `{ "peerId": "<userID>" }`
///
/// Responds with `201 Created` and the new chat, or `200 OK` and the existing chat if the two users already have one.
pub async fn create_chat<B: ChatManagement>(
    params: web::Query<CallerParams>,
    body: web::Json<NewChatRequest>,
    api: web::Data<ChatApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let user_id = parse_id("userID", &params.user_id)?;
    let peer_id = parse_id("peerId", &body.peer_id)?;
    trace!("💻️ Received chat request from {user_id} to {peer_id}");
    let (chat, created) = with_deadline(options.request_timeout, api.create_or_get_chat(&user_id, &peer_id)).await?;
    let response = if created { HttpResponse::Created().json(chat) } else { HttpResponse::Ok().json(chat) };
    Ok(response)
}

route!(list_chats => Get "/chats" impl ChatManagement);
/// Route handler for the chats a user is a member of, most recently active first.
///
/// `GET /chats?userID=<userID>`
pub async fn list_chats<B: ChatManagement>(
    params: web::Query<CallerParams>,
    api: web::Data<ChatApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let user_id = parse_id("userID", &params.user_id)?;
    trace!("💻️ Received chat list request for {user_id}");
    let chats = with_deadline(options.request_timeout, api.chats_for_user(&user_id)).await?;
    Ok(HttpResponse::Ok().json(chats))
}

route!(send_message => Post "/chats/{chat_id}/messages" impl ChatManagement);
/// Route handler for posting a message in a chat.
///
/// `POST /chats/{chat_id}/messages?userID=<userID>` with body `{ "text": "<1 to 4000 characters>" }`
///
/// Responds with `201 Created` and the stored message. The other member's unread count goes up by one.
pub async fn send_message<B: ChatManagement>(
    path: web::Path<String>,
    params: web::Query<CallerParams>,
    body: web::Json<SendMessageRequest>,
    api: web::Data<ChatApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let chat_id = parse_id("chatId", &path)?;
    let sender_id = parse_id("userID", &params.user_id)?;
    trace!("💻️ Received message from {sender_id} in chat {chat_id}");
    let text = body.into_inner().text;
    let message = with_deadline(options.request_timeout, api.send_message(&chat_id, &sender_id, text)).await?;
    Ok(HttpResponse::Created().json(message))
}

route!(list_messages => Get "/chats/{chat_id}/messages" impl ChatManagement);
/// Route handler for reading a chat's messages, newest first.
///
/// `GET /chats/{chat_id}/messages?userID=<userID>&limit=<n>`. Only members of the chat may read it.
/// A missing limit gives 50. A limit that is not a positive number gives 1, and the largest page is 200.
pub async fn list_messages<B: ChatManagement>(
    path: web::Path<String>,
    params: web::Query<CallerParams>,
    api: web::Data<ChatApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let chat_id = parse_id("chatId", &path)?;
    let user_id = parse_id("userID", &params.user_id)?;
    let limit = clamp_message_limit(params.limit.as_deref());
    trace!("💻️ Received request from {user_id} for {limit} messages in chat {chat_id}");
    let messages = with_deadline(options.request_timeout, api.messages(&chat_id, &user_id, limit)).await?;
    Ok(HttpResponse::Ok().json(messages))
}

route!(mark_read => Post "/chats/{chat_id}/read" impl ChatManagement);
/// Route handler for marking a chat as read.
///
/// `POST /chats/{chat_id}/read?userID=<userID>` with an optional body `{ "upto": "<messageID>" }`
///
/// The caller is added to the read receipts of every message in the chat (or, if `upto` names a message in the
/// chat, every message up to and including it), and their unread count is reset to zero. An `upto` that is not a
/// message id is ignored. Marking a chat as read more than once has no further effect.
pub async fn mark_read<B: ChatManagement>(
    path: web::Path<String>,
    params: web::Query<CallerParams>,
    body: web::Bytes,
    api: web::Data<ChatApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let chat_id = parse_id("chatId", &path)?;
    let reader_id = parse_id("userID", &params.user_id)?;
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        MarkReadRequest::default()
    } else {
        serde_json::from_slice::<MarkReadRequest>(&body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?
    };
    let upto = request.upto.and_then(|s| s.parse::<ObjectId>().ok());
    trace!("💻️ Received read receipt from {reader_id} in chat {chat_id} (up to {upto:?})");
    with_deadline(options.request_timeout, api.mark_read(&chat_id, &reader_id, upto)).await?;
    Ok(HttpResponse::Ok().json(StatusResponse::ok()))
}
