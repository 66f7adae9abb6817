use cucumber::{then, when};
use market_engine::{
    db_types::{Chat, Message, ObjectId, Price},
    CatalogManagement,
    ChatManagement,
    MarketError,
};

use crate::cucumber::MarketWorld;

fn error_kind(e: &MarketError) -> &'static str {
    match e {
        MarketError::NotFound(_) => "NotFound",
        MarketError::InvalidReference(_) => "InvalidReference",
        MarketError::Unauthorized(_) => "Unauthorized",
        MarketError::ValidationFailed(_) => "ValidationFailed",
        MarketError::StoreUnavailable(_) => "StoreUnavailable",
    }
}

async fn chat_between(world: &MarketWorld, a: &str, b: &str) -> Chat {
    let (a, b) = (world.user(a), world.user(b));
    let (chat, _) = world.system().chats.create_or_get_chat(&a, &b).await.expect("Error fetching chat");
    chat
}

/// The chat's messages, oldest first.
async fn chat_history(world: &MarketWorld, chat: &Chat) -> Vec<Message> {
    let mut messages = world.system().db.fetch_messages(&chat.id, 200).await.expect("Error fetching messages");
    messages.reverse();
    messages
}

// ----------------------------------------------   Cart   ----------------------------------------------------------

#[when(expr = "{word} adds {string} to the cart")]
async fn add_to_cart(world: &mut MarketWorld, user: String, product: String) {
    let (user, product) = (world.user(&user), world.product(&product));
    let res = world.system().cart.add(&user, &product).await;
    world.record(res);
}

#[when(expr = "{word} adds an unknown product to the cart")]
async fn add_unknown_to_cart(world: &mut MarketWorld, user: String) {
    let user = world.user(&user);
    let res = world.system().cart.add(&user, &ObjectId::new()).await;
    world.record(res);
}

#[when(expr = "{word} removes {string} from the cart")]
async fn remove_from_cart(world: &mut MarketWorld, user: String, product: String) {
    let (user, product) = (world.user(&user), world.product(&product));
    let res = world.system().cart.remove(&user, &product).await;
    world.record(res);
}

#[then(expr = "the cart of {word} has {int} item(s) totalling {int}")]
async fn cart_contents(world: &mut MarketWorld, user: String, count: usize, total: i64) {
    let user = world.user(&user);
    let view = world.system().cart.view(&user).await.expect("Error fetching cart");
    assert_eq!(view.cart.len(), count, "Cart has the wrong number of items");
    assert_eq!(view.total, Price::from(total), "Cart total is incorrect");
}

#[then(expr = "the cart of {word} holds {string}")]
async fn cart_order(world: &mut MarketWorld, user: String, names: String) {
    let user = world.user(&user);
    let view = world.system().cart.view(&user).await.expect("Error fetching cart");
    let expected = names.split(',').map(|s| s.trim().to_string()).collect::<Vec<_>>();
    let actual = view.cart.iter().map(|p| p.name.clone()).collect::<Vec<_>>();
    assert_eq!(actual, expected);
}

#[then(expr = "the cart of {word} is empty")]
async fn cart_is_empty(world: &mut MarketWorld, user: String) {
    cart_contents(world, user, 0, 0).await;
}

// ----------------------------------------------   Orders   --------------------------------------------------------

#[when(expr = "{word} checks out")]
async fn checkout(world: &mut MarketWorld, user: String) {
    let user = world.user(&user);
    let res = world.system().orders.checkout(&user, None).await;
    world.record(res);
}

#[when(expr = "{word} checks out with key {string}")]
async fn checkout_with_key(world: &mut MarketWorld, user: String, key: String) {
    let user = world.user(&user);
    let res = world.system().orders.checkout(&user, Some(key)).await;
    world.record(res);
}

#[when(expr = "{word} buys {string}")]
async fn buy(world: &mut MarketWorld, user: String, product: String) {
    let (user, product) = (world.user(&user), world.product(&product));
    let res = world.system().orders.buy(&user, &product, None).await;
    world.record(res);
}

#[when(expr = "{word} buys an unknown product")]
async fn buy_unknown(world: &mut MarketWorld, user: String) {
    let user = world.user(&user);
    let res = world.system().orders.buy(&user, &ObjectId::new(), None).await;
    world.record(res);
}

#[then(expr = "{word} has {int} order(s)")]
async fn order_count(world: &mut MarketWorld, user: String, count: usize) {
    let user = world.user(&user);
    let orders = world.system().orders.orders_for_user(&user).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count, "Wrong number of orders");
}

#[then(expr = "order {int} of {word} costs {int} and has {int} item(s)")]
async fn order_details(world: &mut MarketWorld, index: usize, user: String, price: i64, items: usize) {
    let user = world.user(&user);
    let orders = world.system().orders.orders_for_user(&user).await.expect("Error fetching orders");
    let order = orders.get(index - 1).unwrap_or_else(|| panic!("There is no order {index}"));
    assert_eq!(order.price, Price::from(price), "Order price is incorrect");
    assert_eq!(order.items.len(), items, "Order has the wrong number of items");
    assert!(order.payment.cash);
    assert!(!order.payment.online);
}

// ----------------------------------------------   Reviews   -------------------------------------------------------

#[when(expr = "{word} rates {string} {float} with {string}")]
async fn rate_product(world: &mut MarketWorld, user: String, product: String, rating: f64, text: String) {
    let (user, product) = (world.user(&user), world.product(&product));
    let res = world.system().reviews.submit_review(&user, &product, rating, text).await;
    world.record(res);
}

#[when(expr = "{word} reviews an unknown product")]
async fn review_unknown(world: &mut MarketWorld, user: String) {
    let user = world.user(&user);
    let res = world.system().reviews.submit_review(&user, &ObjectId::new(), 4.0, "Great".into()).await;
    world.record(res);
}

#[then(expr = "{string} is rated {float} from {int} review(s) with a sum of {float}")]
async fn product_rating(world: &mut MarketWorld, product: String, avg: f64, count: i64, sum: f64) {
    let product = world.product(&product);
    let product = world.system().db.fetch_product(&product).await.expect("Error fetching product").expect("No product");
    assert_eq!(product.rating_cnt, count, "Rating count is incorrect");
    assert!((product.rating_sum - sum).abs() < 1e-9, "Rating sum is {}, not {sum}", product.rating_sum);
    assert!((product.rating_avg - avg).abs() < 1e-9, "Rating average is {}, not {avg}", product.rating_avg);
}

#[then(expr = "{string} has {int} listed review(s)")]
async fn listed_reviews(world: &mut MarketWorld, product: String, count: usize) {
    let product = world.product(&product);
    let reviews = world.system().reviews.reviews_for_product(&product, 50).await.expect("Error fetching reviews");
    assert_eq!(reviews.len(), count);
}

// ----------------------------------------------   Chats   ---------------------------------------------------------

#[when(expr = "{word} opens a chat with {word}")]
async fn open_chat(world: &mut MarketWorld, user: String, peer: String) {
    let (user, peer) = (world.user(&user), world.user(&peer));
    let res = world.system().chats.create_or_get_chat(&user, &peer).await;
    world.record(res);
}

#[when(expr = "{word} sends {string} to {word}")]
async fn send_message(world: &mut MarketWorld, sender: String, text: String, peer: String) {
    let chat = chat_between(world, &sender, &peer).await;
    let sender = world.user(&sender);
    let res = world.system().chats.send_message(&chat.id, &sender, text).await;
    world.record(res);
}

#[when(expr = "{word} sends {string} in the chat between {word} and {word}")]
async fn send_as_outsider(world: &mut MarketWorld, sender: String, text: String, a: String, b: String) {
    let chat = chat_between(world, &a, &b).await;
    let sender = world.user(&sender);
    let res = world.system().chats.send_message(&chat.id, &sender, text).await;
    world.record(res);
}

#[when(expr = "{word} reads the chat with {word}")]
async fn read_chat(world: &mut MarketWorld, reader: String, peer: String) {
    let chat = chat_between(world, &reader, &peer).await;
    let reader = world.user(&reader);
    let res = world.system().chats.mark_read(&chat.id, &reader, None).await;
    world.record(res);
}

#[when(expr = "{word} reads the chat with {word} up to message {int}")]
async fn read_chat_upto(world: &mut MarketWorld, reader: String, peer: String, index: usize) {
    let chat = chat_between(world, &reader, &peer).await;
    let history = chat_history(world, &chat).await;
    let upto = history.get(index - 1).map(|m| m.id.clone()).expect("No such message");
    let reader = world.user(&reader);
    let res = world.system().chats.mark_read(&chat.id, &reader, Some(upto)).await;
    world.record(res);
}

#[then(expr = "{word} and {word} share one chat")]
async fn share_one_chat(world: &mut MarketWorld, a: String, b: String) {
    let first = chat_between(world, &a, &b).await;
    let second = chat_between(world, &b, &a).await;
    assert_eq!(first.id, second.id);
    let a = world.user(&a);
    let chats = world.system().chats.chats_for_user(&a).await.expect("Error fetching chats");
    assert_eq!(chats.len(), 1);
}

#[then(expr = "{word} has {int} unread message(s) from {word}")]
async fn unread_count(world: &mut MarketWorld, reader: String, count: i64, peer: String) {
    let chat = chat_between(world, &reader, &peer).await;
    let reader = world.user(&reader);
    assert_eq!(chat.unread_for(&reader), count);
}

#[then(expr = "message {int} from {word} to {word} has been read by {word}")]
async fn message_read(world: &mut MarketWorld, index: usize, sender: String, peer: String, reader: String) {
    let chat = chat_between(world, &sender, &peer).await;
    let history = chat_history(world, &chat).await;
    let reader = world.user(&reader);
    assert!(history[index - 1].read_by.contains(&reader), "Message {index} has not been read by {reader}");
}

#[then(expr = "message {int} from {word} to {word} has not been read by {word}")]
async fn message_not_read(world: &mut MarketWorld, index: usize, sender: String, peer: String, reader: String) {
    let chat = chat_between(world, &sender, &peer).await;
    let history = chat_history(world, &chat).await;
    let reader = world.user(&reader);
    assert!(!history[index - 1].read_by.contains(&reader), "Message {index} has been read by {reader}");
}

#[then(expr = "the last message from {word} to {word} is {string}")]
async fn last_message(world: &mut MarketWorld, sender: String, peer: String, text: String) {
    let chat = chat_between(world, &sender, &peer).await;
    let last = chat.last_message.expect("Chat has no last message");
    assert_eq!(last.text, text);
    assert_eq!(last.sender_id, world.user(&sender));
}

// ----------------------------------------------   Outcomes   ------------------------------------------------------

#[then("the request succeeds")]
async fn request_succeeds(world: &mut MarketWorld) {
    if let Some(e) = &world.system().last_error {
        panic!("Expected the last request to succeed, but it failed with {e}");
    }
}

#[then(expr = "the request fails with {word}")]
async fn request_fails(world: &mut MarketWorld, kind: String) {
    let err = world.system().last_error.as_ref().expect("Expected the last request to fail, but it succeeded");
    assert_eq!(error_kind(err), kind, "Unexpected error: {err}");
}
