use std::collections::{BTreeMap, BTreeSet};

use actix_web::{
    http::{header::ContentType, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use market_engine::db_types::{
    Chat,
    Message,
    ObjectId,
    Order,
    Payment,
    Price,
    ProductSnapshot,
    RatingAggregate,
    Review,
};

use crate::{config::ServerOptions, server::configure_extractors};

pub const ALICE: &str = "65f1c0de0000000000000001";
pub const BOB: &str = "65f1c0de0000000000000002";
pub const CAROL: &str = "65f1c0de0000000000000003";
pub const MUG: &str = "65f1c0de00000000000000a1";
pub const LAMP: &str = "65f1c0de00000000000000a2";
pub const CHAT: &str = "65f1c0de00000000000000c1";
pub const MSG1: &str = "65f1c0de00000000000000d1";
pub const ORDER1: &str = "65f1c0de00000000000000e1";

pub fn oid(s: &str) -> ObjectId {
    s.parse().expect("Test ids are valid")
}

pub fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap()
}

pub async fn get_request<F>(path: &str, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    send(TestRequest::get().uri(path), configure).await
}

pub async fn post_request<F>(path: &str, body: &str, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    let req = TestRequest::post().uri(path).insert_header(ContentType::json()).set_payload(body.to_string());
    send(req, configure).await
}

async fn send<F>(req: TestRequest, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new()
        .configure(configure_extractors)
        .app_data(web::Data::new(ServerOptions::default()))
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?;
    let status = res.status();
    let body = test::read_body(res).await;
    Ok((status, String::from_utf8_lossy(&body).into_owned()))
}

pub fn snapshot(id: &str, name: &str, price: i64) -> ProductSnapshot {
    let price = Price::from(price);
    ProductSnapshot { product_id: oid(id), name: name.into(), price, rating: 4.5, image: String::new() }
}

pub fn order(items: Vec<ProductSnapshot>) -> Order {
    let price = Price::checked_sum(items.iter().map(|i| i.price)).unwrap_or_default();
    Order {
        id: oid(ORDER1),
        user_id: oid(ALICE),
        items,
        price,
        payment: Payment::cash(),
        idempotency_key: None,
        created_at: timestamp(),
    }
}

pub fn review(rating: f64, text: &str) -> Review {
    Review {
        id: ObjectId::new(),
        product_id: oid(MUG),
        user_id: oid(ALICE),
        rating,
        text: text.into(),
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub fn aggregate(sum: f64, count: i64) -> RatingAggregate {
    RatingAggregate::from_parts(sum, count)
}

pub fn chat(a: &str, b: &str) -> Chat {
    let mut members = [oid(a), oid(b)];
    members.sort();
    let unread_by = members.iter().map(|m| (m.clone(), 0)).collect::<BTreeMap<_, _>>();
    Chat { id: oid(CHAT), members, created_at: timestamp(), updated_at: timestamp(), last_message: None, unread_by }
}

pub fn message(sender: &str, text: &str) -> Message {
    Message {
        id: oid(MSG1),
        chat_id: oid(CHAT),
        sender_id: oid(sender),
        text: text.into(),
        created_at: timestamp(),
        read_by: BTreeSet::from([oid(sender)]),
    }
}
