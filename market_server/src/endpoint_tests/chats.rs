use actix_web::{http::StatusCode, web, web::ServiceConfig};
use market_engine::{events::EventProducers, traits::MarketError, ChatApi};

use super::{
    helpers::{chat, get_request, message, oid, post_request, ALICE, BOB, CAROL, CHAT, MSG1},
    mocks::MockChatManager,
};
use crate::routes::{CreateChatRoute, ListChatsRoute, ListMessagesRoute, MarkReadRoute, SendMessageRoute};

fn configure(mock: MockChatManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = ChatApi::new(mock, EventProducers::default());
        cfg.app_data(web::Data::new(api))
            .service(CreateChatRoute::<MockChatManager>::new())
            .service(ListChatsRoute::<MockChatManager>::new())
            .service(SendMessageRoute::<MockChatManager>::new())
            .service(ListMessagesRoute::<MockChatManager>::new())
            .service(MarkReadRoute::<MockChatManager>::new());
    }
}

#[actix_web::test]
async fn new_chat_is_created() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_create_or_get_chat()
        .withf(|pair| pair.first() == &oid(ALICE) && pair.second() == &oid(BOB))
        .times(1)
        .returning(|_| Ok((chat(ALICE, BOB), true)));
    // Bob opens the chat, but members are always stored in sorted order
    let path = format!("/chats?userID={BOB}");
    let body = format!(r#"{{"peerId": "{ALICE}"}}"#);
    let (status, body) = post_request(&path, &body, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let json: serde_json::Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(json["id"], CHAT);
    assert_eq!(json["members"][0], ALICE);
    assert_eq!(json["members"][1], BOB);
    assert_eq!(json["unreadBy"][BOB], 0);
}

#[actix_web::test]
async fn existing_chat_is_returned() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_create_or_get_chat().times(1).returning(|_| Ok((chat(ALICE, BOB), false)));
    let path = format!("/chats?userID={ALICE}");
    let body = format!(r#"{{"peerId": "{BOB}"}}"#);
    let (status, body) = post_request(&path, &body, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(CHAT), "{body}");
}

#[actix_web::test]
async fn chat_with_self_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_create_or_get_chat().never();
    let path = format!("/chats?userID={ALICE}");
    let body = format!(r#"{{"peerId": "{ALICE}"}}"#);
    let (status, body) = post_request(&path, &body, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("yourself"), "{body}");
}

#[actix_web::test]
async fn chat_with_unknown_peer() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_create_or_get_chat().returning(|_| Err(MarketError::NotFound(format!("User {CAROL}"))));
    let path = format!("/chats?userID={ALICE}");
    let body = format!(r#"{{"peerId": "{CAROL}"}}"#);
    let (status, _) = post_request(&path, &body, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn list_chats() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_fetch_chats_for_member().withf(|m| m == &oid(ALICE)).returning(|_| Ok(vec![chat(ALICE, BOB)]));
    let path = format!("/chats?userID={ALICE}");
    let (status, body) = get_request(&path, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(json.as_array().map(|a| a.len()), Some(1));
    assert!(json[0]["lastMessage"].is_null());
}

#[actix_web::test]
async fn send_message() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_insert_message()
        .withf(|m| m.chat_id == oid(CHAT) && m.sender_id == oid(ALICE) && m.text == "Is the mug still available?")
        .times(1)
        .returning(|m| {
            let mut c = chat(ALICE, BOB);
            c.unread_by.insert(oid(BOB), 1);
            Ok((message(ALICE, &m.text), c))
        });
    let path = format!("/chats/{CHAT}/messages?userID={ALICE}");
    let body = r#"{"text": "Is the mug still available?"}"#;
    let (status, body) = post_request(&path, body, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let json: serde_json::Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(json["id"], MSG1);
    assert_eq!(json["senderId"], ALICE);
    assert_eq!(json["readBy"][0], ALICE);
}

#[actix_web::test]
async fn blank_and_oversized_messages_are_rejected() {
    let _ = env_logger::try_init().ok();
    let long = "x".repeat(4001);
    for text in ["", long.as_str()] {
        let mut mock = MockChatManager::new();
        mock.expect_insert_message().never();
        let path = format!("/chats/{CHAT}/messages?userID={ALICE}");
        let body = serde_json::json!({ "text": text }).to_string();
        let (status, _) = post_request(&path, &body, configure(mock)).await.expect("Request failed");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[actix_web::test]
async fn outsiders_cannot_send() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_insert_message().returning(|m| {
        Err(MarketError::Unauthorized(format!("{} is not a member of chat {}", m.sender_id, m.chat_id)))
    });
    let path = format!("/chats/{CHAT}/messages?userID={CAROL}");
    let (status, _) = post_request(&path, r#"{"text": "hi"}"#, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn list_messages() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_fetch_chat().withf(|c| c == &oid(CHAT)).returning(|_| Ok(Some(chat(ALICE, BOB))));
    mock.expect_fetch_messages()
        .withf(|c, limit| c == &oid(CHAT) && *limit == 20)
        .times(1)
        .returning(|_, _| Ok(vec![message(BOB, "Yes it is")]));
    let path = format!("/chats/{CHAT}/messages?userID={ALICE}&limit=20");
    let (status, body) = get_request(&path, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Yes it is"), "{body}");
}

#[actix_web::test]
async fn message_limits_fall_back_to_one() {
    let _ = env_logger::try_init().ok();
    for (query, expected) in [("", 50), ("&limit=abc", 1), ("&limit=-4", 1), ("&limit=900", 200)] {
        let mut mock = MockChatManager::new();
        mock.expect_fetch_chat().returning(|_| Ok(Some(chat(ALICE, BOB))));
        mock.expect_fetch_messages().withf(move |_, limit| *limit == expected).times(1).returning(|_, _| Ok(vec![]));
        let path = format!("/chats/{CHAT}/messages?userID={ALICE}{query}");
        let (status, body) = get_request(&path, configure(mock)).await.expect("Request failed");
        assert_eq!(status, StatusCode::OK, "{query}");
        assert_eq!(body, "[]");
    }
}

#[actix_web::test]
async fn outsiders_cannot_read() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_fetch_chat().returning(|_| Ok(Some(chat(ALICE, BOB))));
    mock.expect_fetch_messages().never();
    let path = format!("/chats/{CHAT}/messages?userID={CAROL}");
    let (status, _) = get_request(&path, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn messages_of_unknown_chat() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_fetch_chat().returning(|_| Ok(None));
    mock.expect_fetch_messages().never();
    let path = format!("/chats/{CHAT}/messages?userID={ALICE}");
    let (status, _) = get_request(&path, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn mark_all_read() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_mark_read()
        .withf(|c, r, upto| c == &oid(CHAT) && r == &oid(BOB) && upto.is_none())
        .times(1)
        .returning(|_, _, _| Ok(3));
    let path = format!("/chats/{CHAT}/read?userID={BOB}");
    let (status, body) = post_request(&path, "", configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"ok"}"#);
}

#[actix_web::test]
async fn mark_read_up_to_a_message() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_mark_read()
        .withf(|_, _, upto| upto.as_ref() == Some(&oid(MSG1)))
        .times(1)
        .returning(|_, _, _| Ok(1));
    let path = format!("/chats/{CHAT}/read?userID={BOB}");
    let body = format!(r#"{{"upto": "{MSG1}"}}"#);
    let (status, _) = post_request(&path, &body, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn malformed_upto_marks_everything() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_mark_read().withf(|_, _, upto| upto.is_none()).times(1).returning(|_, _, _| Ok(0));
    let path = format!("/chats/{CHAT}/read?userID={BOB}");
    let (status, _) = post_request(&path, r#"{"upto": "latest"}"#, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn mark_read_with_garbage_body() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockChatManager::new();
    mock.expect_mark_read().never();
    let path = format!("/chats/{CHAT}/read?userID={BOB}");
    let (status, _) = post_request(&path, "{not json", configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
