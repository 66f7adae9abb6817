use actix_web::{http::StatusCode, web, web::ServiceConfig};
use market_engine::{
    db_types::UpsertStatus,
    events::EventProducers,
    traits::{MarketError, ReviewOutcome},
    ReviewApi,
};

use super::{
    helpers::{aggregate, get_request, oid, post_request, review, ALICE, MUG},
    mocks::MockReviewManager,
};
use crate::routes::{ListReviewsRoute, SubmitReviewRoute};

fn configure(mock: MockReviewManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = ReviewApi::new(mock, EventProducers::default());
        cfg.app_data(web::Data::new(api))
            .service(SubmitReviewRoute::<MockReviewManager>::new())
            .service(ListReviewsRoute::<MockReviewManager>::new());
    }
}

fn review_path() -> String {
    format!("/products/{MUG}/reviews?userID={ALICE}")
}

#[actix_web::test]
async fn first_review_is_created() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockReviewManager::new();
    mock.expect_upsert_review()
        .withf(|r| r.product_id == oid(MUG) && r.user_id == oid(ALICE) && r.rating == 4.5 && r.text == "Great mug")
        .times(1)
        .returning(|r| {
            Ok(ReviewOutcome {
                status: UpsertStatus::Created,
                review: review(r.rating, &r.text),
                rating: aggregate(4.5, 1),
            })
        });
    let body = r#"{"rating": 4.5, "review": "Great mug"}"#;
    let (status, body) = post_request(&review_path(), body, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"created"}"#);
}

#[actix_web::test]
async fn second_review_is_updated() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockReviewManager::new();
    mock.expect_upsert_review().times(1).returning(|r| {
        Ok(ReviewOutcome {
            status: UpsertStatus::Updated,
            review: review(r.rating, &r.text),
            rating: aggregate(2.0, 1),
        })
    });
    let body = r#"{"rating": 2, "review": "Chipped after a week"}"#;
    let (status, body) = post_request(&review_path(), body, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"updated"}"#);
}

#[actix_web::test]
async fn out_of_range_ratings_are_rejected() {
    let _ = env_logger::try_init().ok();
    for rating in ["-1", "5.5", "100"] {
        let mut mock = MockReviewManager::new();
        mock.expect_upsert_review().never();
        let body = format!(r#"{{"rating": {rating}, "review": "ok"}}"#);
        let (status, body) = post_request(&review_path(), &body, configure(mock)).await.expect("Request failed");
        assert_eq!(status, StatusCode::BAD_REQUEST, "rating {rating}: {body}");
    }
}

#[actix_web::test]
async fn empty_review_text_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockReviewManager::new();
    mock.expect_upsert_review().never();
    let body = r#"{"rating": 3, "review": ""}"#;
    let (status, _) = post_request(&review_path(), body, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn review_body_must_be_json() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockReviewManager::new();
    mock.expect_upsert_review().never();
    let (status, body) = post_request(&review_path(), "five stars", configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Could not read request body"), "{body}");
}

#[actix_web::test]
async fn only_buyers_may_review() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockReviewManager::new();
    mock.expect_upsert_review()
        .returning(|r| Err(MarketError::Unauthorized(format!("{} has not bought {}", r.user_id, r.product_id))));
    let body = r#"{"rating": 5, "review": "Looks nice"}"#;
    let (status, body) = post_request(&review_path(), body, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("has not bought"), "{body}");
}

#[actix_web::test]
async fn review_of_unknown_product() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockReviewManager::new();
    mock.expect_upsert_review().returning(|r| Err(MarketError::NotFound(format!("Product {}", r.product_id))));
    let body = r#"{"rating": 5, "review": "Looks nice"}"#;
    let (status, _) = post_request(&review_path(), body, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn list_reviews() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockReviewManager::new();
    mock.expect_fetch_reviews()
        .withf(|p, limit| p == &oid(MUG) && *limit == 50)
        .times(1)
        .returning(|_, _| Ok(vec![review(4.0, "Solid"), review(2.5, "Meh")]));
    let path = format!("/products/{MUG}/reviews");
    let (status, body) = get_request(&path, configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(json[0]["review"], "Solid");
    assert_eq!(json[0]["userId"], ALICE);
    assert_eq!(json[1]["rating"], 2.5);
}

#[actix_web::test]
async fn review_limits_are_clamped() {
    let _ = env_logger::try_init().ok();
    for (given, expected) in [("7", 7), ("abc", 50), ("5000", 200), ("0", 1)] {
        let mut mock = MockReviewManager::new();
        mock.expect_fetch_reviews().withf(move |_, limit| *limit == expected).times(1).returning(|_, _| Ok(vec![]));
        let path = format!("/products/{MUG}/reviews?limit={given}");
        let (status, body) = get_request(&path, configure(mock)).await.expect("Request failed");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }
}

#[actix_web::test]
async fn list_reviews_for_malformed_product() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockReviewManager::new();
    mock.expect_fetch_reviews().never();
    let (status, body) = get_request("/products/mug/reviews", configure(mock)).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("pid"), "{body}");
}
