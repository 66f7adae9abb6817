use std::time::Duration;

use actix_web::{
    dev::Server,
    error::{JsonPayloadError, QueryPayloadError},
    http::KeepAlive,
    middleware::Logger,
    web,
    web::ServiceConfig,
    App,
    HttpRequest,
    HttpServer,
};
use futures::FutureExt;
use log::*;
use market_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    helpers::KeyLocks,
    CartApi,
    ChatApi,
    OrderFlowApi,
    ReviewApi,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    reconcile_worker::start_reconcile_worker,
    routes::{
        health,
        AddRoute,
        BuyRoute,
        CheckoutRoute,
        CreateChatRoute,
        ListChatsRoute,
        ListMessagesRoute,
        ListReviewsRoute,
        ListRoute,
        MarkReadRoute,
        OrdersRoute,
        RemoveRoute,
        SendMessageRoute,
        SubmitReviewRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(config.event_buffer, activity_log_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    if let Some(interval) = config.reconcile_interval {
        let _handle = start_reconcile_worker(db.clone(), interval);
    }
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(ServerError::from)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    // One lock registry for every worker, so requests for the same key are serialised across workers
    let locks = KeyLocks::new();
    let options = ServerOptions::from_config(&config);
    let order_options = config.order_flow_options();
    let srv = HttpServer::new(move || {
        let cart_api = CartApi::new(db.clone()).with_locks(locks.clone());
        let orders_api =
            OrderFlowApi::new(db.clone(), producers.clone()).with_locks(locks.clone()).with_options(order_options);
        let reviews_api = ReviewApi::new(db.clone(), producers.clone()).with_locks(locks.clone());
        let chat_api = ChatApi::new(db.clone(), producers.clone()).with_locks(locks.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mkt::access_log"))
            .configure(configure_extractors)
            .app_data(web::Data::new(options))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(reviews_api))
            .app_data(web::Data::new(chat_api))
            .service(health)
            .service(AddRoute::<SqliteDatabase>::new())
            .service(RemoveRoute::<SqliteDatabase>::new())
            .service(ListRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(BuyRoute::<SqliteDatabase>::new())
            .service(OrdersRoute::<SqliteDatabase>::new())
            .service(SubmitReviewRoute::<SqliteDatabase>::new())
            .service(ListReviewsRoute::<SqliteDatabase>::new())
            .service(CreateChatRoute::<SqliteDatabase>::new())
            .service(ListChatsRoute::<SqliteDatabase>::new())
            .service(SendMessageRoute::<SqliteDatabase>::new())
            .service(ListMessagesRoute::<SqliteDatabase>::new())
            .service(MarkReadRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("💻️ Listening on {}:{}", config.host, config.port);
    Ok(srv)
}

/// Makes query string and JSON body failures respond with the same `{"error": ...}` body as every other error.
pub fn configure_extractors(cfg: &mut ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::JsonConfig::default().error_handler(json_error));
}

fn query_error(e: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Bad query string for {}. {e}", req.path());
    ServerError::MissingParameter(e.to_string()).into()
}

fn json_error(e: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Bad request body for {}. {e}", req.path());
    ServerError::InvalidRequestBody(e.to_string()).into()
}

/// Hooks that write each committed flow to the `mkt::activity` log target.
pub fn activity_log_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_placed(|ev| {
            async move {
                let order = ev.order;
                info!(target: "mkt::activity", "📬️ Order {} placed by {} for {}", order.id, order.user_id, order.price);
            }
            .boxed()
        })
        .on_review_submitted(|ev| {
            async move {
                info!(
                    target: "mkt::activity",
                    "📬️ Review of {} by {} {}. Rating is now {:.2}",
                    ev.review.product_id, ev.review.user_id, ev.status, ev.rating.avg
                );
            }
            .boxed()
        })
        .on_message_sent(|ev| {
            async move {
                info!(target: "mkt::activity", "📬️ Message {} sent in chat {}", ev.message.id, ev.chat.id);
            }
            .boxed()
        });
    hooks
}
