// region:    --- Imports
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use raffle_auction_server::bidding::rules::BiddingPolicy;
use raffle_auction_server::config::Config;
use raffle_auction_server::custody::HttpCustodyClient;
use raffle_auction_server::database::DatabaseManager;
use raffle_auction_server::error::AppError;
use raffle_auction_server::handlers::{self, AppState};
use raffle_auction_server::message_broker::KafkaManager;
use raffle_auction_server::scheduler::AuctionScheduler;
use raffle_auction_server::store::PostgresAuctionStore;
use raffle_auction_server::subscriptions::{self, Broadcaster};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 의 RUST_LOG 도 반영되도록 먼저 로드
    dotenvy::dotenv().ok();

    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    // DatabaseManager 생성 및 초기화
    let db_manager = Arc::new(DatabaseManager::new(&config).await?);
    if let Err(e) = db_manager.initialize_database(config.db_recreate).await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // Kafka 매니저 생성 및 초기화
    let kafka_manager = Arc::new(KafkaManager::new(&config)?);
    if let Err(e) = kafka_manager.initialize().await {
        error!("{:<12} --> Kafka 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> Kafka 초기화 성공", "Main");
    kafka_manager.create_topic(&config.events_topic, 5, 1).await?;

    // 이벤트를 WebSocket 구독자에게 전달
    let broadcaster = Broadcaster::new();
    let consumer = kafka_manager.get_consumer();
    let consumer_broadcaster = broadcaster.clone();
    let events_topic = config.events_topic.clone();
    tokio::spawn(async move {
        let result = consumer
            .consume_events(&events_topic, move |event| {
                let broadcaster = consumer_broadcaster.clone();
                async move {
                    broadcaster.broadcast(event);
                    Ok::<_, AppError>(())
                }
            })
            .await;
        if let Err(e) = result {
            error!("{:<12} --> 이벤트 소비 오류: {:?}", "Main", e);
        }
    });

    let store = Arc::new(PostgresAuctionStore::new(Arc::clone(&db_manager)));
    let publisher = kafka_manager.get_producer();

    // 만료 경매 알림
    let scheduler = AuctionScheduler::new(
        Arc::clone(&store),
        Arc::clone(&publisher),
        config.scheduler_interval_secs,
    );
    scheduler.start();

    let state = AppState {
        db: db_manager,
        store,
        custody: Arc::new(HttpCustodyClient::from_config(&config)?),
        publisher,
        broadcaster,
        policy: Arc::new(BiddingPolicy::from_config(&config)),
    };

    // 프론트엔드를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/auctions", get(handlers::handle_get_auctions))
        .route("/auctions/:id/bid", post(handlers::handle_bid))
        .route("/auctions/:id/claim", post(handlers::handle_claim_request))
        .route("/subscriptions", get(subscriptions::subscriptions_websocket))
        .route("/chain/last-block", get(handlers::handle_get_last_block))
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state);

    let listener = TcpListener::bind(("0.0.0.0", config.api_port)).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
