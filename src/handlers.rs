// region:    --- Imports
use crate::auction::model::AuctionView;
use crate::bidding::commands::{handle_claim, handle_place_bid, ClaimCommand, PlaceBidCommand};
use crate::bidding::rules::BiddingPolicy;
use crate::chain;
use crate::custody::HttpCustodyClient;
use crate::database::DatabaseManager;
use crate::error::{AppError, AuctionError};
use crate::message_broker::KafkaProducer;
use crate::query;
use crate::store::PostgresAuctionStore;
use crate::subscriptions::Broadcaster;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

/// 호출한 사용자를 식별하는 헤더
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub store: Arc<PostgresAuctionStore>,
    pub custody: Arc<HttpCustodyClient>,
    pub publisher: Arc<KafkaProducer>,
    pub broadcaster: Broadcaster,
    pub policy: Arc<BiddingPolicy>,
}

/// 헤더에서 사용자 id 추출 (없거나 숫자가 아니면 None)
pub fn user_id_from_headers(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()
}

// region:    --- Command Handlers

/// 입찰 요청 처리
pub async fn handle_bid(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<AuctionView>, AuctionError> {
    let cmd = PlaceBidCommand {
        auction_id,
        user_id: user_id_from_headers(&headers),
    };
    let view = handle_place_bid(
        cmd,
        &*state.store,
        &*state.custody,
        &*state.publisher,
        &state.policy,
    )
    .await?;
    Ok(Json(view))
}

/// 클레임 요청 처리
pub async fn handle_claim_request(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<AuctionView>, AuctionError> {
    let cmd = ClaimCommand {
        auction_id,
        user_id: user_id_from_headers(&headers),
    };
    let view = handle_claim(
        cmd,
        &*state.store,
        &*state.custody,
        &*state.publisher,
        &state.policy,
    )
    .await?;
    Ok(Json(view))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

#[derive(Debug, Deserialize)]
pub struct AuctionsQuery {
    pub id: Option<i64>,
}

/// 경매 조회
pub async fn handle_get_auctions(
    State(state): State<AppState>,
    Query(params): Query<AuctionsQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<AuctionView>>, AppError> {
    info!("{:<12} --> 경매 조회 id: {:?}", "HandlerQuery", params.id);
    let views =
        query::handlers::get_auctions(&*state.store, params.id, user_id_from_headers(&headers))
            .await?;
    Ok(Json(views))
}

/// 마지막 처리 블록 조회
pub async fn handle_get_last_block(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let block = chain::get_last_processed_block(&*state.store).await?;
    Ok(Json(serde_json::json!({ "last_processed_block": block })))
}

/// DB 연결 확인
pub async fn handle_health(State(state): State<AppState>) -> Result<&'static str, AppError> {
    state.db.ping().await?;
    Ok("ok")
}

// endregion: --- Query Handlers
