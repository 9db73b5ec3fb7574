//! 경매 저장소 트레이트
// region:    --- Imports
use crate::auction::model::{Auction, AuctionBid, Payout, RankedBid, User};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

mod postgres;

pub use postgres::PostgresAuctionStore;

// endregion: --- Imports

// region:    --- Auction Store Trait
/// 입찰 반영 요청
#[derive(Debug, Clone, Copy)]
pub struct NewBid {
    pub auction_id: i64,
    pub user_id: i64,
    /// 읽을 때의 current_bid (다르면 충돌)
    pub expected_current_bid: Decimal,
    pub value: Decimal,
    pub expires_at: DateTime<Utc>,
    pub placed_at: DateTime<Utc>,
}

#[async_trait]
pub trait AuctionStore: Send + Sync {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>>;

    async fn find_auction(&self, auction_id: i64) -> Result<Option<Auction>>;

    async fn list_auctions(&self) -> Result<Vec<Auction>>;

    /// from < expires_at <= to
    async fn auctions_expired_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Auction>>;

    /// 금액 내림차순, 동일 금액은 먼저 도달한 입찰 우선. position 은 호출 측에서 채운다.
    async fn sorted_bids(&self, auction_id: i64, limit: Option<i64>) -> Result<Vec<RankedBid>>;

    async fn find_bid(&self, bid_id: i64) -> Result<Option<AuctionBid>>;

    /// 충돌(가격 변경 또는 만료)이면 None
    async fn record_bid(&self, bid: NewBid) -> Result<Option<Auction>>;

    /// claim_transaction_id 가 비어 있을 때만 marker 로 채운다. 이미 점유되었으면 false
    async fn reserve_claim(&self, bid_id: i64, marker: &str) -> Result<bool>;

    /// marker 로 예약된 클레임을 되돌린다
    async fn release_claim(&self, bid_id: i64, marker: &str) -> Result<()>;

    /// marker 를 실제 트랜잭션 id 로 교체. 예약이 사라졌으면 false
    async fn set_claim_transaction(
        &self,
        bid_id: i64,
        marker: &str,
        transaction_id: &str,
    ) -> Result<bool>;

    async fn create_payout(
        &self,
        auction_id: i64,
        user_id: i64,
        public_address: &str,
    ) -> Result<Payout>;

    async fn mark_payout_processed(&self, payout_id: i64, at: DateTime<Utc>) -> Result<Payout>;

    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}

// endregion: --- Auction Store Trait
