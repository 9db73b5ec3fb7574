// region:    --- Imports
use super::{AuctionStore, NewBid};
use crate::auction::model::{Auction, AuctionBid, Payout, PayoutStatus, RankedBid, User};
use crate::database::DatabaseManager;
use crate::error::{AppError, Result};
use crate::query::queries;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;
use tracing::{debug, info};

// endregion: --- Imports

// region:    --- Postgres Auction Store
/// 경매 저장소 구현체
pub struct PostgresAuctionStore {
    db_manager: Arc<DatabaseManager>,
}

impl PostgresAuctionStore {
    pub fn new(db_manager: Arc<DatabaseManager>) -> Self {
        Self { db_manager }
    }
}

#[async_trait]
impl AuctionStore for PostgresAuctionStore {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        debug!("{:<12} --> 사용자 조회 id: {}", "Store", user_id);
        Ok(sqlx::query_as::<_, User>(queries::GET_USER)
            .bind(user_id)
            .fetch_optional(self.db_manager.pool())
            .await?)
    }

    async fn find_auction(&self, auction_id: i64) -> Result<Option<Auction>> {
        debug!("{:<12} --> 경매 조회 id: {}", "Store", auction_id);
        Ok(sqlx::query_as::<_, Auction>(queries::GET_AUCTION)
            .bind(auction_id)
            .fetch_optional(self.db_manager.pool())
            .await?)
    }

    async fn list_auctions(&self) -> Result<Vec<Auction>> {
        debug!("{:<12} --> 모든 경매 조회", "Store");
        Ok(sqlx::query_as::<_, Auction>(queries::GET_ALL_AUCTIONS)
            .fetch_all(self.db_manager.pool())
            .await?)
    }

    async fn auctions_expired_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Auction>> {
        Ok(
            sqlx::query_as::<_, Auction>(queries::GET_AUCTIONS_EXPIRED_BETWEEN)
                .bind(from)
                .bind(to)
                .fetch_all(self.db_manager.pool())
                .await?,
        )
    }

    async fn sorted_bids(&self, auction_id: i64, limit: Option<i64>) -> Result<Vec<RankedBid>> {
        debug!("{:<12} --> 정렬된 입찰 조회 id: {}", "Store", auction_id);
        Ok(sqlx::query_as::<_, RankedBid>(queries::GET_SORTED_AUCTION_BIDS)
            .bind(auction_id)
            .bind(limit)
            .fetch_all(self.db_manager.pool())
            .await?)
    }

    async fn find_bid(&self, bid_id: i64) -> Result<Option<AuctionBid>> {
        Ok(sqlx::query_as::<_, AuctionBid>(queries::GET_AUCTION_BID)
            .bind(bid_id)
            .fetch_optional(self.db_manager.pool())
            .await?)
    }

    async fn record_bid(&self, bid: NewBid) -> Result<Option<Auction>> {
        self.db_manager
            .transaction(move |tx| {
                Box::pin(async move {
                    // 가격이 그대로일 때만 갱신
                    let updated = sqlx::query_as::<_, Auction>(queries::UPDATE_AUCTION_BID)
                        .bind(bid.value)
                        .bind(bid.expires_at)
                        .bind(bid.auction_id)
                        .bind(bid.expected_current_bid)
                        .bind(bid.placed_at)
                        .fetch_optional(&mut **tx)
                        .await?;

                    let Some(auction) = updated else {
                        return Ok::<_, AppError>(None);
                    };

                    sqlx::query(queries::UPSERT_AUCTION_BID)
                        .bind(bid.auction_id)
                        .bind(bid.user_id)
                        .bind(bid.value)
                        .bind(bid.placed_at)
                        .execute(&mut **tx)
                        .await?;

                    info!(
                        "{:<12} --> 입찰 기록: auction={}, user={}, value={}",
                        "Store", bid.auction_id, bid.user_id, bid.value
                    );
                    Ok(Some(auction))
                })
            })
            .await
    }

    async fn reserve_claim(&self, bid_id: i64, marker: &str) -> Result<bool> {
        let result = sqlx::query(queries::RESERVE_CLAIM)
            .bind(bid_id)
            .bind(marker)
            .execute(self.db_manager.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_claim(&self, bid_id: i64, marker: &str) -> Result<()> {
        sqlx::query(queries::RELEASE_CLAIM)
            .bind(bid_id)
            .bind(marker)
            .execute(self.db_manager.pool())
            .await?;
        Ok(())
    }

    async fn set_claim_transaction(
        &self,
        bid_id: i64,
        marker: &str,
        transaction_id: &str,
    ) -> Result<bool> {
        let result = sqlx::query(queries::SET_CLAIM_TRANSACTION)
            .bind(bid_id)
            .bind(marker)
            .bind(transaction_id)
            .execute(self.db_manager.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn create_payout(
        &self,
        auction_id: i64,
        user_id: i64,
        public_address: &str,
    ) -> Result<Payout> {
        Ok(sqlx::query_as::<_, Payout>(queries::INSERT_PAYOUT)
            .bind(auction_id)
            .bind(user_id)
            .bind(public_address)
            .bind(PayoutStatus::Pending)
            .fetch_one(self.db_manager.pool())
            .await?)
    }

    async fn mark_payout_processed(&self, payout_id: i64, at: DateTime<Utc>) -> Result<Payout> {
        Ok(sqlx::query_as::<_, Payout>(queries::MARK_PAYOUT_PROCESSED)
            .bind(payout_id)
            .bind(at)
            .bind(PayoutStatus::Processed)
            .fetch_one(self.db_manager.pool())
            .await?)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query(queries::GET_SETTING)
            .bind(key)
            .fetch_optional(self.db_manager.pool())
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(queries::UPSERT_SETTING)
            .bind(key)
            .bind(value)
            .execute(self.db_manager.pool())
            .await?;
        Ok(())
    }
}

// endregion: --- Postgres Auction Store
