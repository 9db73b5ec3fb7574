/// 입찰/클레임 규칙
// region:    --- Imports
use crate::auction::model::{Auction, RankedBid};
use crate::config::Config;
use crate::error::AuctionError;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

// endregion: --- Imports

// region:    --- Policy
/// 입찰 정책
#[derive(Debug, Clone)]
pub struct BiddingPolicy {
    /// 수수료와 낙찰 대금을 받는 시스템 계정
    pub system_user_id: String,
    /// 입찰 시 최소 남은 시간 (부족하면 연장)
    pub bid_extension: Duration,
}

impl BiddingPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            system_user_id: config.system_user_id.clone(),
            bid_extension: Duration::seconds(config.bid_extension_secs),
        }
    }
}

// endregion: --- Policy

// region:    --- Rules
/// 입찰 가능 시간 검증
pub fn check_bid_window(auction: &Auction, now: DateTime<Utc>) -> Result<(), AuctionError> {
    if !auction.has_started(now) {
        return Err(AuctionError::NotStarted);
    }
    if auction.has_expired(now) {
        return Err(AuctionError::Expired);
    }
    Ok(())
}

/// 클레임 가능 시간 검증 (만료 후, max_claim_date 전)
pub fn check_claim_window(auction: &Auction, now: DateTime<Utc>) -> Result<(), AuctionError> {
    if auction.expires_at > now {
        return Err(AuctionError::NotExpiredYet);
    }
    if let Some(max_claim_date) = auction.max_claim_date {
        if max_claim_date < now {
            return Err(AuctionError::ClaimWindowClosed);
        }
    }
    Ok(())
}

pub fn next_bid_value(auction: &Auction) -> Decimal {
    auction.current_bid + auction.bid_step
}

/// 남은 시간이 extension 보다 짧으면 now + extension 까지 연장, 단 max_expiry_date 를 넘지 않음
pub fn next_expiry(auction: &Auction, now: DateTime<Utc>, extension: Duration) -> DateTime<Utc> {
    let extended = auction.expires_at.max(now + extension);
    extended.min(auction.max_expiry_date)
}

pub fn is_balance_sufficient_for_payment(value: Decimal, balance: Decimal) -> bool {
    balance >= value
}

/// 정렬된 입찰에 1 부터 순위 부여
pub fn rank_bids(mut bids: Vec<RankedBid>) -> Vec<RankedBid> {
    for (index, bid) in bids.iter_mut().enumerate() {
        bid.position = index as i64 + 1;
    }
    bids
}

/// 정렬된 입찰 중 낙찰권
pub fn winning_bids(sorted_bids: &[RankedBid], number_of_winners: i32) -> &[RankedBid] {
    let count = usize::try_from(number_of_winners).unwrap_or(0);
    &sorted_bids[..count.min(sorted_bids.len())]
}

// endregion: --- Rules
