use super::model::AuctionView;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const AUCTION_UPDATED: &str = "auctionUpdated";
pub const BALANCE_CHANGED: &str = "balanceChanged";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuctionEvent {
    // 입찰 또는 만료로 경매 상태가 바뀜
    AuctionUpdated { auction: AuctionView },
    // 입찰 수수료/낙찰 대금 이체로 잔액이 바뀜
    BalanceChanged { user_id: i64, balance: Decimal },
}

impl AuctionEvent {
    /// 구독 채널 이름
    pub fn channel(&self) -> &'static str {
        match self {
            AuctionEvent::AuctionUpdated { .. } => AUCTION_UPDATED,
            AuctionEvent::BalanceChanged { .. } => BALANCE_CHANGED,
        }
    }

    /// 메시지 키 (같은 경매/사용자 이벤트는 같은 파티션으로)
    pub fn key(&self) -> String {
        match self {
            AuctionEvent::AuctionUpdated { auction } => format!("auction-{}", auction.auction.id),
            AuctionEvent::BalanceChanged { user_id, .. } => format!("user-{}", user_id),
        }
    }
}
