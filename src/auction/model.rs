use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// 사용자 모델 (public_address 는 커스터디 계정 식별자)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub public_address: String,
    pub username: String,
    pub discord_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// 경매 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Auction {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub max_expiry_date: DateTime<Utc>,
    pub max_claim_date: Option<DateTime<Utc>>,
    pub number_of_winners: i32,
    pub current_bid: Decimal,
    pub bid_step: Decimal,
    pub bid_fee: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Auction {
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now
    }

    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// 입찰 모델 (경매당 사용자별 한 건, 재입찰 시 value 갱신)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuctionBid {
    pub id: i64,
    pub auction_id: i64,
    pub user_id: i64,
    pub value: Decimal,
    pub claim_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 순위가 매겨진 입찰 (사용자 이름 포함)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RankedBid {
    pub id: i64,
    pub auction_id: i64,
    pub user_id: i64,
    pub username: String,
    pub value: Decimal,
    pub claim_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 1 부터 시작
    #[sqlx(skip)]
    pub position: i64,
}

impl RankedBid {
    pub fn is_claimed(&self) -> bool {
        self.claim_transaction_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    Pending,
    Processed,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "PENDING",
            PayoutStatus::Processed => "PROCESSED",
        }
    }
}

// 지급 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payout {
    pub id: i64,
    pub auction_id: i64,
    pub user_id: i64,
    pub public_address: String,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// 클라이언트에 내려주는 경매 뷰
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionView {
    #[serde(flatten)]
    pub auction: Auction,
    pub has_started: bool,
    pub has_expired: bool,
    /// 현재 낙찰권 입찰 (number_of_winners 개까지)
    pub winners: Vec<RankedBid>,
    /// 요청한 사용자의 입찰
    pub user_bid: Option<RankedBid>,
}
