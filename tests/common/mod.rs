#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use raffle_auction_server::auction::events::AuctionEvent;
use raffle_auction_server::auction::model::{
    Auction, AuctionBid, Payout, PayoutStatus, RankedBid, User,
};
use raffle_auction_server::bidding::rules::BiddingPolicy;
use raffle_auction_server::custody::{CustodyClient, TransactionType, TransferReceipt};
use raffle_auction_server::error::{AppError, Result};
use raffle_auction_server::message_broker::EventPublisher;
use raffle_auction_server::store::{AuctionStore, NewBid};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub const SYSTEM_USER: &str = "system-account";

pub fn policy() -> BiddingPolicy {
    BiddingPolicy {
        system_user_id: SYSTEM_USER.to_string(),
        bid_extension: Duration::seconds(10),
    }
}

// region:    --- In-memory Store
#[derive(Default)]
struct StoreState {
    users: HashMap<i64, User>,
    auctions: BTreeMap<i64, Auction>,
    bids: Vec<AuctionBid>,
    payouts: Vec<Payout>,
    settings: HashMap<String, String>,
    next_id: i64,
    /// 남은 횟수만큼 record_bid 가 경쟁 입찰을 흉내 내고 충돌을 돌려준다
    competing_bids: usize,
    /// 다음 reserve_claim 직전에 다른 요청이 먼저 예약한 것처럼 만든다
    claim_taken_elsewhere: bool,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, public_address: &str) -> User {
        let mut state = self.state.lock().unwrap();
        let user = User {
            id: state.next_id(),
            public_address: public_address.to_string(),
            username: username.to_string(),
            discord_name: None,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        user
    }

    /// 진행 중인 경매 (1 시간 남음)
    pub fn add_active_auction(&self) -> Auction {
        let now = Utc::now();
        self.add_auction(|a| {
            a.start_date = now - Duration::hours(1);
            a.expires_at = now + Duration::hours(1);
            a.max_expiry_date = now + Duration::hours(2);
        })
    }

    /// 한 시간 전에 끝난 경매
    pub fn add_expired_auction(&self) -> Auction {
        let now = Utc::now();
        self.add_auction(|a| {
            a.start_date = now - Duration::days(1);
            a.expires_at = now - Duration::hours(1);
            a.max_expiry_date = now - Duration::hours(1);
        })
    }

    pub fn add_auction(&self, customize: impl FnOnce(&mut Auction)) -> Auction {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let mut auction = Auction {
            id: state.next_id(),
            title: "Hardware wallet".to_string(),
            description: "Raffle prize".to_string(),
            image_url: None,
            start_date: now - Duration::hours(1),
            expires_at: now + Duration::hours(1),
            max_expiry_date: now + Duration::hours(2),
            max_claim_date: None,
            number_of_winners: 1,
            current_bid: dec!(0.10),
            bid_step: dec!(0.01),
            bid_fee: dec!(1),
            created_at: now - Duration::days(1),
        };
        customize(&mut auction);
        state.auctions.insert(auction.id, auction.clone());
        auction
    }

    pub fn add_bid(&self, auction_id: i64, user_id: i64, value: Decimal) -> AuctionBid {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let bid = AuctionBid {
            id: state.next_id(),
            auction_id,
            user_id,
            value,
            claim_transaction_id: None,
            created_at: now,
            updated_at: now,
        };
        state.bids.push(bid.clone());
        bid
    }

    pub fn auction(&self, auction_id: i64) -> Auction {
        self.state.lock().unwrap().auctions[&auction_id].clone()
    }

    pub fn bid(&self, bid_id: i64) -> AuctionBid {
        let state = self.state.lock().unwrap();
        state.bids.iter().find(|b| b.id == bid_id).cloned().unwrap()
    }

    pub fn bids_for(&self, auction_id: i64) -> Vec<AuctionBid> {
        let state = self.state.lock().unwrap();
        state
            .bids
            .iter()
            .filter(|b| b.auction_id == auction_id)
            .cloned()
            .collect()
    }

    pub fn payouts(&self) -> Vec<Payout> {
        self.state.lock().unwrap().payouts.clone()
    }

    pub fn simulate_claim_taken_elsewhere(&self) {
        self.state.lock().unwrap().claim_taken_elsewhere = true;
    }

    pub fn simulate_competing_bids(&self, count: usize) {
        self.state.lock().unwrap().competing_bids = count;
    }
}

#[async_trait]
impl AuctionStore for InMemoryStore {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.state.lock().unwrap().users.get(&user_id).cloned())
    }

    async fn find_auction(&self, auction_id: i64) -> Result<Option<Auction>> {
        Ok(self.state.lock().unwrap().auctions.get(&auction_id).cloned())
    }

    async fn list_auctions(&self) -> Result<Vec<Auction>> {
        let mut auctions: Vec<Auction> =
            self.state.lock().unwrap().auctions.values().cloned().collect();
        auctions.sort_by_key(|a| (a.expires_at, a.id));
        Ok(auctions)
    }

    async fn auctions_expired_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Auction>> {
        let mut auctions: Vec<Auction> = self
            .state
            .lock()
            .unwrap()
            .auctions
            .values()
            .filter(|a| a.expires_at > from && a.expires_at <= to)
            .cloned()
            .collect();
        auctions.sort_by_key(|a| a.expires_at);
        Ok(auctions)
    }

    async fn sorted_bids(&self, auction_id: i64, limit: Option<i64>) -> Result<Vec<RankedBid>> {
        let state = self.state.lock().unwrap();
        let mut bids: Vec<&AuctionBid> = state
            .bids
            .iter()
            .filter(|b| b.auction_id == auction_id)
            .collect();
        bids.sort_by(|a, b| {
            b.value
                .cmp(&a.value)
                .then(a.updated_at.cmp(&b.updated_at))
                .then(a.id.cmp(&b.id))
        });
        let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(bids
            .into_iter()
            .take(limit)
            .map(|b| RankedBid {
                id: b.id,
                auction_id: b.auction_id,
                user_id: b.user_id,
                username: state
                    .users
                    .get(&b.user_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
                value: b.value,
                claim_transaction_id: b.claim_transaction_id.clone(),
                created_at: b.created_at,
                updated_at: b.updated_at,
                position: 0,
            })
            .collect())
    }

    async fn find_bid(&self, bid_id: i64) -> Result<Option<AuctionBid>> {
        let state = self.state.lock().unwrap();
        Ok(state.bids.iter().find(|b| b.id == bid_id).cloned())
    }

    async fn record_bid(&self, bid: NewBid) -> Result<Option<Auction>> {
        let mut state = self.state.lock().unwrap();

        if state.competing_bids > 0 {
            state.competing_bids -= 1;
            if let Some(auction) = state.auctions.get_mut(&bid.auction_id) {
                auction.current_bid += auction.bid_step;
            }
            return Ok(None);
        }

        let Some(auction) = state.auctions.get_mut(&bid.auction_id) else {
            return Ok(None);
        };
        if auction.current_bid != bid.expected_current_bid || auction.expires_at <= bid.placed_at
        {
            return Ok(None);
        }
        auction.current_bid = bid.value;
        auction.expires_at = bid.expires_at;
        let updated = auction.clone();

        match state
            .bids
            .iter_mut()
            .find(|b| b.auction_id == bid.auction_id && b.user_id == bid.user_id)
        {
            Some(existing) => {
                existing.value = bid.value;
                existing.updated_at = bid.placed_at;
            }
            None => {
                let id = state.next_id();
                state.bids.push(AuctionBid {
                    id,
                    auction_id: bid.auction_id,
                    user_id: bid.user_id,
                    value: bid.value,
                    claim_transaction_id: None,
                    created_at: bid.placed_at,
                    updated_at: bid.placed_at,
                });
            }
        }
        Ok(Some(updated))
    }

    async fn reserve_claim(&self, bid_id: i64, marker: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let taken_elsewhere = std::mem::take(&mut state.claim_taken_elsewhere);
        let Some(bid) = state.bids.iter_mut().find(|b| b.id == bid_id) else {
            return Ok(false);
        };
        if taken_elsewhere && bid.claim_transaction_id.is_none() {
            bid.claim_transaction_id = Some("PENDING-elsewhere".to_string());
        }
        if bid.claim_transaction_id.is_some() {
            return Ok(false);
        }
        bid.claim_transaction_id = Some(marker.to_string());
        Ok(true)
    }

    async fn release_claim(&self, bid_id: i64, marker: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(bid) = state
            .bids
            .iter_mut()
            .find(|b| b.id == bid_id && b.claim_transaction_id.as_deref() == Some(marker))
        {
            bid.claim_transaction_id = None;
        }
        Ok(())
    }

    async fn set_claim_transaction(
        &self,
        bid_id: i64,
        marker: &str,
        transaction_id: &str,
    ) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .bids
            .iter_mut()
            .find(|b| b.id == bid_id && b.claim_transaction_id.as_deref() == Some(marker))
        {
            Some(bid) => {
                bid.claim_transaction_id = Some(transaction_id.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_payout(
        &self,
        auction_id: i64,
        user_id: i64,
        public_address: &str,
    ) -> Result<Payout> {
        let mut state = self.state.lock().unwrap();
        let payout = Payout {
            id: state.next_id(),
            auction_id,
            user_id,
            public_address: public_address.to_string(),
            status: PayoutStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
        };
        state.payouts.push(payout.clone());
        Ok(payout)
    }

    async fn mark_payout_processed(&self, payout_id: i64, at: DateTime<Utc>) -> Result<Payout> {
        let mut state = self.state.lock().unwrap();
        let payout = state
            .payouts
            .iter_mut()
            .find(|p| p.id == payout_id)
            .ok_or_else(|| AppError::Database(sqlx::Error::RowNotFound))?;
        payout.status = PayoutStatus::Processed;
        payout.processed_at = Some(at);
        Ok(payout.clone())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// endregion: --- In-memory Store

// region:    --- Fake Custody
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
}

#[derive(Default)]
pub struct FakeCustody {
    balances: Mutex<HashMap<String, Decimal>>,
    transfers: Mutex<Vec<Transfer>>,
    counter: AtomicUsize,
    pub fail_transfers: AtomicBool,
    pub omit_transaction_id: AtomicBool,
}

impl FakeCustody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, address: &str, balance: Decimal) {
        self.balances
            .lock()
            .unwrap()
            .insert(address.to_string(), balance);
    }

    pub fn balance(&self, address: &str) -> Decimal {
        self.balances
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.transfers.lock().unwrap().clone()
    }
}

#[async_trait]
impl CustodyClient for FakeCustody {
    async fn get_user_balance(&self, public_address: &str) -> Result<Decimal> {
        Ok(self.balance(public_address))
    }

    async fn internal_transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        transaction_type: TransactionType,
    ) -> Result<TransferReceipt> {
        if self.fail_transfers.load(Ordering::SeqCst) {
            return Err(AppError::Custody("custody unavailable".to_string()));
        }

        {
            let mut balances = self.balances.lock().unwrap();
            *balances.entry(from.to_string()).or_insert(Decimal::ZERO) -= amount;
            *balances.entry(to.to_string()).or_insert(Decimal::ZERO) += amount;
        }
        self.transfers.lock().unwrap().push(Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            transaction_type,
        });

        if self.omit_transaction_id.load(Ordering::SeqCst) {
            return Ok(TransferReceipt::default());
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TransferReceipt {
            transaction_id: Some(format!("tx-{}", n)),
        })
    }
}

// endregion: --- Fake Custody

// region:    --- Recording Publisher
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<AuctionEvent>>,
    pub fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuctionEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &AuctionEvent) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Broker("broker down".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// endregion: --- Recording Publisher
