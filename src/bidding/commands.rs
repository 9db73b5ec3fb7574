/// 입찰 관련 커맨드 처리
/// 1. 입찰
/// 2. 클레임 (낙찰 대금 결제)
// region:    --- Imports
use super::rules::{
    check_bid_window, check_claim_window, is_balance_sufficient_for_payment, next_bid_value,
    next_expiry, winning_bids, BiddingPolicy,
};
use crate::auction::events::AuctionEvent;
use crate::auction::model::{AuctionBid, AuctionView, Payout, User};
use crate::custody::{verify_positive_balance, CustodyClient, TransactionType};
use crate::error::{AppError, AuctionError};
use crate::message_broker::EventPublisher;
use crate::query::handlers::{build_auction_view, get_sorted_auction_bids};
use crate::store::{AuctionStore, NewBid};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;
// endregion: --- Imports

// region:    --- Commands
/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub auction_id: i64,
    pub user_id: Option<i64>,
}

/// 클레임 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClaimCommand {
    pub auction_id: i64,
    pub user_id: Option<i64>,
}

// 최대 재시도 횟수
pub const MAX_RETRIES: i32 = 100;

/// 1. 입찰
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    store: &impl AuctionStore,
    custody: &impl CustodyClient,
    publisher: &impl EventPublisher,
    policy: &BiddingPolicy,
) -> Result<AuctionView, AuctionError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);
    let user = require_user(store, cmd.user_id).await?;

    let mut auction = store
        .find_auction(cmd.auction_id)
        .await?
        .ok_or(AuctionError::AuctionNotFound)?;
    check_bid_window(&auction, Utc::now())?;

    // 입찰 수수료 잔액 확인
    let balance = custody.get_user_balance(&user.public_address).await?;
    if !is_balance_sufficient_for_payment(auction.bid_fee, balance) {
        return Err(AuctionError::InsufficientBalance);
    }

    let fee_transaction_id = charge_bid_fee(custody, policy, &user, auction.bid_fee).await?;

    let mut retries = 0;
    let updated = loop {
        if retries >= MAX_RETRIES {
            error!(
                "{:<12} --> 최대 재시도 횟수 초과: auction={}, user={}, fee_tx={:?}",
                "Command", auction.id, user.id, fee_transaction_id
            );
            return Err(AuctionError::MaxRetriesExceeded);
        }

        let now = Utc::now();
        if let Err(e) = check_bid_window(&auction, now) {
            // 수수료는 이미 이체됨
            error!(
                "{:<12} --> 수수료 이체 후 경매 종료: auction={}, user={}, fee_tx={:?}",
                "Command", auction.id, user.id, fee_transaction_id
            );
            return Err(e);
        }

        let bid = NewBid {
            auction_id: auction.id,
            user_id: user.id,
            expected_current_bid: auction.current_bid,
            value: next_bid_value(&auction),
            expires_at: next_expiry(&auction, now, policy.bid_extension),
            placed_at: now,
        };

        match store.record_bid(bid).await? {
            Some(updated) => break updated,
            None => {
                warn!(
                    "{:<12} --> 낙관적 업데이트로 인한 충돌: 재시도 ({})",
                    "Command", retries
                );
                retries += 1;
                auction = store
                    .find_auction(cmd.auction_id)
                    .await?
                    .ok_or(AuctionError::AuctionNotFound)?;
            }
        }
    };

    info!(
        "{:<12} --> 입찰 성공: auction={}, price={}",
        "Command", updated.id, updated.current_bid
    );

    let view = build_auction_view(store, updated, Some(user.id), Utc::now()).await?;

    // 공개 이벤트에는 사용자 입찰을 싣지 않음
    let public_view = AuctionView {
        user_bid: None,
        ..view.clone()
    };
    publish(publisher, AuctionEvent::AuctionUpdated {
        auction: public_view,
    })
    .await;
    emit_balance_changed(custody, publisher, &user).await;

    Ok(view)
}

/// 2. 클레임
pub async fn handle_claim(
    cmd: ClaimCommand,
    store: &impl AuctionStore,
    custody: &impl CustodyClient,
    publisher: &impl EventPublisher,
    policy: &BiddingPolicy,
) -> Result<AuctionView, AuctionError> {
    info!("{:<12} --> 클레임 요청 처리 시작: {:?}", "Command", cmd);
    let user = require_user(store, cmd.user_id).await?;

    let auction = store
        .find_auction(cmd.auction_id)
        .await?
        .ok_or(AuctionError::AuctionNotFound)?;
    check_claim_window(&auction, Utc::now())?;

    // 낙찰권 안에 사용자 입찰이 있어야 함
    let sorted_bids =
        get_sorted_auction_bids(store, auction.id, Some(i64::from(auction.number_of_winners)))
            .await?;
    let winning_bid_id = winning_bids(&sorted_bids, auction.number_of_winners)
        .iter()
        .find(|bid| bid.user_id == user.id)
        .map(|bid| bid.id)
        .ok_or(AuctionError::BidNotFound)?;
    let winning_bid = store
        .find_bid(winning_bid_id)
        .await?
        .ok_or(AuctionError::BidNotFound)?;

    if winning_bid.claim_transaction_id.is_some() {
        return Err(AuctionError::AlreadyClaimed);
    }

    let balance = custody.get_user_balance(&user.public_address).await?;
    if !is_balance_sufficient_for_payment(winning_bid.value, balance) {
        return Err(AuctionError::InsufficientFunds);
    }

    // 이체 전에 입찰 선점 (동시 클레임은 하나만 통과)
    let marker = claim_marker();
    if !store.reserve_claim(winning_bid.id, &marker).await? {
        warn!(
            "{:<12} --> 진행 중인 클레임 존재: auction={}, bid={}",
            "Command", auction.id, winning_bid.id
        );
        return Err(AuctionError::AlreadyClaimed);
    }

    if let Err(e) = pay_winning_bid(store, custody, policy, &user, &winning_bid, &marker).await {
        error!(
            "{:<12} --> 클레임 실패: auction={}, user={}, error={}",
            "Command", auction.id, user.id, e
        );
        return Err(AuctionError::ClaimFailed);
    }

    let payout = store
        .create_payout(auction.id, user.id, &user.public_address)
        .await?;
    perform_payout(store, payout).await?;

    // 경매 자체는 바뀌지 않으므로 AuctionUpdated 는 발행하지 않음
    let view = build_auction_view(store, auction, Some(user.id), Utc::now()).await?;
    emit_balance_changed(custody, publisher, &user).await;
    Ok(view)
}

/// 지급 처리
pub async fn perform_payout(
    store: &impl AuctionStore,
    payout: Payout,
) -> Result<Payout, AppError> {
    let processed = store.mark_payout_processed(payout.id, Utc::now()).await?;
    info!(
        "{:<12} --> 지급 처리 완료: payout={}, auction={}, user={}, status={}",
        "Command",
        processed.id,
        processed.auction_id,
        processed.user_id,
        processed.status.as_str()
    );
    Ok(processed)
}

// endregion: --- Commands

// region:    --- Helpers
async fn require_user(
    store: &impl AuctionStore,
    user_id: Option<i64>,
) -> Result<User, AuctionError> {
    let user_id = user_id.ok_or(AuctionError::UserNotFound)?;
    store
        .find_user(user_id)
        .await?
        .ok_or(AuctionError::UserNotFound)
}

/// 입찰 수수료 이체, 수수료가 0 이면 건너뜀
async fn charge_bid_fee(
    custody: &impl CustodyClient,
    policy: &BiddingPolicy,
    user: &User,
    bid_fee: rust_decimal::Decimal,
) -> Result<Option<String>, AuctionError> {
    if bid_fee.is_zero() {
        return Ok(None);
    }

    match custody
        .internal_transfer(
            &user.public_address,
            &policy.system_user_id,
            bid_fee,
            TransactionType::Bid,
        )
        .await
    {
        Ok(receipt) => match receipt.transaction_id() {
            Some(id) => Ok(Some(id.to_string())),
            None => {
                error!(
                    "{:<12} --> 수수료 이체 응답에 트랜잭션 id 없음: user={}",
                    "Command", user.id
                );
                Err(AuctionError::BidFailed)
            }
        },
        Err(e) => {
            error!(
                "{:<12} --> 수수료 이체 실패: user={}, error={}",
                "Command", user.id, e
            );
            Err(AuctionError::BidFailed)
        }
    }
}

/// 클레임 예약 표시
pub const CLAIM_PENDING_PREFIX: &str = "PENDING-";

fn claim_marker() -> String {
    format!("{}{}", CLAIM_PENDING_PREFIX, Uuid::new_v4())
}

/// 낙찰 대금 이체 후 예약 표시를 트랜잭션 id 로 교체
/// 이체 요청 자체가 실패하면 예약을 풀고, 그 이후의 실패는 예약을 남긴다.
async fn pay_winning_bid(
    store: &impl AuctionStore,
    custody: &impl CustodyClient,
    policy: &BiddingPolicy,
    user: &User,
    bid: &AuctionBid,
    marker: &str,
) -> Result<String, AppError> {
    let receipt = match custody
        .internal_transfer(
            &user.public_address,
            &policy.system_user_id,
            bid.value,
            TransactionType::Payout,
        )
        .await
    {
        Ok(receipt) => receipt,
        Err(e) => {
            if let Err(release_err) = store.release_claim(bid.id, marker).await {
                error!(
                    "{:<12} --> 클레임 예약 해제 실패: bid={}, error={}",
                    "Command", bid.id, release_err
                );
            }
            return Err(e);
        }
    };

    let transaction_id = receipt
        .transaction_id()
        .ok_or_else(|| {
            AppError::Custody(format!("Transaction error, bid {} stays reserved", bid.id))
        })?
        .to_string();

    if !store
        .set_claim_transaction(bid.id, marker, &transaction_id)
        .await?
    {
        return Err(AppError::Custody(format!(
            "claim reservation of bid {} was lost, transaction {}",
            bid.id, transaction_id
        )));
    }

    verify_positive_balance(custody, &user.public_address).await?;
    Ok(transaction_id)
}

async fn publish(publisher: &impl EventPublisher, event: AuctionEvent) {
    if let Err(e) = publisher.publish(&event).await {
        error!(
            "{:<12} --> 이벤트 발행 실패: channel={}, error={}",
            "Command",
            event.channel(),
            e
        );
    }
}

/// 잔액 변경 알림
pub async fn emit_balance_changed(
    custody: &impl CustodyClient,
    publisher: &impl EventPublisher,
    user: &User,
) {
    match custody.get_user_balance(&user.public_address).await {
        Ok(balance) => {
            publish(publisher, AuctionEvent::BalanceChanged {
                user_id: user.id,
                balance,
            })
            .await
        }
        Err(e) => warn!(
            "{:<12} --> 잔액 조회 실패로 알림 생략: user={}, error={}",
            "Command", user.id, e
        ),
    }
}

// endregion: --- Helpers
