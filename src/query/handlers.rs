// region:    --- Imports
use crate::auction::model::{Auction, AuctionView, RankedBid};
use crate::bidding::rules::{rank_bids, winning_bids};
use crate::error::Result;
use crate::store::AuctionStore;
use chrono::{DateTime, Utc};
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// 경매 목록 조회 (id 가 있으면 해당 경매만)
pub async fn get_auctions(
    store: &impl AuctionStore,
    auction_id: Option<i64>,
    user_id: Option<i64>,
) -> Result<Vec<AuctionView>> {
    info!("{:<12} --> 경매 조회 id: {:?}", "Query", auction_id);
    let auctions = match auction_id {
        Some(id) => store.find_auction(id).await?.into_iter().collect(),
        None => store.list_auctions().await?,
    };

    let now = Utc::now();
    let mut views = Vec::with_capacity(auctions.len());
    for auction in auctions {
        views.push(build_auction_view(store, auction, user_id, now).await?);
    }
    Ok(views)
}

/// 정렬된 입찰 조회 (순위 포함)
pub async fn get_sorted_auction_bids(
    store: &impl AuctionStore,
    auction_id: i64,
    limit: Option<i64>,
) -> Result<Vec<RankedBid>> {
    let bids = store.sorted_bids(auction_id, limit).await?;
    Ok(rank_bids(bids))
}

/// 경매 뷰 생성
pub async fn build_auction_view(
    store: &impl AuctionStore,
    auction: Auction,
    user_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<AuctionView> {
    let bids = get_sorted_auction_bids(store, auction.id, None).await?;
    let winners = winning_bids(&bids, auction.number_of_winners).to_vec();
    let user_bid = user_id.and_then(|id| bids.iter().find(|bid| bid.user_id == id).cloned());

    Ok(AuctionView {
        has_started: auction.has_started(now),
        has_expired: auction.has_expired(now),
        auction,
        winners,
        user_bid,
    })
}

// endregion: --- Query Handlers
