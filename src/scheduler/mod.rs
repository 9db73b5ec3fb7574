//! 경매 만료 알림 스케줄러
//! 주기마다 직전 구간에 만료된 경매를 찾아 AuctionUpdated 를 발행한다.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::error::Result;
use crate::message_broker::EventPublisher;
use crate::query::handlers::build_auction_view;
use crate::store::AuctionStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Auction Scheduler
pub struct AuctionScheduler<S, P> {
    store: Arc<S>,
    publisher: Arc<P>,
    period: Duration,
}

impl<S, P> AuctionScheduler<S, P>
where
    S: AuctionStore + 'static,
    P: EventPublisher + 'static,
{
    pub fn new(store: Arc<S>, publisher: Arc<P>, period_secs: u64) -> Self {
        Self {
            store,
            publisher,
            period: Duration::from_secs(period_secs.max(1)),
        }
    }

    /// 스케줄러 시작
    pub fn start(&self) {
        let store = Arc::clone(&self.store);
        let publisher = Arc::clone(&self.publisher);
        let period = self.period;
        tokio::spawn(async move {
            let mut ticker = interval(period);
            let mut last_tick = Utc::now();
            loop {
                ticker.tick().await;
                let now = Utc::now();
                match Self::announce_expired(&*store, &*publisher, last_tick, now).await {
                    Ok(_) => last_tick = now,
                    Err(e) => error!(
                        "{:<12} --> 만료 경매 알림 중 오류 발생: {:?}",
                        "Scheduler", e
                    ),
                }
            }
        });
    }

    /// from < expires_at <= to 인 경매에 대해 AuctionUpdated 발행, 발행 건수 반환
    /// 개별 경매의 실패는 로그만 남기고 다음 경매로 넘어간다.
    pub async fn announce_expired(
        store: &S,
        publisher: &P,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<usize> {
        let expired = store.auctions_expired_between(from, to).await?;
        let total = expired.len();
        let mut published = 0;

        for auction in expired {
            let auction_id = auction.id;
            let view = match build_auction_view(store, auction, None, to).await {
                Ok(view) => view,
                Err(e) => {
                    error!(
                        "{:<12} --> 경매 뷰 생성 실패: id={}, error={:?}",
                        "Scheduler", auction_id, e
                    );
                    continue;
                }
            };
            match publisher
                .publish(&AuctionEvent::AuctionUpdated { auction: view })
                .await
            {
                Ok(()) => {
                    published += 1;
                    info!("{:<12} --> 경매 만료 알림: id={}", "Scheduler", auction_id);
                }
                Err(e) => error!(
                    "{:<12} --> 경매 만료 알림 발행 실패: id={}, error={:?}",
                    "Scheduler", auction_id, e
                ),
            }
        }

        debug!(
            "{:<12} --> 만료 경매 {}건 중 {}건 알림",
            "Scheduler", total, published
        );
        Ok(published)
    }
}
// endregion: --- Auction Scheduler
