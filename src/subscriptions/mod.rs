//! 실시간 구독
//!
//! `/subscriptions` WebSocket 으로 경매 이벤트를 전달한다.
//! 클라이언트는 채널을 구독한다:
//! ```json
//! { "action": "subscribe", "channel": "auctionUpdated" }
//! { "action": "subscribe", "channel": "balanceChanged", "user_id": 42 }
//! ```

use crate::auction::events::{AuctionEvent, AUCTION_UPDATED, BALANCE_CHANGED};
use crate::handlers::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const CHANNEL_CAPACITY: usize = 1000;
const HEARTBEAT_SECS: u64 = 30;

/// 프로세스 내 이벤트 팬아웃
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<AuctionEvent>,
}

impl Broadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// 구독자가 없으면 버림
    pub fn broadcast(&self, event: AuctionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuctionEvent> {
        self.tx.subscribe()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WsRequest {
    /// subscribe, unsubscribe, ping
    pub action: String,
    pub channel: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WsMessage {
    Subscribed { channel: String },
    Unsubscribed { channel: String },
    Event { channel: String, payload: AuctionEvent },
    Error { message: String },
    Pong,
}

/// 연결별 구독 상태
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub auction_updated: bool,
    pub balance_user_id: Option<i64>,
}

impl Subscription {
    pub fn matches(&self, event: &AuctionEvent) -> bool {
        match event {
            AuctionEvent::AuctionUpdated { .. } => self.auction_updated,
            AuctionEvent::BalanceChanged { user_id, .. } => self.balance_user_id == Some(*user_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.auction_updated && self.balance_user_id.is_none()
    }

    /// 요청을 반영하고 응답 메시지를 돌려준다
    pub fn apply(&mut self, request: &WsRequest) -> Option<WsMessage> {
        let channel = request.channel.as_deref().unwrap_or_default();
        match (request.action.as_str(), channel) {
            ("ping", _) => Some(WsMessage::Pong),
            ("subscribe", AUCTION_UPDATED) => {
                self.auction_updated = true;
                Some(WsMessage::Subscribed {
                    channel: channel.to_string(),
                })
            }
            ("subscribe", BALANCE_CHANGED) => match request.user_id {
                Some(user_id) => {
                    self.balance_user_id = Some(user_id);
                    Some(WsMessage::Subscribed {
                        channel: channel.to_string(),
                    })
                }
                None => Some(WsMessage::Error {
                    message: "user_id is required for balanceChanged".to_string(),
                }),
            },
            ("unsubscribe", AUCTION_UPDATED) => {
                self.auction_updated = false;
                Some(WsMessage::Unsubscribed {
                    channel: channel.to_string(),
                })
            }
            ("unsubscribe", BALANCE_CHANGED) => {
                self.balance_user_id = None;
                Some(WsMessage::Unsubscribed {
                    channel: channel.to_string(),
                })
            }
            (action, other) => Some(WsMessage::Error {
                message: format!("unsupported request: {} {}", action, other),
            }),
        }
    }
}

fn to_text(msg: &WsMessage) -> Message {
    Message::Text(serde_json::to_string(msg).unwrap_or_default())
}

/// GET /subscriptions
pub async fn subscriptions_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.broadcaster.clone()))
}

async fn handle_socket(socket: WebSocket, broadcaster: Broadcaster) {
    let (mut sender, mut receiver) = socket.split();
    let mut broadcast_rx = broadcaster.subscribe();
    let mut subscription = Subscription::default();
    let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_SECS));

    info!("{:<12} --> 새 구독 연결", "Subscription");

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                match result {
                    Ok(event) => {
                        if !subscription.matches(&event) {
                            continue;
                        }
                        let msg = WsMessage::Event {
                            channel: event.channel().to_string(),
                            payload: event,
                        };
                        if let Err(e) = sender.send(to_text(&msg)).await {
                            debug!("{:<12} --> 전송 실패: {}", "Subscription", e);
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("{:<12} --> 이벤트 {}건 누락", "Subscription", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            _ = heartbeat.tick() => {
                if let Err(e) = sender.send(Message::Ping(Vec::new())).await {
                    debug!("{:<12} --> heartbeat 실패: {}", "Subscription", e);
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<WsRequest>(&text) {
                            Ok(request) => subscription.apply(&request),
                            Err(e) => Some(WsMessage::Error { message: e.to_string() }),
                        };
                        if let Some(reply) = reply {
                            if sender.send(to_text(&reply)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        error!("{:<12} --> 수신 오류: {}", "Subscription", e);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("{:<12} --> 구독 연결 종료", "Subscription");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn request(action: &str, channel: Option<&str>, user_id: Option<i64>) -> WsRequest {
        WsRequest {
            action: action.to_string(),
            channel: channel.map(str::to_string),
            user_id,
        }
    }

    fn balance_event(user_id: i64) -> AuctionEvent {
        AuctionEvent::BalanceChanged {
            user_id,
            balance: Decimal::ONE,
        }
    }

    #[test]
    fn balance_events_only_reach_their_user() {
        let mut subscription = Subscription::default();
        assert!(subscription.is_empty());
        assert!(!subscription.matches(&balance_event(1)));

        subscription.apply(&request("subscribe", Some(BALANCE_CHANGED), Some(1)));
        assert!(subscription.matches(&balance_event(1)));
        assert!(!subscription.matches(&balance_event(2)));

        subscription.apply(&request("unsubscribe", Some(BALANCE_CHANGED), None));
        assert!(subscription.is_empty());
    }

    #[test]
    fn balance_subscription_requires_user() {
        let mut subscription = Subscription::default();
        let reply = subscription.apply(&request("subscribe", Some(BALANCE_CHANGED), None));
        assert!(matches!(reply, Some(WsMessage::Error { .. })));
        assert!(subscription.is_empty());
    }

    #[test]
    fn ping_and_unknown_actions() {
        let mut subscription = Subscription::default();
        assert!(matches!(
            subscription.apply(&request("ping", None, None)),
            Some(WsMessage::Pong)
        ));
        assert!(matches!(
            subscription.apply(&request("subscribe", Some("bids"), None)),
            Some(WsMessage::Error { .. })
        ));

        subscription.apply(&request("subscribe", Some(AUCTION_UPDATED), None));
        assert!(subscription.auction_updated);
    }

    #[tokio::test]
    async fn broadcaster_fans_out_to_every_receiver() {
        let broadcaster = Broadcaster::new();
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();

        broadcaster.broadcast(balance_event(3));

        assert!(matches!(first.recv().await, Ok(AuctionEvent::BalanceChanged { user_id: 3, .. })));
        assert!(matches!(second.recv().await, Ok(AuctionEvent::BalanceChanged { user_id: 3, .. })));
    }
}
