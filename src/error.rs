use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Custody error: {0}")]
    Custody(String),

    #[error("Message broker error: {0}")]
    Broker(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        error!("{:<12} --> 내부 오류: {}", "Error", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": "Internal server error",
                "code": "INTERNAL",
            })),
        )
            .into_response()
    }
}

/// 입찰/클레임 비즈니스 규칙 위반
#[derive(Debug, Error)]
pub enum AuctionError {
    #[error("User not found")]
    UserNotFound,

    #[error("Auction not found")]
    AuctionNotFound,

    #[error("Auction not started yet")]
    NotStarted,

    #[error("Auction expired")]
    Expired,

    #[error("Auction not expired yet")]
    NotExpiredYet,

    #[error("Can not claim after the max claim date")]
    ClaimWindowClosed,

    #[error("Can not find the bid")]
    BidNotFound,

    #[error("Already claimed")]
    AlreadyClaimed,

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Could not place the bid")]
    BidFailed,

    #[error("Could not make a claim")]
    ClaimFailed,

    #[error("Max retries exceeded")]
    MaxRetriesExceeded,

    #[error(transparent)]
    Internal(#[from] AppError),
}

impl AuctionError {
    pub fn code(&self) -> &'static str {
        match self {
            AuctionError::UserNotFound => "USER_NOT_FOUND",
            AuctionError::AuctionNotFound => "AUCTION_NOT_FOUND",
            AuctionError::NotStarted => "NOT_STARTED",
            AuctionError::Expired => "ALREADY_ENDED",
            AuctionError::NotExpiredYet => "NOT_EXPIRED",
            AuctionError::ClaimWindowClosed => "CLAIM_WINDOW_CLOSED",
            AuctionError::BidNotFound => "BID_NOT_FOUND",
            AuctionError::AlreadyClaimed => "ALREADY_CLAIMED",
            AuctionError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            AuctionError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            AuctionError::BidFailed => "BID_FAILED",
            AuctionError::ClaimFailed => "CLAIM_FAILED",
            AuctionError::MaxRetriesExceeded => "MAX_RETRIES_EXCEEDED",
            AuctionError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuctionError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuctionError::AuctionNotFound => StatusCode::NOT_FOUND,
            AuctionError::MaxRetriesExceeded => StatusCode::CONFLICT,
            AuctionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AuctionError {
    fn into_response(self) -> axum::response::Response {
        if let AuctionError::Internal(e) = self {
            return e.into_response();
        }
        let status = self.status();
        (
            status,
            Json(serde_json::json!({
                "error": self.to_string(),
                "code": self.code(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_violations_map_to_client_errors() {
        assert_eq!(AuctionError::AlreadyClaimed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuctionError::UserNotFound.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuctionError::AuctionNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AuctionError::Internal(AppError::Custody("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_are_client_facing() {
        assert_eq!(AuctionError::NotExpiredYet.to_string(), "Auction not expired yet");
        assert_eq!(
            AuctionError::ClaimWindowClosed.to_string(),
            "Can not claim after the max claim date"
        );
        assert_eq!(AuctionError::ClaimFailed.code(), "CLAIM_FAILED");
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = AuctionError::Internal(AppError::Broker("kafka down".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
