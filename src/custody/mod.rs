//! 커스터디(수탁) 잔액 서비스 클라이언트
//! 잔액 조회와 내부 이체만 사용한다.
// region:    --- Imports
use crate::config::Config;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// 입찰 수수료
    Bid,
    /// 낙찰 대금
    Payout,
}

/// 내부 이체 결과
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferReceipt {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl TransferReceipt {
    /// 비어 있지 않은 트랜잭션 id
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: Decimal,
}

#[derive(Debug, Serialize)]
struct InternalTransferRequest<'a> {
    user_id: &'a str,
    to_user_id: &'a str,
    amount: Decimal,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
}

// endregion: --- Types

// region:    --- Custody Client Trait
#[async_trait]
pub trait CustodyClient: Send + Sync {
    async fn get_user_balance(&self, public_address: &str) -> Result<Decimal>;

    async fn internal_transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        transaction_type: TransactionType,
    ) -> Result<TransferReceipt>;
}

/// 잔액이 음수이면 오류
pub async fn verify_positive_balance(
    custody: &impl CustodyClient,
    public_address: &str,
) -> Result<()> {
    let balance = custody.get_user_balance(public_address).await?;
    if balance < Decimal::ZERO {
        error!(
            "{:<12} --> 음수 잔액 감지: address={}, balance={}",
            "Custody", public_address, balance
        );
        return Err(AppError::Custody(format!(
            "negative balance for {}: {}",
            public_address, balance
        )));
    }
    Ok(())
}

// endregion: --- Custody Client Trait

// region:    --- HTTP Custody Client
#[derive(Debug, Clone)]
pub struct HttpCustodyClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl HttpCustodyClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.custody_api_url, &config.custody_api_key)
    }
}

#[async_trait]
impl CustodyClient for HttpCustodyClient {
    async fn get_user_balance(&self, public_address: &str) -> Result<Decimal> {
        let response = self
            .http
            .get(format!("{}/balance/{}", self.base_url, public_address))
            .header("X-API-KEY", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Custody(format!(
                "balance request failed with status {}",
                response.status()
            )));
        }

        let body: BalanceResponse = response.json().await?;
        Ok(body.balance)
    }

    async fn internal_transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        transaction_type: TransactionType,
    ) -> Result<TransferReceipt> {
        info!(
            "{:<12} --> 내부 이체 요청: from={}, to={}, amount={}, type={:?}",
            "Custody", from, to, amount, transaction_type
        );
        let response = self
            .http
            .post(format!("{}/transfer/internal", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .json(&InternalTransferRequest {
                user_id: from,
                to_user_id: to,
                amount,
                transaction_type,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Custody(format!(
                "transfer failed with status {}: {}",
                status, body
            )));
        }

        Ok(response.json::<TransferReceipt>().await?)
    }
}

// endregion: --- HTTP Custody Client
