//! 프로세스 설정 저장소와 체인 처리 커서
// region:    --- Imports
use crate::error::Result;
use crate::store::AuctionStore;
use tracing::{error, warn};

// endregion: --- Imports

/// 마지막으로 처리한 블록 번호 설정 키
pub const CONFIG_LAST_PROCESSED_BLOCK: &str = "lastProcessedBlock";

// region:    --- Settings
/// 설정 값 조회, 없으면 default
pub async fn get_config_value(
    store: &impl AuctionStore,
    key: &str,
    default: Option<&str>,
) -> Result<Option<String>> {
    Ok(store
        .get_setting(key)
        .await?
        .or_else(|| default.map(str::to_string)))
}

pub async fn set_config_value(store: &impl AuctionStore, key: &str, value: &str) -> Result<()> {
    store.set_setting(key, value).await
}

// endregion: --- Settings

// region:    --- Last Block
/// 저장 실패는 로그만 남긴다
pub async fn set_last_processed_block(store: &impl AuctionStore, block_number: u64) {
    if let Err(e) =
        set_config_value(store, CONFIG_LAST_PROCESSED_BLOCK, &block_number.to_string()).await
    {
        error!(
            "{:<12} --> 마지막 블록 저장 실패: block={}, error={}",
            "Chain", block_number, e
        );
    }
}

/// 값이 없거나 숫자가 아니면 0
pub async fn get_last_processed_block(store: &impl AuctionStore) -> Result<u64> {
    let value = get_config_value(store, CONFIG_LAST_PROCESSED_BLOCK, None).await?;
    Ok(match value {
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            warn!("{:<12} --> 잘못된 블록 번호 설정값: {}", "Chain", raw);
            0
        }),
        None => 0,
    })
}

// endregion: --- Last Block
