use crate::error::{AppError, Result};
use std::str::FromStr;
use uuid::Uuid;

pub const DEFAULT_KAFKA_BROKERS: &str = "localhost:9092";
/// KAFKA_GROUP_ID 가 없으면 인스턴스마다 이 접두사 + uuid 로 그룹을 만든다
pub const KAFKA_GROUP_ID_PREFIX: &str = "auction-events";
pub const DEFAULT_EVENTS_TOPIC: &str = "auction-events";
pub const DEFAULT_CUSTODY_API_URL: &str = "http://localhost:8080";

/// 입찰 시 남은 시간이 이 값보다 짧으면 만료 시간을 연장한다 (초).
pub const DEFAULT_BID_EXTENSION_SECS: i64 = 10;

/// 경매 만료 알림 스케줄러 주기 (초).
pub const DEFAULT_SCHEDULER_INTERVAL_SECS: u64 = 1;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    /// 기동 시 테이블 재생성 여부 (DB_RECREATE)
    pub db_recreate: bool,
    pub kafka_brokers: String,
    pub kafka_group_id: String,
    pub events_topic: String,
    pub custody_api_url: String,
    pub custody_api_key: String,
    /// 입찰 수수료와 낙찰 대금을 받는 커스터디 시스템 계정 (SYSTEM_USER_ID)
    pub system_user_id: String,
    pub bid_extension_secs: i64,
    pub scheduler_interval_secs: u64,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| AppError::Config("DATABASE_URL must be set".to_string()))?,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 5)?,
            db_recreate: std::env::var("DB_RECREATE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            kafka_brokers: std::env::var("KAFKA_BROKERS")
                .unwrap_or_else(|_| DEFAULT_KAFKA_BROKERS.to_string()),
            kafka_group_id: std::env::var("KAFKA_GROUP_ID")
                .unwrap_or_else(|_| instance_group_id()),
            events_topic: std::env::var("EVENTS_TOPIC")
                .unwrap_or_else(|_| DEFAULT_EVENTS_TOPIC.to_string()),
            custody_api_url: std::env::var("CUSTODY_API_URL")
                .unwrap_or_else(|_| DEFAULT_CUSTODY_API_URL.to_string()),
            custody_api_key: std::env::var("CUSTODY_API_KEY").unwrap_or_default(),
            system_user_id: std::env::var("SYSTEM_USER_ID")
                .map_err(|_| AppError::Config("SYSTEM_USER_ID must be set".to_string()))?,
            bid_extension_secs: parse_env("BID_EXTENSION_SECS", DEFAULT_BID_EXTENSION_SECS)?,
            scheduler_interval_secs: parse_env(
                "SCHEDULER_INTERVAL_SECS",
                DEFAULT_SCHEDULER_INTERVAL_SECS,
            )?,
            api_port: parse_env("API_PORT", 3000)?,
        })
    }
}

/// 모든 인스턴스가 전체 이벤트를 받도록 인스턴스별 컨슈머 그룹
pub fn instance_group_id() -> String {
    format!("{}-{}", KAFKA_GROUP_ID_PREFIX, Uuid::new_v4())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    parse_value(key, std::env::var(key).ok().as_deref(), default)
}

/// 값이 없으면 기본값, 있는데 형식이 틀리면 오류
fn parse_value<T: FromStr>(key: &str, raw: Option<&str>, default: T) -> Result<T> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_settings_fall_back_only_when_unset() {
        assert_eq!(parse_value::<u32>("DB_MAX_CONNECTIONS", None, 5).unwrap(), 5);
        assert_eq!(parse_value::<u32>("DB_MAX_CONNECTIONS", Some(" 12 "), 5).unwrap(), 12);
        assert_eq!(parse_value::<u16>("API_PORT", Some(""), 3000).unwrap(), 3000);
    }

    #[test]
    fn malformed_numeric_settings_are_rejected() {
        for (key, raw) in [
            ("DB_MAX_CONNECTIONS", "five"),
            ("BID_EXTENSION_SECS", "10s"),
            ("SCHEDULER_INTERVAL_SECS", "-1"),
        ] {
            let err = parse_value::<u64>(key, Some(raw), 1).unwrap_err();
            assert!(matches!(err, AppError::Config(ref msg) if msg.contains(key)));
        }
        assert!(parse_value::<u16>("API_PORT", Some("70000"), 3000).is_err());
    }

    #[test]
    fn each_instance_gets_its_own_consumer_group() {
        let first = instance_group_id();
        let second = instance_group_id();
        assert!(first.starts_with(KAFKA_GROUP_ID_PREFIX));
        assert_ne!(first, second);
    }
}
