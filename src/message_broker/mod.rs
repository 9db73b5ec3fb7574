// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::config::Config;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, warn};

const INIT_TOPIC: &str = "init-topic";
const INIT_MESSAGE: &[u8] = b"init-message";

// endregion: --- Imports

fn client_config(brokers: &str) -> ClientConfig {
    let mut config = ClientConfig::new();
    config.set("bootstrap.servers", brokers);
    config
}

/// 메시지 페이로드를 경매 이벤트로 변환
pub fn decode_event(payload: Option<&[u8]>) -> Option<AuctionEvent> {
    let Some(payload) = payload else {
        warn!("{:<12} --> 빈 페이로드 수신", "Consumer");
        return None;
    };
    match serde_json::from_slice::<AuctionEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            error!("{:<12} --> deserialize 오류: {:?}", "Consumer", e);
            None
        }
    }
}

// region:    --- Event Publisher
/// 경매 이벤트 발행 트레이트
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &AuctionEvent) -> Result<()>;
}

// endregion: --- Event Publisher

// region:    --- Kafka Producer
#[derive(Clone)]
pub struct KafkaProducer {
    producer: Arc<FutureProducer>,
    topic: String,
}

/// KafkaProducer 구현
impl KafkaProducer {
    pub fn new(brokers: &str, topic: &str) -> Result<Self> {
        let producer: FutureProducer = client_config(brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| AppError::Broker(format!("Producer creation error: {:?}", e)))?;

        Ok(KafkaProducer {
            producer: Arc::new(producer),
            topic: topic.to_string(),
        })
    }

    /// 메시지 전송
    pub async fn send_message(&self, topic: &str, key: &str, value: &str) -> Result<()> {
        info!(
            "{:<12} --> Kafka 메시지 전송: topic={}, key={}",
            "Producer", topic, key
        );
        let record = FutureRecord::to(topic).key(key).payload(value);

        self.producer
            .send(record, Duration::from_secs(0))
            .await
            .map_err(|(e, _)| AppError::Broker(format!("Error sending message: {:?}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl EventPublisher for KafkaProducer {
    async fn publish(&self, event: &AuctionEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        self.send_message(&self.topic, &event.key(), &payload).await
    }
}

// endregion: --- Kafka Producer

// region:    --- Kafka Consumer
pub struct KafkaConsumer {
    consumer: Arc<StreamConsumer>,
}

/// KafkaConsumer 구현
impl KafkaConsumer {
    pub fn new(brokers: &str, group_id: &str) -> Result<Self> {
        let consumer: StreamConsumer = client_config(brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            // 구독은 실시간 알림이므로 과거 이벤트는 재생하지 않음
            .set("auto.offset.reset", "latest")
            .set("session.timeout.ms", "6000")
            .set("allow.auto.create.topics", "true")
            .create()
            .map_err(|e| AppError::Broker(format!("Consumer creation failed: {:?}", e)))?;

        Ok(KafkaConsumer {
            consumer: Arc::new(consumer),
        })
    }

    /// 이벤트 소비
    pub async fn consume_events<F, Fut>(&self, topic: &str, handler: F) -> Result<()>
    where
        F: Fn(AuctionEvent) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        info!("{:<12} --> Kafka 이벤트 소비 시작: topic={}", "Consumer", topic);
        self.consumer
            .subscribe(&[topic])
            .map_err(|e| AppError::Broker(e.to_string()))?;

        loop {
            match self.consumer.recv().await {
                Ok(message) => {
                    debug!(
                        "{:<12} --> 메시지 수신: topic={}, partition={}, offset={}",
                        "Consumer",
                        message.topic(),
                        message.partition(),
                        message.offset()
                    );

                    let Some(event) = decode_event(message.payload()) else {
                        continue;
                    };
                    if let Err(e) = handler(event).await {
                        error!("{:<12} --> Kafka 이벤트 처리 오류: {:?}", "Consumer", e);
                    }
                }
                Err(e) => error!("{:<12} --> 메시지 수신 오류: {:?}", "Consumer", e),
            }
        }
    }
}

// endregion: --- Kafka Consumer

// region:    --- Kafka Manager
pub struct KafkaManager {
    producer: Arc<KafkaProducer>,
    consumer: Arc<KafkaConsumer>,
    brokers: String,
}

/// KafkaManager 구현
impl KafkaManager {
    pub fn new(config: &Config) -> Result<Self> {
        let producer = Arc::new(KafkaProducer::new(
            &config.kafka_brokers,
            &config.events_topic,
        )?);
        let consumer = Arc::new(KafkaConsumer::new(
            &config.kafka_brokers,
            &config.kafka_group_id,
        )?);

        Ok(KafkaManager {
            producer,
            consumer,
            brokers: config.kafka_brokers.clone(),
        })
    }

    /// 프로듀서 반환
    pub fn get_producer(&self) -> Arc<KafkaProducer> {
        Arc::clone(&self.producer)
    }

    /// 컨슈머 반환
    pub fn get_consumer(&self) -> Arc<KafkaConsumer> {
        Arc::clone(&self.consumer)
    }

    /// Kafka 초기화 (초기화 메시지 왕복 확인)
    pub async fn initialize(&self) -> Result<()> {
        info!("{:<12} --> Kafka 초기화 시작", "Manager");

        self.consumer
            .consumer
            .subscribe(&[INIT_TOPIC])
            .map_err(|e| AppError::Broker(e.to_string()))?;

        self.producer
            .send_message(INIT_TOPIC, "init-key", "init-message")
            .await?;

        let max_attempts = 10;
        let mut attempts = 0;
        while attempts < max_attempts {
            match time::timeout(Duration::from_secs(1), self.consumer.consumer.recv()).await {
                Ok(Ok(message)) => {
                    if message.payload() == Some(INIT_MESSAGE) {
                        info!("{:<12} --> Kafka 초기화 메시지 수신 확인", "Manager");
                        self.consumer.consumer.unsubscribe();
                        return Ok(());
                    }
                }
                Ok(Err(e)) => error!(
                    "{:<12} --> Kafka 초기화 메시지 수신 오류: {:?}",
                    "Manager", e
                ),
                Err(_) => {
                    attempts += 1;
                    warn!(
                        "{:<12} --> Kafka 초기화 메시지 수신 대기 중... (시도: {}/{})",
                        "Manager", attempts, max_attempts
                    );
                }
            }
        }

        Err(AppError::Broker("Kafka 초기화 메시지 수신 실패".to_string()))
    }

    /// 토픽 생성
    pub async fn create_topic(
        &self,
        topic_name: &str,
        num_partitions: i32,
        replication_factor: i32,
    ) -> Result<()> {
        info!("{:<12} --> Kafka 토픽 생성 시작: {}", "Manager", topic_name);

        let admin_client: AdminClient<DefaultClientContext> = client_config(&self.brokers)
            .create()
            .map_err(|e| AppError::Broker(format!("AdminClient 생성 실패: {:?}", e)))?;

        let new_topic = NewTopic::new(
            topic_name,
            num_partitions,
            TopicReplication::Fixed(replication_factor),
        );

        match admin_client
            .create_topics(&[new_topic], &AdminOptions::new())
            .await
        {
            Ok(_) => {
                info!("{:<12} --> Kafka 토픽 생성 완료: {}", "Manager", topic_name);
                Ok(())
            }
            Err(e) => {
                error!("{:<12} --> Kafka 토픽 생성 실패: {:?}", "Manager", e);
                Err(AppError::Broker(format!("토픽 생성 실패: {:?}", e)))
            }
        }
    }
}

// endregion: --- Kafka Manager
