//! Kafka publisher backed by librdkafka

use crate::adapters::traits::Publisher;
use crate::config::{BrokerConfig, MAX_BATCH_SIZE};
use crate::domain::{BrokerError, ExportError, Result};
use async_trait::async_trait;
use rdkafka::client::ClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::message::Message;
use rdkafka::producer::{BaseRecord, DeliveryResult, Producer, ProducerContext, ThreadedProducer};
use rdkafka::util::Timeout;
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// librdkafka default for `queue.buffering.max.messages`
const DEFAULT_QUEUE_MESSAGES: usize = 100_000;

/// librdkafka upper bound for `queue.buffering.max.messages`
const MAX_QUEUE_MESSAGES: usize = 10_000_000;

/// Producer context that counts delivery outcomes
///
/// librdkafka calls `delivery` from its polling thread once per message.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReporter {
    delivered: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl DeliveryReporter {
    /// Messages acknowledged by the broker
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Messages the broker reported as undeliverable
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl ClientContext for DeliveryReporter {}

impl ProducerContext for DeliveryReporter {
    type DeliveryOpaque = ();

    fn delivery(&self, result: &DeliveryResult<'_>, _opaque: Self::DeliveryOpaque) {
        match result {
            Ok(_) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err((err, message)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                let key = message
                    .key()
                    .map(|k| String::from_utf8_lossy(k).into_owned())
                    .unwrap_or_default();
                tracing::error!(
                    topic = message.topic(),
                    key = %key,
                    error = %err,
                    "Message delivery failed"
                );
            }
        }
    }
}

/// Build the producer configuration
///
/// The local queue always holds at least one full batch, so nothing between
/// two flushes is rejected as queue-full. Plaintext unless all three TLS
/// fields are configured.
pub fn producer_config(config: &BrokerConfig, batch_size: usize) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.brokers)
        .set("client.id", &config.client_id)
        .set(
            "batch.num.messages",
            batch_size.clamp(1, MAX_BATCH_SIZE).to_string(),
        )
        .set(
            "queue.buffering.max.messages",
            batch_size
                .clamp(DEFAULT_QUEUE_MESSAGES, MAX_QUEUE_MESSAGES)
                .to_string(),
        );

    if let Some(tls) = config.tls() {
        client_config
            .set("security.protocol", "ssl")
            .set("ssl.key.pem", tls.key_pem.expose_secret().as_str())
            .set("ssl.certificate.pem", &tls.certificate_pem)
            .set("ssl.ca.pem", &tls.ca_pem);
    }

    client_config
}

/// Fire-and-forget keyed publisher
pub struct KafkaPublisher {
    producer: Arc<ThreadedProducer<DeliveryReporter>>,
    reporter: DeliveryReporter,
}

impl KafkaPublisher {
    /// Create the producer
    ///
    /// Creation does not contact the brokers. Unreachable brokers show up as
    /// delivery failures and flush timeouts.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::ConnectionFailed` if librdkafka rejects the
    /// configuration.
    pub fn new(config: &BrokerConfig, batch_size: usize) -> Result<Self> {
        let reporter = DeliveryReporter::default();
        let producer: ThreadedProducer<DeliveryReporter> = producer_config(config, batch_size)
            .create_with_context(reporter.clone())
            .map_err(|e| BrokerError::ConnectionFailed(e.to_string()))?;

        tracing::info!(
            brokers = %config.brokers,
            client_id = %config.client_id,
            tls = config.tls().is_some(),
            "Kafka producer created"
        );

        Ok(Self {
            producer: Arc::new(producer),
            reporter,
        })
    }

    /// Messages acknowledged so far
    pub fn delivered(&self) -> u64 {
        self.reporter.delivered()
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    fn publish(&self, topic: &str, key: &str, value: &str) -> Result<()> {
        self.producer
            .send(BaseRecord::to(topic).key(key).payload(value))
            .map_err(|(e, _)| {
                ExportError::from(BrokerError::EnqueueFailed {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            })
    }

    async fn flush(&self, timeout: Duration) -> Result<()> {
        let producer = Arc::clone(&self.producer);
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| BrokerError::FlushFailed(format!("flush task aborted: {e}")))?
            .map_err(|e| ExportError::from(BrokerError::FlushFailed(e.to_string())))
    }

    fn delivery_failures(&self) -> u64 {
        self.reporter.failed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn broker_config() -> BrokerConfig {
        BrokerConfig {
            brokers: "kafka-1:9092,kafka-2:9092".to_string(),
            client_id: "afid-export".to_string(),
            topic: "afid-attributes".to_string(),
            flush_timeout_secs: 30,
            ssl_key_pem: None,
            ssl_certificate_pem: None,
            ssl_ca_pem: None,
        }
    }

    #[test]
    fn test_plaintext_producer_config() {
        let config = producer_config(&broker_config(), 250);

        assert_eq!(
            config.get("bootstrap.servers"),
            Some("kafka-1:9092,kafka-2:9092")
        );
        assert_eq!(config.get("client.id"), Some("afid-export"));
        assert_eq!(config.get("batch.num.messages"), Some("250"));
        assert_eq!(config.get("security.protocol"), None);
    }

    #[test]
    fn test_tls_producer_config() {
        let mut broker = broker_config();
        broker.ssl_key_pem = Some(secret_string("KEY".to_string()));
        broker.ssl_certificate_pem = Some("CERT".to_string());
        broker.ssl_ca_pem = Some("CA".to_string());

        let config = producer_config(&broker, 100);

        assert_eq!(config.get("security.protocol"), Some("ssl"));
        assert_eq!(config.get("ssl.key.pem"), Some("KEY"));
        assert_eq!(config.get("ssl.certificate.pem"), Some("CERT"));
        assert_eq!(config.get("ssl.ca.pem"), Some("CA"));
    }

    #[test]
    fn test_batch_num_messages_is_clamped() {
        let config = producer_config(&broker_config(), 5_000_000);
        assert_eq!(config.get("batch.num.messages"), Some("1000000"));
    }

    #[test]
    fn test_queue_holds_a_full_batch() {
        let small = producer_config(&broker_config(), 250);
        assert_eq!(small.get("queue.buffering.max.messages"), Some("100000"));

        let large = producer_config(&broker_config(), 200_000);
        assert_eq!(large.get("queue.buffering.max.messages"), Some("200000"));

        let largest = producer_config(&broker_config(), MAX_BATCH_SIZE);
        let queue: usize = largest
            .get("queue.buffering.max.messages")
            .unwrap()
            .parse()
            .unwrap();
        assert!(queue >= MAX_BATCH_SIZE);
    }

    #[test]
    fn test_blank_tls_fields_stay_plaintext() {
        let mut broker = broker_config();
        broker.ssl_key_pem = Some(secret_string(String::new()));
        broker.ssl_certificate_pem = Some(String::new());
        broker.ssl_ca_pem = Some(String::new());

        let config = producer_config(&broker, 100);
        assert_eq!(config.get("security.protocol"), None);
        assert_eq!(config.get("ssl.key.pem"), None);
    }

    #[test]
    fn test_delivery_reporter_starts_at_zero() {
        let reporter = DeliveryReporter::default();
        assert_eq!(reporter.delivered(), 0);
        assert_eq!(reporter.failed(), 0);
    }
}
