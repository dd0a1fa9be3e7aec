//! Kafka publisher adapter

pub mod dry_run;
pub mod producer;

pub use dry_run::DryRunPublisher;
pub use producer::{producer_config, DeliveryReporter, KafkaPublisher};
