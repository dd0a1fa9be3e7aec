//! MongoDB source adapter

pub mod client;

pub use client::{cutoff_filter, MongoRecordSource};
