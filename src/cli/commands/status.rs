//! Status command implementation
//!
//! Shows the stored checkpoint and the time window the next export would
//! scan. Only the checkpoint store is touched.

use crate::adapters::factory::create_checkpoint_storage;
use crate::config::resolve_config;
use crate::core::state::{Checkpoint, Cutoff, StateManager};
use chrono::{DateTime, Utc};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: Option<&str>) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        println!("📊 Export Status");
        println!();

        let config = match resolve_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let storage = create_checkpoint_storage(&config);
        println!("Checkpoint location: {}", storage.location());

        let stored = match storage.read().await {
            Ok(stored) => stored,
            Err(e) => {
                println!("⚠️  Checkpoint unreadable, the next run ignores it");
                println!("   Error: {e}");
                None
            }
        };

        let now = Utc::now();
        match stored {
            Some(last_run) => {
                println!("Last run: {}", last_run.to_rfc3339());
                println!("Age: {}", describe_age(last_run, now));
            }
            None => println!("Last run: never"),
        }

        let state_manager = StateManager::new_with_storage(storage);
        let cutoff = state_manager
            .resolve_cutoff(config.export.initial_run, config.export.lookback(), now)
            .await;

        println!("Next run window: {}", describe_cutoff(&cutoff));
        println!();

        Ok(0)
    }
}

fn describe_cutoff(cutoff: &Cutoff) -> String {
    match cutoff {
        Cutoff::FullScan => "entire collection (initial run)".to_string(),
        Cutoff::Checkpoint(ts) => format!("records updated after {}", ts.to_rfc3339()),
        Cutoff::Lookback(ts) => {
            format!("records updated after {} (lookback)", ts.to_rfc3339())
        }
    }
}

fn describe_age(last_run: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = Checkpoint::new(last_run).age(now);
    if age.num_seconds() < 0 {
        return "in the future".to_string();
    }

    let hours = age.num_hours();
    let minutes = age.num_minutes() % 60;
    if hours >= 48 {
        format!("{}d {}h", hours / 24, hours % 24)
    } else {
        format!("{hours}h {minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_describe_cutoff() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        assert_eq!(
            describe_cutoff(&Cutoff::FullScan),
            "entire collection (initial run)"
        );
        assert!(describe_cutoff(&Cutoff::Checkpoint(ts)).contains("2024-03-01T10:00:00"));
        assert!(describe_cutoff(&Cutoff::Lookback(ts)).ends_with("(lookback)"));
    }

    #[test]
    fn test_describe_age() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();

        assert_eq!(describe_age(now - Duration::minutes(90), now), "1h 30m");
        assert_eq!(describe_age(now - Duration::hours(75), now), "3d 3h");
        assert_eq!(describe_age(now + Duration::hours(1), now), "in the future");
    }
}
