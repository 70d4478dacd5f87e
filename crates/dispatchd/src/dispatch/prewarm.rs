//! Prewarm pings: detection, counting and acknowledgement.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Reserved event key marking a prewarm ping.
pub const PREWARM_KEY: &str = "_prewarm";

/// Process-wide count of prewarm pings served.
#[derive(Debug, Default)]
pub struct PrewarmCounter {
    served: AtomicU64,
}

impl PrewarmCounter {
    /// Builds a counter starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            served: AtomicU64::new(0),
        }
    }

    /// Records one prewarm ping and returns the new total.
    pub fn increment(&self) -> u64 {
        self.served.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }

    /// Number of prewarm pings served so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }
}

pub(super) fn is_prewarm(event: &Value) -> bool {
    event
        .as_object()
        .is_some_and(|fields| fields.contains_key(PREWARM_KEY))
}

/// Builds the `{"prewarmed_at":"..."}` acknowledgement payload.
pub(super) fn acknowledgement() -> String {
    let now = OffsetDateTime::now_utc();
    let timestamp = now
        .format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    format!(r#"{{"prewarmed_at":"{timestamp}"}}"#)
}
