//! Output format of the server's own log records.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Layout of the server log records written into each request's captured
/// output, next to whatever the handler printed.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per record, so the invoker can pick server records
    /// out of the captured log.
    #[default]
    Json,
    /// Plain single-line records for reading the log file by eye.
    Compact,
}
