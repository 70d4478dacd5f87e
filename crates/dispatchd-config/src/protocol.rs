//! Policy for connections that do not deliver both request lines.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Behaviour when an accepted connection does not supply both request lines.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ReadPolicy {
    /// Answer with a protocol error; every connection is read afresh.
    #[default]
    Fresh,
    /// Replay the last complete request read on an earlier connection.
    ReusePrevious,
}
