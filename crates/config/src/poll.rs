use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Poll {
    /// Delay between two consecutive comparison cycles. **Measured in
    /// milliseconds**.
    ///
    /// ## Note
    ///
    /// A process that starts and exits entirely within one interval is never
    /// reported. Lowering the interval narrows that window at the cost of
    /// more procfs traffic.
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(rename = "interval_ms")]
    pub interval: Duration,

    /// Delay between the initial snapshot and the first comparison cycle.
    /// **Measured in milliseconds**.
    ///
    /// Processes that were only transiently present at start-up are absorbed
    /// by this period instead of being reported as spawned.
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(rename = "warmup_ms")]
    pub warmup: Duration,
}

impl Default for Poll {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            warmup: Duration::from_secs(3),
        }
    }
}
