use std::time::Duration;

use ream_consensus_misc::constants::{SECONDS_PER_SLOT, SLOTS_PER_EPOCH};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationPoolConfig {
    pub genesis_time: u64,
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,
    /// How long a seen participation pattern suppresses re-insertion.
    pub seen_ttl: Duration,
    pub aggregation_interval: Duration,
    pub forkchoice_interval: Duration,
    pub prune_interval: Duration,
}

impl AttestationPoolConfig {
    pub fn new(genesis_time: u64, seconds_per_slot: u64, slots_per_epoch: u64) -> Self {
        let slot_duration = Duration::from_secs(seconds_per_slot);

        Self {
            genesis_time,
            seconds_per_slot,
            slots_per_epoch,
            seen_ttl: Duration::from_secs(seconds_per_slot.saturating_mul(slots_per_epoch)),
            aggregation_interval: slot_duration / 3,
            forkchoice_interval: slot_duration / 3,
            prune_interval: slot_duration,
        }
    }

    pub fn slot_duration(&self) -> Duration {
        Duration::from_secs(self.seconds_per_slot)
    }
}

impl Default for AttestationPoolConfig {
    fn default() -> Self {
        Self::new(0, SECONDS_PER_SLOT, SLOTS_PER_EPOCH)
    }
}
