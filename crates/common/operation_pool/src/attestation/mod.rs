pub mod aggregated;
pub mod block;
pub mod forkchoice;
pub mod unaggregated;

use std::{collections::HashMap, sync::Arc};

use alloy_primitives::B256;
use parking_lot::RwLock;
use ream_consensus_misc::attestation::{AggregationBits, Attestation};
use tracing::debug;

use crate::{
    bitlist::contains,
    config::AttestationPoolConfig,
    errors::PoolError,
    seen::{Clock, SeenTracker, SystemClock},
};

/// Attestations grouped by the root of their data.
pub type AttestationMap = HashMap<B256, Vec<Arc<Attestation>>>;

/// In-memory attestation pool. Holds single-vote attestations waiting to be aggregated,
/// aggregates ready for block production, attestations observed in blocks and the batch
/// prepared for fork choice.
///
/// Each pool has its own lock, and the [SeenTracker] has another one. Pool locks are always
/// taken before the tracker lock.
#[derive(Debug)]
pub struct AttestationPool {
    unaggregated: RwLock<AttestationMap>,
    aggregated: RwLock<AttestationMap>,
    block: RwLock<AttestationMap>,
    forkchoice: RwLock<AttestationMap>,
    seen: SeenTracker,
    slots_per_epoch: u64,
}

impl AttestationPool {
    pub fn new(config: &AttestationPoolConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AttestationPoolConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            unaggregated: RwLock::new(HashMap::new()),
            aggregated: RwLock::new(HashMap::new()),
            block: RwLock::new(HashMap::new()),
            forkchoice: RwLock::new(HashMap::new()),
            seen: SeenTracker::new(config.seen_ttl, clock),
            slots_per_epoch: config.slots_per_epoch,
        }
    }

    pub fn seen(&self) -> &SeenTracker {
        &self.seen
    }

    /// Drops every attestation at least an epoch older than `current_slot` from all pools,
    /// along with expired seen records. Returns the number of attestations removed.
    pub fn prune_expired_attestations(&self, current_slot: u64) -> usize {
        let is_live = |attestation: &Arc<Attestation>| {
            attestation.data.slot.saturating_add(self.slots_per_epoch) > current_slot
        };

        let mut pruned = 0;
        for pool in [
            &self.unaggregated,
            &self.aggregated,
            &self.block,
            &self.forkchoice,
        ] {
            let mut attestations = pool.write();
            for bucket in attestations.values_mut() {
                let before = bucket.len();
                bucket.retain(is_live);
                pruned += before - bucket.len();
            }
            attestations.retain(|_, bucket| !bucket.is_empty());
        }

        let seen_pruned = self.seen.prune_expired();
        debug!(
            "Pruned {pruned} attestations and {seen_pruned} seen records before slot {current_slot}, {} seen records left",
            self.seen.len()
        );

        pruned
    }
}

impl Default for AttestationPool {
    fn default() -> Self {
        Self::new(&AttestationPoolConfig::default())
    }
}

fn snapshot(attestations: &AttestationMap) -> Vec<Arc<Attestation>> {
    attestations.values().flatten().cloned().collect()
}

fn snapshot_by_slot_index(
    attestations: &AttestationMap,
    slot: u64,
    index: u64,
) -> Vec<Arc<Attestation>> {
    attestations
        .values()
        .flatten()
        .filter(|attestation| attestation.data.slot == slot && attestation.data.index == index)
        .cloned()
        .collect()
}

fn count(attestations: &AttestationMap) -> usize {
    attestations.values().map(Vec::len).sum()
}

/// Keeps the attestations `keep` accepts. Every entry is checked before anything is removed,
/// so a failing check leaves the bucket untouched. Returns how many entries were dropped.
fn retain_attestations(
    bucket: &mut Vec<Arc<Attestation>>,
    mut keep: impl FnMut(&Attestation) -> Result<bool, PoolError>,
) -> Result<usize, PoolError> {
    let decisions = bucket
        .iter()
        .map(|attestation| keep(attestation))
        .collect::<Result<Vec<_>, _>>()?;

    let before = bucket.len();
    let mut decisions = decisions.into_iter();
    bucket.retain(|_| decisions.next().unwrap_or(true));

    Ok(before - bucket.len())
}

fn is_covered(bucket: &[Arc<Attestation>], bits: &AggregationBits) -> Result<bool, PoolError> {
    for stored in bucket {
        if contains(&stored.aggregation_bits, bits)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Stores `attestation` unless an entry already covers it, dropping entries it covers.
/// Returns whether it was stored.
fn insert_covering(
    attestations: &mut AttestationMap,
    data_root: B256,
    attestation: &Attestation,
) -> Result<bool, PoolError> {
    if let Some(bucket) = attestations.get(&data_root)
        && is_covered(bucket, &attestation.aggregation_bits)?
    {
        return Ok(false);
    }

    let bucket = attestations.entry(data_root).or_default();
    retain_attestations(bucket, |stored| {
        Ok(!contains(&attestation.aggregation_bits, &stored.aggregation_bits)?)
    })?;
    bucket.push(Arc::new(attestation.clone()));

    Ok(true)
}

/// Removes every entry whose bits are a superset of `bits`. Returns how many were removed.
fn remove_supersets(
    attestations: &mut AttestationMap,
    data_root: B256,
    bits: &AggregationBits,
) -> Result<usize, PoolError> {
    let Some(bucket) = attestations.get_mut(&data_root) else {
        return Ok(0);
    };

    let removed = retain_attestations(bucket, |stored| {
        Ok(!contains(&stored.aggregation_bits, bits)?)
    })?;
    if bucket.is_empty() {
        attestations.remove(&data_root);
    }

    Ok(removed)
}
