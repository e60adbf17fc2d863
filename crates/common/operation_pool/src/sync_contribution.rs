use std::{collections::HashMap, sync::Arc};

use alloy_primitives::B256;
use parking_lot::RwLock;
use ream_consensus_misc::sync_committee::{ContributionData, SyncCommitteeContribution};
use ream_metrics::{AGGREGATION_TIME, SYNC_CONTRIBUTION_POOL, start_timer_vec, stop_timer};
use tracing::{debug, error};

use crate::{
    aggregation::naive::naive_aggregation,
    bitlist::{contains, ensure_signature_count},
    errors::{PoolError, process_batch},
};

/// Sync committee contributions grouped by the data they sign, kept for the current and the
/// previous slot.
#[derive(Debug, Default)]
pub struct SyncContributionPool {
    contributions: RwLock<HashMap<ContributionData, Vec<Arc<SyncCommitteeContribution>>>>,
}

impl SyncContributionPool {
    pub fn save_sync_committee_contribution(
        &self,
        contribution: &SyncCommitteeContribution,
    ) -> Result<(), PoolError> {
        if contribution.aggregation_bits.num_set_bits() == 0 {
            return Err(PoolError::InvalidCount);
        }
        ensure_signature_count(&contribution.aggregation_bits, &contribution.signatures)?;

        let mut contributions = self.contributions.write();
        let bucket = contributions
            .entry(contribution.contribution_data())
            .or_default();
        for stored in bucket.iter() {
            if contains(&stored.aggregation_bits, &contribution.aggregation_bits)? {
                return Ok(());
            }
        }
        bucket.push(Arc::new(contribution.clone()));

        Ok(())
    }

    pub fn save_sync_committee_contributions(
        &self,
        contributions: &[SyncCommitteeContribution],
    ) -> Result<(), PoolError> {
        process_batch(contributions, |contribution| {
            self.save_sync_committee_contribution(contribution)
        })
    }

    pub fn sync_committee_contributions(&self, slot: u64) -> Vec<Arc<SyncCommitteeContribution>> {
        self.contributions
            .read()
            .iter()
            .filter(|(data, _)| data.slot == slot)
            .flat_map(|(_, bucket)| bucket.iter().cloned())
            .collect()
    }

    /// Returns the contribution with the most participants for the given data.
    pub fn best_sync_committee_contribution(
        &self,
        slot: u64,
        beacon_block_root: B256,
        subcommittee_index: u64,
    ) -> Option<Arc<SyncCommitteeContribution>> {
        let data = ContributionData {
            slot,
            beacon_block_root,
            subcommittee_index,
        };

        self.contributions
            .read()
            .get(&data)?
            .iter()
            .max_by_key(|contribution| contribution.aggregation_bits.num_set_bits())
            .cloned()
    }

    /// Merges the contributions of `slot` pairwise, replacing each bucket with its aggregates.
    pub fn aggregate_sync_committee_contributions(&self, slot: u64) -> Result<(), PoolError> {
        let timer = start_timer_vec(&AGGREGATION_TIME, &[SYNC_CONTRIBUTION_POOL]);

        let mut contributions = self.contributions.write();
        let mut first_error = None;
        for (data, bucket) in contributions
            .iter_mut()
            .filter(|(data, bucket)| data.slot == slot && bucket.len() > 1)
        {
            let candidates = bucket
                .iter()
                .map(|contribution| contribution.as_ref().clone())
                .collect();
            match naive_aggregation(candidates) {
                Ok(aggregates) => {
                    debug!(
                        "Aggregated {} contributions into {} for subcommittee {} at slot {slot}",
                        bucket.len(),
                        aggregates.len(),
                        data.subcommittee_index
                    );
                    *bucket = aggregates.into_iter().map(Arc::new).collect();
                }
                Err(err) => {
                    error!(
                        "Failed to aggregate contributions for subcommittee {} at slot {slot}: {err}",
                        data.subcommittee_index
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        stop_timer(timer);
        first_error.map_or(Ok(()), Err)
    }

    /// Drops contributions older than the previous slot. Returns how many were removed.
    pub fn prune(&self, current_slot: u64) -> usize {
        let previous_slot = current_slot.saturating_sub(1);
        let mut contributions = self.contributions.write();
        let before = count(&contributions);
        contributions.retain(|data, _| data.slot >= previous_slot);

        before - count(&contributions)
    }

    pub fn sync_committee_contribution_count(&self) -> usize {
        count(&self.contributions.read())
    }
}

fn count(contributions: &HashMap<ContributionData, Vec<Arc<SyncCommitteeContribution>>>) -> usize {
    contributions.values().map(Vec::len).sum()
}
