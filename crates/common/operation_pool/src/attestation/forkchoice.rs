use std::{collections::HashMap, sync::Arc};

use alloy_primitives::B256;
use ream_consensus_misc::attestation::Attestation;
use ream_metrics::{AGGREGATION_TIME, FORKCHOICE_POOL, start_timer_vec, stop_timer};
use tracing::error;

use super::{AttestationPool, count, insert_covering, remove_supersets, snapshot};
use crate::{
    aggregation::max_cover::aggregate_attestations,
    bitlist::ensure_signature_count,
    errors::{PoolError, process_batch},
};

impl AttestationPool {
    /// Adds an attestation for fork choice unless a stored one already covers it. Stored
    /// attestations it covers are dropped, so no vote is weighed twice.
    pub fn save_forkchoice_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        ensure_signature_count(&attestation.aggregation_bits, &attestation.signatures)?;

        insert_covering(
            &mut self.forkchoice.write(),
            attestation.data_root(),
            attestation,
        )?;

        Ok(())
    }

    pub fn save_forkchoice_attestations(
        &self,
        attestations: &[Attestation],
    ) -> Result<(), PoolError> {
        process_batch(attestations, |attestation| {
            self.save_forkchoice_attestation(attestation)
        })
    }

    pub fn forkchoice_attestations(&self) -> Vec<Arc<Attestation>> {
        snapshot(&self.forkchoice.read())
    }

    pub fn delete_forkchoice_attestation(
        &self,
        attestation: &Attestation,
    ) -> Result<(), PoolError> {
        remove_supersets(
            &mut self.forkchoice.write(),
            attestation.data_root(),
            &attestation.aggregation_bits,
        )?;

        Ok(())
    }

    pub fn forkchoice_attestation_count(&self) -> usize {
        count(&self.forkchoice.read())
    }

    /// Aggregates everything the unaggregated, aggregated and block pools hold for each data
    /// root, together with what fork choice already has, and saves the result for fork choice.
    /// The source pools are left as they are.
    pub fn batch_forkchoice_attestations(&self) -> Result<(), PoolError> {
        let timer = start_timer_vec(&AGGREGATION_TIME, &[FORKCHOICE_POOL]);

        let mut candidates: HashMap<B256, Vec<Attestation>> = HashMap::new();
        for pool in [
            &self.unaggregated,
            &self.aggregated,
            &self.block,
            &self.forkchoice,
        ] {
            for (data_root, bucket) in pool.read().iter() {
                candidates
                    .entry(*data_root)
                    .or_default()
                    .extend(bucket.iter().map(|attestation| attestation.as_ref().clone()));
            }
        }

        let result = process_batch(candidates, |(data_root, attestations)| {
            match aggregate_attestations(&attestations) {
                Ok(aggregates) => self.save_forkchoice_attestations(&aggregates),
                Err(PoolError::BitsOverlap) => {
                    error!("Overlapping votes for fork choice at {data_root}, skipping");
                    Ok(())
                }
                Err(err) => Err(err),
            }
        });

        stop_timer(timer);
        result
    }
}
