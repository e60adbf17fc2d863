use std::sync::Arc;

use ream_consensus_misc::attestation::Attestation;

use super::{AttestationPool, count, insert_covering, remove_supersets, snapshot};
use crate::{
    bitlist::ensure_signature_count,
    errors::{PoolError, process_batch},
};

impl AttestationPool {
    /// Records an attestation included in a block. Stored attestations it covers are dropped.
    pub fn save_block_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        ensure_signature_count(&attestation.aggregation_bits, &attestation.signatures)?;

        insert_covering(
            &mut self.block.write(),
            attestation.data_root(),
            attestation,
        )?;

        Ok(())
    }

    pub fn save_block_attestations(&self, attestations: &[Attestation]) -> Result<(), PoolError> {
        process_batch(attestations, |attestation| {
            self.save_block_attestation(attestation)
        })
    }

    pub fn block_attestations(&self) -> Vec<Arc<Attestation>> {
        snapshot(&self.block.read())
    }

    pub fn delete_block_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        let data_root = attestation.data_root();
        self.seen
            .has_seen_bits(data_root, &attestation.aggregation_bits)?;
        let removed = remove_supersets(
            &mut self.block.write(),
            data_root,
            &attestation.aggregation_bits,
        )?;
        if removed > 0 {
            self.seen
                .insert_seen_bits(data_root, &attestation.aggregation_bits)?;
        }

        Ok(())
    }

    pub fn block_attestation_count(&self) -> usize {
        count(&self.block.read())
    }
}
