use std::sync::Arc;

use async_trait::async_trait;
use ream_consensus_misc::attestation::Attestation;
use tokio_util::sync::CancellationToken;

use crate::{attestation::AttestationPool, errors::PoolError};

/// Operations the rest of the node performs on an attestation pool.
#[async_trait]
pub trait Pool: Send + Sync {
    // Aggregated attestations
    fn aggregated_attestations(&self) -> Vec<Arc<Attestation>>;
    fn aggregated_attestations_by_slot_index(&self, slot: u64, index: u64)
    -> Vec<Arc<Attestation>>;
    fn save_aggregated_attestation(&self, attestation: &Attestation) -> Result<(), PoolError>;
    fn save_aggregated_attestations(&self, attestations: &[Attestation]) -> Result<(), PoolError>;
    fn delete_aggregated_attestation(&self, attestation: &Attestation) -> Result<(), PoolError>;
    fn has_aggregated_attestation(&self, attestation: &Attestation) -> Result<bool, PoolError>;
    fn aggregated_attestation_count(&self) -> usize;

    // Unaggregated attestations
    fn unaggregated_attestations(&self) -> Result<Vec<Arc<Attestation>>, PoolError>;
    fn unaggregated_attestations_by_slot_index(
        &self,
        slot: u64,
        index: u64,
    ) -> Result<Vec<Arc<Attestation>>, PoolError>;
    fn save_unaggregated_attestation(&self, attestation: &Attestation) -> Result<(), PoolError>;
    fn save_unaggregated_attestations(&self, attestations: &[Attestation])
    -> Result<(), PoolError>;
    fn delete_unaggregated_attestation(&self, attestation: &Attestation) -> Result<(), PoolError>;
    fn delete_seen_unaggregated_attestations(&self) -> Result<usize, PoolError>;
    fn unaggregated_attestation_count(&self) -> usize;
    async fn aggregate_unaggregated_attestations(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), PoolError>;
    async fn aggregate_unaggregated_attestations_by_slot_index(
        &self,
        cancel: &CancellationToken,
        slot: u64,
        index: u64,
    ) -> Result<(), PoolError>;

    // Attestations included in blocks
    fn save_block_attestation(&self, attestation: &Attestation) -> Result<(), PoolError>;
    fn save_block_attestations(&self, attestations: &[Attestation]) -> Result<(), PoolError>;
    fn block_attestations(&self) -> Vec<Arc<Attestation>>;
    fn delete_block_attestation(&self, attestation: &Attestation) -> Result<(), PoolError>;
    fn block_attestation_count(&self) -> usize;

    // Fork choice
    fn save_forkchoice_attestation(&self, attestation: &Attestation) -> Result<(), PoolError>;
    fn save_forkchoice_attestations(&self, attestations: &[Attestation]) -> Result<(), PoolError>;
    fn forkchoice_attestations(&self) -> Vec<Arc<Attestation>>;
    fn delete_forkchoice_attestation(&self, attestation: &Attestation) -> Result<(), PoolError>;
    fn forkchoice_attestation_count(&self) -> usize;
    fn batch_forkchoice_attestations(&self) -> Result<(), PoolError>;

    fn prune_expired_attestations(&self, current_slot: u64) -> usize;
}

#[async_trait]
impl Pool for AttestationPool {
    fn aggregated_attestations(&self) -> Vec<Arc<Attestation>> {
        AttestationPool::aggregated_attestations(self)
    }

    fn aggregated_attestations_by_slot_index(
        &self,
        slot: u64,
        index: u64,
    ) -> Vec<Arc<Attestation>> {
        AttestationPool::aggregated_attestations_by_slot_index(self, slot, index)
    }

    fn save_aggregated_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        AttestationPool::save_aggregated_attestation(self, attestation)
    }

    fn save_aggregated_attestations(&self, attestations: &[Attestation]) -> Result<(), PoolError> {
        AttestationPool::save_aggregated_attestations(self, attestations)
    }

    fn delete_aggregated_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        AttestationPool::delete_aggregated_attestation(self, attestation)
    }

    fn has_aggregated_attestation(&self, attestation: &Attestation) -> Result<bool, PoolError> {
        AttestationPool::has_aggregated_attestation(self, attestation)
    }

    fn aggregated_attestation_count(&self) -> usize {
        AttestationPool::aggregated_attestation_count(self)
    }

    fn unaggregated_attestations(&self) -> Result<Vec<Arc<Attestation>>, PoolError> {
        AttestationPool::unaggregated_attestations(self)
    }

    fn unaggregated_attestations_by_slot_index(
        &self,
        slot: u64,
        index: u64,
    ) -> Result<Vec<Arc<Attestation>>, PoolError> {
        AttestationPool::unaggregated_attestations_by_slot_index(self, slot, index)
    }

    fn save_unaggregated_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        AttestationPool::save_unaggregated_attestation(self, attestation)
    }

    fn save_unaggregated_attestations(
        &self,
        attestations: &[Attestation],
    ) -> Result<(), PoolError> {
        AttestationPool::save_unaggregated_attestations(self, attestations)
    }

    fn delete_unaggregated_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        AttestationPool::delete_unaggregated_attestation(self, attestation)
    }

    fn delete_seen_unaggregated_attestations(&self) -> Result<usize, PoolError> {
        AttestationPool::delete_seen_unaggregated_attestations(self)
    }

    fn unaggregated_attestation_count(&self) -> usize {
        AttestationPool::unaggregated_attestation_count(self)
    }

    async fn aggregate_unaggregated_attestations(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), PoolError> {
        AttestationPool::aggregate_unaggregated_attestations(self, cancel).await
    }

    async fn aggregate_unaggregated_attestations_by_slot_index(
        &self,
        cancel: &CancellationToken,
        slot: u64,
        index: u64,
    ) -> Result<(), PoolError> {
        AttestationPool::aggregate_unaggregated_attestations_by_slot_index(self, cancel, slot, index)
            .await
    }

    fn save_block_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        AttestationPool::save_block_attestation(self, attestation)
    }

    fn save_block_attestations(&self, attestations: &[Attestation]) -> Result<(), PoolError> {
        AttestationPool::save_block_attestations(self, attestations)
    }

    fn block_attestations(&self) -> Vec<Arc<Attestation>> {
        AttestationPool::block_attestations(self)
    }

    fn delete_block_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        AttestationPool::delete_block_attestation(self, attestation)
    }

    fn block_attestation_count(&self) -> usize {
        AttestationPool::block_attestation_count(self)
    }

    fn save_forkchoice_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        AttestationPool::save_forkchoice_attestation(self, attestation)
    }

    fn save_forkchoice_attestations(&self, attestations: &[Attestation]) -> Result<(), PoolError> {
        AttestationPool::save_forkchoice_attestations(self, attestations)
    }

    fn forkchoice_attestations(&self) -> Vec<Arc<Attestation>> {
        AttestationPool::forkchoice_attestations(self)
    }

    fn delete_forkchoice_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        AttestationPool::delete_forkchoice_attestation(self, attestation)
    }

    fn forkchoice_attestation_count(&self) -> usize {
        AttestationPool::forkchoice_attestation_count(self)
    }

    fn batch_forkchoice_attestations(&self) -> Result<(), PoolError> {
        AttestationPool::batch_forkchoice_attestations(self)
    }

    fn prune_expired_attestations(&self, current_slot: u64) -> usize {
        AttestationPool::prune_expired_attestations(self, current_slot)
    }
}
