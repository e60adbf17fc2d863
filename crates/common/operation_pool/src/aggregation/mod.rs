pub mod max_cover;
pub mod naive;

use ream_consensus_misc::{
    attestation::{AggregationBits, Attestation},
    constants::{MaxValidatorsPerCommittee, SyncSubcommitteeSize},
    sync_committee::{SyncCommitteeContribution, SyncSubcommitteeBits},
};
use ream_post_quantum_crypto::PQSignature;
use ssz_types::{BitList, typenum::Unsigned};

use crate::{
    bitlist::{contains, merge_signatures, or, overlaps},
    errors::PoolError,
};

/// A vote that carries one signature per participation bit.
pub trait Aggregatable: Clone {
    type MaxParticipants: Unsigned + Clone;

    fn aggregation_bits(&self) -> &BitList<Self::MaxParticipants>;

    fn signatures(&self) -> &[PQSignature];

    /// Copy of `self` with the participation replaced.
    fn with_participation(
        &self,
        aggregation_bits: BitList<Self::MaxParticipants>,
        signatures: Vec<PQSignature>,
    ) -> Self;
}

impl Aggregatable for Attestation {
    type MaxParticipants = MaxValidatorsPerCommittee;

    fn aggregation_bits(&self) -> &AggregationBits {
        &self.aggregation_bits
    }

    fn signatures(&self) -> &[PQSignature] {
        &self.signatures
    }

    fn with_participation(
        &self,
        aggregation_bits: AggregationBits,
        signatures: Vec<PQSignature>,
    ) -> Self {
        Self {
            aggregation_bits,
            data: self.data,
            signatures,
        }
    }
}

impl Aggregatable for SyncCommitteeContribution {
    type MaxParticipants = SyncSubcommitteeSize;

    fn aggregation_bits(&self) -> &SyncSubcommitteeBits {
        &self.aggregation_bits
    }

    fn signatures(&self) -> &[PQSignature] {
        &self.signatures
    }

    fn with_participation(
        &self,
        aggregation_bits: SyncSubcommitteeBits,
        signatures: Vec<PQSignature>,
    ) -> Self {
        Self {
            slot: self.slot,
            beacon_block_root: self.beacon_block_root,
            subcommittee_index: self.subcommittee_index,
            aggregation_bits,
            signatures,
        }
    }
}

/// Merges two votes with disjoint participation into a new one.
///
/// The operand with more participants is the merge base, the first one on a tie. The result
/// takes its data from `first`.
pub fn aggregate_pair<T: Aggregatable>(first: &T, second: &T) -> Result<T, PoolError> {
    if overlaps(first.aggregation_bits(), second.aggregation_bits())? {
        return Err(PoolError::BitsOverlap);
    }

    let (base, new) = if second.aggregation_bits().num_set_bits()
        > first.aggregation_bits().num_set_bits()
    {
        (second, first)
    } else {
        (first, second)
    };

    let aggregation_bits = or(base.aggregation_bits(), new.aggregation_bits())?;
    let signatures = merge_signatures(
        base.aggregation_bits(),
        base.signatures(),
        new.aggregation_bits(),
        new.signatures(),
    )?;

    Ok(first.with_participation(aggregation_bits, signatures))
}

/// Drops every item whose bits are covered by another item. Of several identical items the
/// first one is kept.
pub(crate) fn remove_contained<T: Aggregatable>(items: Vec<T>) -> Result<Vec<T>, PoolError> {
    let mut redundant = vec![false; items.len()];

    for (index, item) in items.iter().enumerate() {
        for (other_index, other) in items.iter().enumerate() {
            if index == other_index || redundant[other_index] {
                continue;
            }

            if contains(other.aggregation_bits(), item.aggregation_bits())?
                && (other_index < index
                    || !contains(item.aggregation_bits(), other.aggregation_bits())?)
            {
                redundant[index] = true;
                break;
            }
        }
    }

    Ok(items
        .into_iter()
        .zip(redundant)
        .filter_map(|(item, redundant)| (!redundant).then_some(item))
        .collect())
}
