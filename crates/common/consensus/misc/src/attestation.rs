use alloy_primitives::B256;
use ream_post_quantum_crypto::PQSignature;
use serde::{Deserialize, Serialize};
use ssz_types::BitList;

use crate::{attestation_data::AttestationData, constants::MaxValidatorsPerCommittee};

pub type AggregationBits = BitList<MaxValidatorsPerCommittee>;

/// A vote of one or more committee members on the same [AttestationData].
///
/// `signatures[i]` is the signature of the validator behind the i-th set bit of
/// `aggregation_bits`, in ascending bit order.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Attestation {
    pub aggregation_bits: AggregationBits,
    pub data: AttestationData,
    pub signatures: Vec<PQSignature>,
}

impl Attestation {
    pub fn data_root(&self) -> B256 {
        self.data.data_root()
    }

    pub fn num_participants(&self) -> usize {
        self.aggregation_bits.num_set_bits()
    }

    pub fn is_aggregated(&self) -> bool {
        self.num_participants() > 1
    }
}
