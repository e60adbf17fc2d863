use alloy_primitives::B256;
use ream_post_quantum_crypto::PQSignature;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::BitList;

use crate::constants::SyncSubcommitteeSize;

pub type SyncSubcommitteeBits = BitList<SyncSubcommitteeSize>;

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct SyncCommitteeContribution {
    #[serde(with = "serde_utils::quoted_u64")]
    pub slot: u64,
    pub beacon_block_root: B256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub subcommittee_index: u64,
    pub aggregation_bits: SyncSubcommitteeBits,
    pub signatures: Vec<PQSignature>,
}

impl SyncCommitteeContribution {
    pub fn contribution_data(&self) -> ContributionData {
        ContributionData {
            slot: self.slot,
            beacon_block_root: self.beacon_block_root,
            subcommittee_index: self.subcommittee_index,
        }
    }
}

/// The part of a contribution that all aggregatable contributions agree on.
#[derive(
    Debug, Default, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize, Encode, Decode,
)]
pub struct ContributionData {
    #[serde(with = "serde_utils::quoted_u64")]
    pub slot: u64,
    pub beacon_block_root: B256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub subcommittee_index: u64,
}
