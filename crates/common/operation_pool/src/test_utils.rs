use alloy_primitives::B256;
use ream_consensus_misc::{
    attestation::{AggregationBits, Attestation},
    attestation_data::AttestationData,
    checkpoint::Checkpoint,
    sync_committee::SyncCommitteeContribution,
};
use ream_post_quantum_crypto::PQSignature;
use ssz_types::{BitList, typenum::Unsigned};

use crate::bitlist::set_bit_indices;

fn bitlist<N: Unsigned + Clone>(length: usize, indices: &[usize]) -> BitList<N> {
    let mut bits = BitList::with_capacity(length).expect("length within limit");
    for index in indices {
        bits.set(*index, true).expect("index within length");
    }
    bits
}

pub fn bits(length: usize, indices: &[usize]) -> AggregationBits {
    bitlist(length, indices)
}

/// Test signatures encode the bit index they belong to.
pub fn signature_for(index: usize) -> PQSignature {
    PQSignature::new((index as u64).to_le_bytes().to_vec())
}

pub fn signature_index(signature: &PQSignature) -> usize {
    let bytes: [u8; 8] = signature
        .as_bytes()
        .try_into()
        .expect("test signatures are 8 bytes");
    u64::from_le_bytes(bytes) as usize
}

pub fn signatures_for<N: Unsigned + Clone>(bits: &BitList<N>) -> Vec<PQSignature> {
    set_bit_indices(bits).map(signature_for).collect()
}

pub fn attestation_data(slot: u64, index: u64) -> AttestationData {
    AttestationData {
        slot,
        index,
        beacon_block_root: B256::repeat_byte(0xbb),
        source: Checkpoint {
            epoch: 0,
            root: B256::repeat_byte(0x01),
        },
        target: Checkpoint {
            epoch: 1,
            root: B256::repeat_byte(0x02),
        },
    }
}

pub fn attestation_with_data(data: AttestationData, length: usize, indices: &[usize]) -> Attestation {
    let aggregation_bits = bits(length, indices);
    let signatures = signatures_for(&aggregation_bits);

    Attestation {
        aggregation_bits,
        data,
        signatures,
    }
}

pub fn attestation(slot: u64, length: usize, indices: &[usize]) -> Attestation {
    attestation_with_data(attestation_data(slot, 0), length, indices)
}

pub fn bit_indices(attestation: &Attestation) -> Vec<usize> {
    set_bit_indices(&attestation.aggregation_bits).collect()
}

pub fn contribution(slot: u64, indices: &[usize]) -> SyncCommitteeContribution {
    let aggregation_bits = bitlist(128, indices);
    let signatures = signatures_for(&aggregation_bits);

    SyncCommitteeContribution {
        slot,
        beacon_block_root: B256::repeat_byte(0xcc),
        subcommittee_index: 0,
        aggregation_bits,
        signatures,
    }
}
