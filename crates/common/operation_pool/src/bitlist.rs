//! Set algebra over participation bitlists and the signature lists aligned with them.
//!
//! Every binary operation requires both bitlists to have the same declared length and fails
//! with [PoolError::LengthMismatch] otherwise.

use itertools::Itertools;
use ream_post_quantum_crypto::PQSignature;
use ssz_types::{BitList, typenum::Unsigned};

use crate::errors::PoolError;

fn ensure_same_length<N: Unsigned + Clone>(
    left: &BitList<N>,
    right: &BitList<N>,
) -> Result<(), PoolError> {
    if left.len() != right.len() {
        return Err(PoolError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }

    Ok(())
}

/// Returns true if any bit is set in both bitlists.
pub fn overlaps<N: Unsigned + Clone>(
    left: &BitList<N>,
    right: &BitList<N>,
) -> Result<bool, PoolError> {
    ensure_same_length(left, right)?;

    Ok(left.iter().zip(right.iter()).any(|(left, right)| left && right))
}

/// Returns true if every bit set in `other` is also set in `bits`.
pub fn contains<N: Unsigned + Clone>(
    bits: &BitList<N>,
    other: &BitList<N>,
) -> Result<bool, PoolError> {
    ensure_same_length(bits, other)?;

    Ok(bits.iter().zip(other.iter()).all(|(bit, other)| bit || !other))
}

pub fn or<N: Unsigned + Clone>(
    left: &BitList<N>,
    right: &BitList<N>,
) -> Result<BitList<N>, PoolError> {
    ensure_same_length(left, right)?;

    Ok(left.union(right))
}

/// Indices of the set bits, ascending.
pub fn set_bit_indices<N: Unsigned + Clone>(bits: &BitList<N>) -> impl Iterator<Item = usize> + '_ {
    bits.iter()
        .enumerate()
        .filter_map(|(index, is_set)| is_set.then_some(index))
}

pub fn ensure_signature_count<N: Unsigned + Clone>(
    bits: &BitList<N>,
    signatures: &[PQSignature],
) -> Result<(), PoolError> {
    let participants = bits.num_set_bits();

    if signatures.len() != participants {
        return Err(PoolError::SignatureCountMismatch {
            signatures: signatures.len(),
            participants,
        });
    }

    Ok(())
}

/// Merges two signature lists in a single pass over the ascending set-bit indices of both
/// bitlists. A bit set in both keeps the base signature. The result is always a freshly
/// allocated list, neither input is modified.
pub fn merge_signatures<N: Unsigned + Clone>(
    base_bits: &BitList<N>,
    base_signatures: &[PQSignature],
    new_bits: &BitList<N>,
    new_signatures: &[PQSignature],
) -> Result<Vec<PQSignature>, PoolError> {
    ensure_same_length(base_bits, new_bits)?;
    ensure_signature_count(base_bits, base_signatures)?;
    ensure_signature_count(new_bits, new_signatures)?;

    let merged = set_bit_indices(base_bits)
        .zip(base_signatures)
        .merge_join_by(
            set_bit_indices(new_bits).zip(new_signatures),
            |(base_index, _), (new_index, _)| base_index.cmp(new_index),
        )
        .map(|entry| entry.reduce(|base, _| base).1.clone())
        .collect();

    Ok(merged)
}
