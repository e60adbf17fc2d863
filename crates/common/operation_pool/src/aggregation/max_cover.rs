//! Greedy maximum-coverage aggregation of votes that share a data root.

use itertools::Itertools;
use ssz_types::BitList;

use super::{Aggregatable, aggregate_pair, remove_contained};
use crate::{
    bitlist::{contains, ensure_signature_count, overlaps, set_bit_indices},
    errors::PoolError,
};

/// Aggregates `candidates` into a set of pairwise non-redundant aggregates covering the union
/// of their participation bits.
///
/// Fresh single-bit votes with distinct bits take a linear fast path. Everything else goes
/// through [greedy_max_cover], which only approximates the smallest cover.
pub fn aggregate_attestations<T: Aggregatable>(candidates: &[T]) -> Result<Vec<T>, PoolError> {
    let first = candidates.first().ok_or(PoolError::InvalidCount)?;
    let length = first.aggregation_bits().len();
    if length == 0 {
        return Err(PoolError::InvalidCount);
    }

    for candidate in candidates {
        let candidate_length = candidate.aggregation_bits().len();
        if candidate_length != length {
            return Err(PoolError::LengthMismatch {
                left: length,
                right: candidate_length,
            });
        }
    }

    if candidates.len() == 1 {
        return Ok(candidates.to_vec());
    }

    if is_disjoint_one_bit(candidates) {
        return Ok(vec![aggregate_disjoint_one_bit_attestations(candidates)?]);
    }

    remove_contained(greedy_max_cover(candidates)?)
}

fn is_disjoint_one_bit<T: Aggregatable>(candidates: &[T]) -> bool {
    candidates
        .iter()
        .all(|candidate| candidate.aggregation_bits().num_set_bits() == 1)
        && candidates
            .iter()
            .filter_map(|candidate| set_bit_indices(candidate.aggregation_bits()).next())
            .all_unique()
}

/// Aggregates single-bit votes with pairwise distinct bits in one pass, placing every
/// signature directly at the position of its bit.
pub fn aggregate_disjoint_one_bit_attestations<T: Aggregatable>(
    candidates: &[T],
) -> Result<T, PoolError> {
    let first = candidates.first().ok_or(PoolError::InvalidCount)?;
    let length = first.aggregation_bits().len();

    let mut aggregation_bits = BitList::with_capacity(length)?;
    let mut signature_slots = vec![None; length];

    for candidate in candidates {
        let bits = candidate.aggregation_bits();
        if bits.len() != length {
            return Err(PoolError::LengthMismatch {
                left: length,
                right: bits.len(),
            });
        }

        let participants = bits.num_set_bits();
        if participants != 1 {
            return Err(PoolError::NotUnaggregated(participants));
        }
        ensure_signature_count(bits, candidate.signatures())?;

        let index = set_bit_indices(bits)
            .next()
            .ok_or(PoolError::NotUnaggregated(0))?;
        if signature_slots[index].is_some() {
            return Err(PoolError::BitsOverlap);
        }

        signature_slots[index] = candidate.signatures().first();
        aggregation_bits.set(index, true)?;
    }

    let signatures = signature_slots.into_iter().flatten().cloned().collect();

    Ok(first.with_participation(aggregation_bits, signatures))
}

/// Builds aggregates run by run. Within a run the candidate adding the most new bits to the
/// running aggregate is merged next, the lowest index winning ties. A candidate overlapping the
/// running aggregate cannot be merged into it and adds nothing in that run. Candidates fully
/// covered by the finished aggregate are absorbed, the others seed the next run.
pub fn greedy_max_cover<T: Aggregatable>(candidates: &[T]) -> Result<Vec<T>, PoolError> {
    let mut remaining = (0..candidates.len()).collect_vec();
    let mut aggregates = vec![];

    while !remaining.is_empty() {
        let mut running: Option<T> = None;

        loop {
            let mut best: Option<(usize, usize)> = None;

            for (position, &index) in remaining.iter().enumerate() {
                let gain = marginal_gain(running.as_ref(), &candidates[index])?;
                if gain > best.map_or(0, |(_, best_gain)| best_gain) {
                    best = Some((position, gain));
                }
            }

            let Some((position, _)) = best else {
                break;
            };

            let candidate = &candidates[remaining.remove(position)];
            running = Some(match running {
                Some(aggregate) => aggregate_pair(&aggregate, candidate)?,
                None => candidate.clone(),
            });
        }

        // Only empty participation is left
        let Some(aggregate) = running else {
            break;
        };

        let mut leftover = Vec::with_capacity(remaining.len());
        for index in remaining {
            if !contains(
                aggregate.aggregation_bits(),
                candidates[index].aggregation_bits(),
            )? {
                leftover.push(index);
            }
        }

        remaining = leftover;
        aggregates.push(aggregate);
    }

    Ok(aggregates)
}

fn marginal_gain<T: Aggregatable>(running: Option<&T>, candidate: &T) -> Result<usize, PoolError> {
    if let Some(aggregate) = running
        && overlaps(aggregate.aggregation_bits(), candidate.aggregation_bits())?
    {
        return Ok(0);
    }

    Ok(candidate.aggregation_bits().num_set_bits())
}
