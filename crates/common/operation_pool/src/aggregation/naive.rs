use super::{Aggregatable, aggregate_pair, remove_contained};
use crate::{bitlist::overlaps, errors::PoolError};

/// Pairwise aggregation for small inputs such as sync subcommittee contributions.
///
/// Merges the first disjoint pair found and rescans from the start until no disjoint pair is
/// left, then drops everything covered by another item. Quadratic per merge.
pub fn naive_aggregation<T: Aggregatable>(mut items: Vec<T>) -> Result<Vec<T>, PoolError> {
    'scan: loop {
        for first in 0..items.len() {
            for second in first + 1..items.len() {
                if overlaps(
                    items[first].aggregation_bits(),
                    items[second].aggregation_bits(),
                )? {
                    continue;
                }

                items[first] = aggregate_pair(&items[first], &items[second])?;
                items.remove(second);
                continue 'scan;
            }
        }

        break;
    }

    remove_contained(items)
}
