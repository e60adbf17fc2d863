use std::sync::Arc;

use ream_consensus_misc::attestation::Attestation;
use tracing::debug;

use super::{
    AttestationPool, count, insert_covering, is_covered, remove_supersets, snapshot,
    snapshot_by_slot_index,
};
use crate::{
    bitlist::ensure_signature_count,
    errors::{PoolError, process_batch},
};

fn ensure_aggregated(attestation: &Attestation) -> Result<(), PoolError> {
    match attestation.num_participants() {
        participants if participants <= 1 => Err(PoolError::NotAggregated(participants)),
        _ => Ok(()),
    }
}

impl AttestationPool {
    /// Stores an aggregate unless it only repeats votes that were already seen. Aggregates it
    /// fully covers are replaced.
    pub fn save_aggregated_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        ensure_aggregated(attestation)?;
        ensure_signature_count(&attestation.aggregation_bits, &attestation.signatures)?;

        let data_root = attestation.data_root();
        if self
            .seen
            .has_seen_bits(data_root, &attestation.aggregation_bits)?
        {
            debug!("Aggregate for {data_root} already seen, skipping");
            return Ok(());
        }

        let mut aggregated = self.aggregated.write();
        if insert_covering(&mut aggregated, data_root, attestation)? {
            self.seen
                .insert_seen_bits(data_root, &attestation.aggregation_bits)?;
        }

        Ok(())
    }

    pub fn save_aggregated_attestations(
        &self,
        attestations: &[Attestation],
    ) -> Result<(), PoolError> {
        process_batch(attestations, |attestation| {
            self.save_aggregated_attestation(attestation)
        })
    }

    pub fn aggregated_attestations(&self) -> Vec<Arc<Attestation>> {
        snapshot(&self.aggregated.read())
    }

    pub fn aggregated_attestations_by_slot_index(
        &self,
        slot: u64,
        index: u64,
    ) -> Vec<Arc<Attestation>> {
        snapshot_by_slot_index(&self.aggregated.read(), slot, index)
    }

    /// Returns true if the aggregated or block pool holds an attestation for the same data
    /// covering every vote of `attestation`.
    pub fn has_aggregated_attestation(&self, attestation: &Attestation) -> Result<bool, PoolError> {
        let data_root = attestation.data_root();
        for pool in [&self.aggregated, &self.block] {
            if let Some(bucket) = pool.read().get(&data_root)
                && is_covered(bucket, &attestation.aggregation_bits)?
            {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Removes every stored aggregate covering the votes of `attestation`.
    pub fn delete_aggregated_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        ensure_aggregated(attestation)?;

        let data_root = attestation.data_root();
        // Fails before anything is removed if the seen record cannot take these bits
        self.seen
            .has_seen_bits(data_root, &attestation.aggregation_bits)?;
        let removed = remove_supersets(
            &mut self.aggregated.write(),
            data_root,
            &attestation.aggregation_bits,
        )?;
        if removed > 0 {
            self.seen
                .insert_seen_bits(data_root, &attestation.aggregation_bits)?;
        }

        Ok(())
    }

    pub fn aggregated_attestation_count(&self) -> usize {
        count(&self.aggregated.read())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AttestationPoolConfig,
        seen::ManualClock,
        test_utils::{attestation, bit_indices, bits},
    };

    #[test]
    fn test_save_rejects_single_vote() {
        let pool = AttestationPool::default();

        assert_eq!(
            pool.save_aggregated_attestation(&attestation(1, 8, &[2])),
            Err(PoolError::NotAggregated(1))
        );
        assert_eq!(pool.aggregated_attestation_count(), 0);
    }

    #[test]
    fn test_seen_aggregate_is_not_saved() {
        let pool = AttestationPool::default();
        let aggregate = attestation(1, 8, &[0, 1]);
        pool.seen()
            .insert_seen_bits(aggregate.data_root(), &bits(8, &[0, 1, 2]))
            .expect("mark seen");

        pool.save_aggregated_attestation(&aggregate).expect("save");

        assert_eq!(pool.aggregated_attestation_count(), 0);
    }

    #[test]
    fn test_saving_superset_replaces_stored_subsets() {
        let pool = AttestationPool::default();
        pool.save_aggregated_attestations(&[
            attestation(1, 8, &[0, 1]),
            attestation(1, 8, &[4, 5]),
        ])
        .expect("save aggregates");

        pool.save_aggregated_attestation(&attestation(1, 8, &[0, 1, 2]))
            .expect("save superset");

        let mut stored = pool
            .aggregated_attestations()
            .iter()
            .map(|attestation| bit_indices(attestation))
            .collect::<Vec<_>>();
        stored.sort();
        assert_eq!(stored, vec![vec![0, 1, 2], vec![4, 5]]);
    }

    #[test]
    fn test_has_aggregated_matches_stored_superset() {
        let pool = AttestationPool::default();
        pool.save_aggregated_attestation(&attestation(1, 8, &[0, 1, 2]))
            .expect("save aggregate");
        pool.save_block_attestation(&attestation(1, 8, &[5, 6]))
            .expect("save block attestation");

        for (indices, expected) in [
            (vec![0, 1, 2], true),
            (vec![1, 2], true),
            (vec![5], true),
            (vec![2, 3], false),
            (vec![7], false),
        ] {
            assert_eq!(
                pool.has_aggregated_attestation(&attestation(1, 8, &indices)),
                Ok(expected),
                "{indices:?}"
            );
        }
        assert_eq!(
            pool.has_aggregated_attestation(&attestation(2, 8, &[0])),
            Ok(false)
        );
        assert!(matches!(
            pool.has_aggregated_attestation(&attestation(1, 16, &[0])),
            Err(PoolError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_delete_removes_only_supersets() {
        let pool = AttestationPool::default();
        pool.save_aggregated_attestations(&[
            attestation(1, 8, &[0, 1, 2]),
            attestation(1, 8, &[2, 3]),
            attestation(1, 8, &[4, 5]),
        ])
        .expect("save aggregates");

        pool.delete_aggregated_attestation(&attestation(1, 8, &[0, 1]))
            .expect("delete");

        let mut stored = pool
            .aggregated_attestations()
            .iter()
            .map(|attestation| bit_indices(attestation))
            .collect::<Vec<_>>();
        stored.sort();
        assert_eq!(stored, vec![vec![2, 3], vec![4, 5]]);
    }

    #[test]
    fn test_delete_of_unknown_aggregate_is_a_no_op() {
        let pool = AttestationPool::default();
        pool.save_aggregated_attestation(&attestation(1, 8, &[0, 1]))
            .expect("save aggregate");

        pool.delete_aggregated_attestation(&attestation(2, 8, &[0, 1]))
            .expect("delete");

        assert_eq!(pool.aggregated_attestation_count(), 1);
        assert_eq!(
            pool.delete_aggregated_attestation(&attestation(1, 8, &[0])),
            Err(PoolError::NotAggregated(1))
        );
    }

    #[test]
    fn test_batch_save_reports_invalid_entry() {
        let pool = AttestationPool::default();

        let result = pool.save_aggregated_attestations(&[
            attestation(1, 8, &[0, 1]),
            attestation(1, 8, &[3]),
            attestation(1, 8, &[4, 5]),
        ]);

        assert_eq!(
            result,
            Err(PoolError::BatchItem {
                index: 1,
                source: Box::new(PoolError::NotAggregated(1)),
            })
        );
        assert_eq!(pool.aggregated_attestation_count(), 2);
    }

    #[test]
    fn test_aggregate_can_be_saved_again_after_seen_expiry() {
        let clock = Arc::new(ManualClock::new());
        let config = AttestationPoolConfig {
            seen_ttl: Duration::from_secs(10),
            ..Default::default()
        };
        let pool = AttestationPool::with_clock(&config, clock.clone());
        let aggregate = attestation(1, 8, &[0, 1]);

        pool.save_aggregated_attestation(&aggregate).expect("save");
        pool.delete_aggregated_attestation(&aggregate).expect("delete");
        pool.save_aggregated_attestation(&aggregate).expect("save seen");
        assert_eq!(pool.aggregated_attestation_count(), 0);

        clock.advance(Duration::from_secs(11));
        pool.save_aggregated_attestation(&aggregate).expect("save expired");
        assert_eq!(pool.aggregated_attestation_count(), 1);
    }

    #[test]
    fn test_delete_fails_without_changes_on_seen_length_mismatch() {
        let clock = Arc::new(ManualClock::new());
        let config = AttestationPoolConfig {
            seen_ttl: Duration::from_secs(10),
            ..Default::default()
        };
        let pool = AttestationPool::with_clock(&config, clock.clone());
        let aggregate = attestation(1, 8, &[0, 1]);
        pool.save_aggregated_attestation(&aggregate).expect("save");

        clock.advance(Duration::from_secs(11));
        pool.seen()
            .insert_seen_bits(aggregate.data_root(), &bits(16, &[3]))
            .expect("replace expired record");

        assert_eq!(
            pool.delete_aggregated_attestation(&aggregate),
            Err(PoolError::LengthMismatch {
                left: 16,
                right: 8
            })
        );
        assert_eq!(pool.aggregated_attestation_count(), 1);
    }
}
