use std::sync::Arc;

use alloy_primitives::B256;
use itertools::Itertools;
use ream_consensus_misc::{attestation::Attestation, attestation_data::AttestationData};
use ream_metrics::{AGGREGATION_TIME, UNAGGREGATED_POOL, start_timer_vec, stop_timer};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{AttestationPool, count, retain_attestations};
use crate::{
    aggregation::max_cover::aggregate_attestations,
    bitlist::{contains, ensure_signature_count},
    errors::{PoolError, process_batch},
};

fn ensure_unaggregated(attestation: &Attestation) -> Result<(), PoolError> {
    match attestation.num_participants() {
        1 => Ok(()),
        participants => Err(PoolError::NotUnaggregated(participants)),
    }
}

impl AttestationPool {
    pub fn save_unaggregated_attestation(&self, attestation: &Attestation) -> Result<(), PoolError> {
        ensure_unaggregated(attestation)?;
        ensure_signature_count(&attestation.aggregation_bits, &attestation.signatures)?;

        let data_root = attestation.data_root();
        if self
            .seen
            .has_seen_bits(data_root, &attestation.aggregation_bits)?
        {
            return Ok(());
        }

        let mut unaggregated = self.unaggregated.write();
        if let Some(bucket) = unaggregated.get(&data_root) {
            for stored in bucket {
                // Both sides hold a single bit, so containment means the same vote.
                if contains(&stored.aggregation_bits, &attestation.aggregation_bits)? {
                    return Ok(());
                }
            }
        }
        unaggregated
            .entry(data_root)
            .or_default()
            .push(Arc::new(attestation.clone()));

        Ok(())
    }

    pub fn save_unaggregated_attestations(
        &self,
        attestations: &[Attestation],
    ) -> Result<(), PoolError> {
        process_batch(attestations, |attestation| {
            self.save_unaggregated_attestation(attestation)
        })
    }

    /// Returns every stored unaggregated attestation whose vote has not been seen yet.
    pub fn unaggregated_attestations(&self) -> Result<Vec<Arc<Attestation>>, PoolError> {
        self.unseen_unaggregated(|_| true)
    }

    pub fn unaggregated_attestations_by_slot_index(
        &self,
        slot: u64,
        index: u64,
    ) -> Result<Vec<Arc<Attestation>>, PoolError> {
        self.unseen_unaggregated(|data| data.slot == slot && data.index == index)
    }

    fn unseen_unaggregated(
        &self,
        filter: impl Fn(&AttestationData) -> bool,
    ) -> Result<Vec<Arc<Attestation>>, PoolError> {
        let unaggregated = self.unaggregated.read();
        let mut attestations = vec![];
        for (data_root, bucket) in unaggregated.iter() {
            for attestation in bucket {
                if filter(&attestation.data)
                    && !self
                        .seen
                        .has_seen_bits(*data_root, &attestation.aggregation_bits)?
                {
                    attestations.push(attestation.clone());
                }
            }
        }
        Ok(attestations)
    }

    /// Removes the vote and remembers it as seen so it is not saved again.
    pub fn delete_unaggregated_attestation(
        &self,
        attestation: &Attestation,
    ) -> Result<(), PoolError> {
        ensure_unaggregated(attestation)?;

        let data_root = attestation.data_root();
        self.seen
            .has_seen_bits(data_root, &attestation.aggregation_bits)?;
        let mut unaggregated = self.unaggregated.write();
        if let Some(bucket) = unaggregated.get_mut(&data_root) {
            bucket.retain(|stored| stored.aggregation_bits != attestation.aggregation_bits);
            if bucket.is_empty() {
                unaggregated.remove(&data_root);
            }
        }

        self.seen
            .insert_seen_bits(data_root, &attestation.aggregation_bits)
    }

    /// Removes every unaggregated attestation whose vote is already covered by a seen pattern.
    pub fn delete_seen_unaggregated_attestations(&self) -> Result<usize, PoolError> {
        let mut unaggregated = self.unaggregated.write();
        let mut deleted = 0;
        for (data_root, bucket) in unaggregated.iter_mut() {
            deleted += retain_attestations(bucket, |attestation| {
                Ok(!self
                    .seen
                    .has_seen_bits(*data_root, &attestation.aggregation_bits)?)
            })?;
        }
        unaggregated.retain(|_, bucket| !bucket.is_empty());

        Ok(deleted)
    }

    pub fn unaggregated_attestation_count(&self) -> usize {
        count(&self.unaggregated.read())
    }

    /// Aggregates every bucket of unaggregated attestations into the aggregated pool.
    pub async fn aggregate_unaggregated_attestations(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), PoolError> {
        self.aggregate_unaggregated_buckets(cancel, |_| true).await
    }

    pub async fn aggregate_unaggregated_attestations_by_slot_index(
        &self,
        cancel: &CancellationToken,
        slot: u64,
        index: u64,
    ) -> Result<(), PoolError> {
        self.aggregate_unaggregated_buckets(cancel, move |data| {
            data.slot == slot && data.index == index
        })
        .await
    }

    async fn aggregate_unaggregated_buckets(
        &self,
        cancel: &CancellationToken,
        filter: impl Fn(&AttestationData) -> bool,
    ) -> Result<(), PoolError> {
        let timer = start_timer_vec(&AGGREGATION_TIME, &[UNAGGREGATED_POOL]);

        let buckets = self
            .unseen_unaggregated(filter)?
            .into_iter()
            .map(|attestation| (attestation.data_root(), attestation.as_ref().clone()))
            .into_group_map()
            .into_iter()
            .filter(|(_, bucket)| bucket.len() > 1)
            .collect::<Vec<_>>();

        let mut tasks = JoinSet::new();
        for (data_root, bucket) in buckets {
            if cancel.is_cancelled() {
                debug!("Aggregation cancelled before all buckets were scheduled");
                break;
            }
            tasks.spawn_blocking(move || (data_root, aggregate_attestations(&bucket)));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            if cancel.is_cancelled() {
                debug!("Aggregation cancelled, discarding remaining results");
                break;
            }
            let (data_root, result) = match joined {
                Ok(output) => output,
                Err(err) => {
                    first_error.get_or_insert(PoolError::AggregationTask(err.to_string()));
                    continue;
                }
            };
            match result.and_then(|aggregates| self.apply_aggregates(data_root, aggregates)) {
                Ok(()) => {}
                Err(PoolError::BitsOverlap) => {
                    error!("Overlapping votes in unaggregated bucket {data_root}, skipping");
                }
                Err(err) => {
                    warn!("Failed to aggregate attestations for {data_root}: {err}");
                    first_error.get_or_insert(err);
                }
            }
        }

        stop_timer(timer);
        first_error.map_or(Ok(()), Err)
    }

    /// Saves aggregates with more than one vote and drops the unaggregated votes they cover.
    fn apply_aggregates(
        &self,
        data_root: B256,
        aggregates: Vec<Attestation>,
    ) -> Result<(), PoolError> {
        let aggregates = aggregates
            .into_iter()
            .filter(Attestation::is_aggregated)
            .collect::<Vec<_>>();
        for aggregate in &aggregates {
            self.save_aggregated_attestation(aggregate)?;
        }

        let mut unaggregated = self.unaggregated.write();
        let Some(bucket) = unaggregated.get_mut(&data_root) else {
            return Ok(());
        };
        let removed = retain_attestations(bucket, |attestation| {
            for aggregate in &aggregates {
                if contains(&aggregate.aggregation_bits, &attestation.aggregation_bits)? {
                    return Ok(false);
                }
            }
            Ok(true)
        })?;
        if bucket.is_empty() {
            unaggregated.remove(&data_root);
        }
        debug!(
            "Aggregated {removed} votes into {} attestations for {data_root}",
            aggregates.len()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::test_utils::{attestation, attestation_data, attestation_with_data, bit_indices};

    #[test]
    fn test_save_rejects_aggregated_attestation() {
        let pool = AttestationPool::default();

        assert_eq!(
            pool.save_unaggregated_attestation(&attestation(1, 8, &[0, 1])),
            Err(PoolError::NotUnaggregated(2))
        );
        assert_eq!(
            pool.save_unaggregated_attestation(&attestation(1, 8, &[])),
            Err(PoolError::NotUnaggregated(0))
        );
        assert_eq!(pool.unaggregated_attestation_count(), 0);
    }

    #[test]
    fn test_save_rejects_missing_signature() {
        let pool = AttestationPool::default();
        let mut vote = attestation(1, 8, &[3]);
        vote.signatures.clear();

        assert_eq!(
            pool.save_unaggregated_attestation(&vote),
            Err(PoolError::SignatureCountMismatch {
                signatures: 0,
                participants: 1
            })
        );
    }

    #[test]
    fn test_duplicate_vote_is_stored_once() {
        let pool = AttestationPool::default();
        let vote = attestation(1, 8, &[3]);

        pool.save_unaggregated_attestation(&vote).expect("first save");
        pool.save_unaggregated_attestation(&vote).expect("second save");

        assert_eq!(pool.unaggregated_attestation_count(), 1);
    }

    #[test]
    fn test_batch_save_keeps_valid_entries() {
        let pool = AttestationPool::default();
        let batch = [
            attestation(1, 8, &[0]),
            attestation(1, 8, &[1, 2]),
            attestation(1, 8, &[3]),
        ];

        let err = pool
            .save_unaggregated_attestations(&batch)
            .expect_err("second entry is aggregated");

        assert_eq!(
            err,
            PoolError::BatchItem {
                index: 1,
                source: Box::new(PoolError::NotUnaggregated(2)),
            }
        );
        assert_eq!(pool.unaggregated_attestation_count(), 2);
    }

    #[test]
    fn test_reads_filter_by_slot_index_and_seen() {
        let pool = AttestationPool::default();
        pool.save_unaggregated_attestations(&[
            attestation(1, 8, &[0]),
            attestation(1, 8, &[1]),
            attestation_with_data(attestation_data(1, 2), 8, &[0]),
            attestation(2, 8, &[0]),
        ])
        .expect("save votes");

        assert_eq!(pool.unaggregated_attestations().expect("read").len(), 4);
        assert_eq!(
            pool.unaggregated_attestations_by_slot_index(1, 0)
                .expect("read")
                .len(),
            2
        );
        assert_eq!(
            pool.unaggregated_attestations_by_slot_index(1, 2)
                .expect("read")
                .len(),
            1
        );

        pool.save_aggregated_attestation(&attestation(1, 8, &[0, 1]))
            .expect("save aggregate");

        assert!(
            pool.unaggregated_attestations_by_slot_index(1, 0)
                .expect("read")
                .is_empty()
        );
        assert_eq!(pool.unaggregated_attestation_count(), 4);
        assert_eq!(pool.delete_seen_unaggregated_attestations(), Ok(2));
        assert_eq!(pool.unaggregated_attestation_count(), 2);
    }

    #[test]
    fn test_deleted_vote_is_not_saved_again() {
        let pool = AttestationPool::default();
        let vote = attestation(1, 8, &[5]);

        pool.save_unaggregated_attestation(&vote).expect("save");
        pool.delete_unaggregated_attestation(&vote).expect("delete");
        assert_eq!(pool.unaggregated_attestation_count(), 0);

        pool.save_unaggregated_attestation(&vote).expect("save again");
        assert_eq!(pool.unaggregated_attestation_count(), 0);
    }

    #[tokio::test]
    async fn test_aggregation_moves_votes_into_aggregated_pool() {
        let pool = AttestationPool::default();
        pool.save_unaggregated_attestations(&[
            attestation(1, 8, &[0]),
            attestation(1, 8, &[3]),
            attestation(1, 8, &[1]),
            attestation(2, 8, &[4]),
        ])
        .expect("save votes");

        pool.aggregate_unaggregated_attestations(&CancellationToken::new())
            .await
            .expect("aggregate");

        let aggregated = pool.aggregated_attestations();
        assert_eq!(aggregated.len(), 1);
        assert_eq!(bit_indices(&aggregated[0]), vec![0, 1, 3]);
        assert_eq!(aggregated[0].signatures.len(), 3);

        // The lone vote at slot 2 has nothing to aggregate with.
        let remaining = pool.unaggregated_attestations().expect("read");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].data.slot, 2);
    }

    #[tokio::test]
    async fn test_aggregation_by_slot_index_leaves_other_buckets() {
        let pool = AttestationPool::default();
        pool.save_unaggregated_attestations(&[
            attestation(1, 8, &[0]),
            attestation(1, 8, &[1]),
            attestation(2, 8, &[0]),
            attestation(2, 8, &[1]),
        ])
        .expect("save votes");

        pool.aggregate_unaggregated_attestations_by_slot_index(&CancellationToken::new(), 2, 0)
            .await
            .expect("aggregate");

        assert_eq!(pool.aggregated_attestation_count(), 1);
        assert_eq!(pool.aggregated_attestations()[0].data.slot, 2);
        assert_eq!(pool.unaggregated_attestation_count(), 2);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_cancelled_aggregation_changes_nothing() {
        let pool = AttestationPool::default();
        pool.save_unaggregated_attestations(&[attestation(1, 8, &[0]), attestation(1, 8, &[1])])
            .expect("save votes");
        let cancel = CancellationToken::new();
        cancel.cancel();

        pool.aggregate_unaggregated_attestations(&cancel)
            .await
            .expect("aggregate");

        assert!(logs_contain("Aggregation cancelled"));
        assert_eq!(pool.aggregated_attestation_count(), 0);
        assert_eq!(pool.unaggregated_attestation_count(), 2);
    }

    #[test]
    fn test_save_rejects_vote_with_different_length() {
        let pool = AttestationPool::default();
        pool.save_unaggregated_attestation(&attestation(1, 8, &[0]))
            .expect("save vote");

        assert_eq!(
            pool.save_unaggregated_attestation(&attestation(1, 16, &[1])),
            Err(PoolError::LengthMismatch {
                left: 8,
                right: 16
            })
        );
        assert_eq!(pool.unaggregated_attestation_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_lose_no_votes_across_buckets() {
        const SLOTS: u64 = 8;
        const VOTERS: usize = 16;

        let pool = Arc::new(AttestationPool::default());
        for slot in 0..SLOTS {
            for voter in 0..VOTERS / 2 {
                pool.save_unaggregated_attestation(&attestation(slot, VOTERS, &[voter]))
                    .expect("save early vote");
            }
        }

        let writers = (0..SLOTS)
            .map(|slot| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    for voter in VOTERS / 2..VOTERS {
                        pool.save_unaggregated_attestation(&attestation(slot, VOTERS, &[voter]))
                            .expect("save late vote");
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect::<Vec<_>>();

        let cancel = CancellationToken::new();
        pool.aggregate_unaggregated_attestations(&cancel)
            .await
            .expect("aggregate while writing");
        for writer in writers {
            writer.await.expect("writer task");
        }
        pool.aggregate_unaggregated_attestations(&cancel)
            .await
            .expect("aggregate remaining votes");

        let mut votes = vec![vec![0usize; VOTERS]; SLOTS as usize];
        for stored in pool
            .aggregated_attestations()
            .iter()
            .chain(pool.unaggregated_attestations().expect("read").iter())
        {
            for voter in bit_indices(stored) {
                votes[stored.data.slot as usize][voter] += 1;
            }
        }

        // Every vote is held exactly once, either aggregated or still waiting
        assert!(votes.iter().flatten().all(|count| *count == 1));
        for slot in 0..SLOTS {
            assert!(
                !pool.aggregated_attestations_by_slot_index(slot, 0).is_empty(),
                "slot {slot} was not aggregated"
            );
        }
        assert!(pool.unaggregated_attestation_count() <= SLOTS as usize);
    }
}
