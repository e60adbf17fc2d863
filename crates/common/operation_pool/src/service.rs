use std::sync::Arc;

use anyhow::ensure;
use ream_consensus_misc::misc::get_current_slot;
use ream_metrics::{
    AGGREGATED_POOL, ATTESTATION_POOL_SIZE, BLOCK_POOL, FORKCHOICE_POOL,
    SYNC_CONTRIBUTION_POOL_SIZE, UNAGGREGATED_POOL, set_int_gauge_vec,
};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::AttestationPoolConfig, sync_contribution::SyncContributionPool, traits::Pool,
};

/// Runs the periodic work of the pools:
/// 1. aggregating unaggregated attestations and sync committee contributions,
/// 2. preparing the fork choice batch,
/// 3. pruning everything that is too old to be included anymore.
pub struct AttestationPoolService<P: Pool + ?Sized> {
    attestation_pool: Arc<P>,
    sync_contribution_pool: Arc<SyncContributionPool>,
    config: AttestationPoolConfig,
}

impl<P: Pool + ?Sized> AttestationPoolService<P> {
    pub fn new(
        attestation_pool: Arc<P>,
        sync_contribution_pool: Arc<SyncContributionPool>,
        config: AttestationPoolConfig,
    ) -> Self {
        Self {
            attestation_pool,
            sync_contribution_pool,
            config,
        }
    }

    pub async fn start(self, cancel: CancellationToken) -> anyhow::Result<()> {
        ensure!(
            !self.config.aggregation_interval.is_zero()
                && !self.config.forkchoice_interval.is_zero()
                && !self.config.prune_interval.is_zero(),
            "Attestation pool intervals must be non-zero"
        );
        info!(
            "AttestationPoolService started with genesis_time: {}",
            self.config.genesis_time
        );

        let mut aggregation_interval = interval(self.config.aggregation_interval);
        let mut forkchoice_interval = interval(self.config.forkchoice_interval);
        let mut prune_interval = interval(self.config.prune_interval);
        for ticker in [
            &mut aggregation_interval,
            &mut forkchoice_interval,
            &mut prune_interval,
        ] {
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("AttestationPoolService stopped");
                    return Ok(());
                }
                _ = aggregation_interval.tick() => {
                    self.aggregate(&cancel).await;
                    self.report_pool_sizes();
                }
                _ = forkchoice_interval.tick() => {
                    if let Err(err) = self.attestation_pool.batch_forkchoice_attestations() {
                        warn!("Failed to batch fork choice attestations: {err}");
                    }
                }
                _ = prune_interval.tick() => {
                    if let Some(current_slot) = self.current_slot() {
                        let pruned = self.attestation_pool.prune_expired_attestations(current_slot);
                        let pruned_contributions = self.sync_contribution_pool.prune(current_slot);
                        debug!("Pruned {pruned} attestations and {pruned_contributions} contributions at slot {current_slot}");
                    }
                    self.report_pool_sizes();
                }
            }
        }
    }

    fn current_slot(&self) -> Option<u64> {
        get_current_slot(self.config.genesis_time, self.config.seconds_per_slot)
    }

    async fn aggregate(&self, cancel: &CancellationToken) {
        if let Err(err) = self
            .attestation_pool
            .aggregate_unaggregated_attestations(cancel)
            .await
        {
            warn!("Failed to aggregate unaggregated attestations: {err}");
        }

        if let Some(current_slot) = self.current_slot()
            && let Err(err) = self
                .sync_contribution_pool
                .aggregate_sync_committee_contributions(current_slot)
        {
            warn!("Failed to aggregate sync committee contributions: {err}");
        }
    }

    fn report_pool_sizes(&self) {
        for (pool, size) in [
            (
                UNAGGREGATED_POOL,
                self.attestation_pool.unaggregated_attestation_count(),
            ),
            (
                AGGREGATED_POOL,
                self.attestation_pool.aggregated_attestation_count(),
            ),
            (BLOCK_POOL, self.attestation_pool.block_attestation_count()),
            (
                FORKCHOICE_POOL,
                self.attestation_pool.forkchoice_attestation_count(),
            ),
        ] {
            set_int_gauge_vec(&ATTESTATION_POOL_SIZE, size as i64, &[pool]);
        }
        set_int_gauge_vec(
            &SYNC_CONTRIBUTION_POOL_SIZE,
            self.sync_contribution_pool.sync_committee_contribution_count() as i64,
            &[],
        );
    }
}
