use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use alloy_primitives::B256;
use parking_lot::{Mutex, RwLock};
use ream_consensus_misc::attestation::AggregationBits;

use crate::{bitlist::contains, errors::PoolError};

pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        *self.now.lock() += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Debug)]
struct SeenRecord {
    /// No pattern is contained in another one.
    patterns: Vec<AggregationBits>,
    expires_at: Instant,
}

/// Remembers which participation patterns have already been observed for each data root, so
/// that votes fully covered by something seen before can be dropped.
#[derive(Debug)]
pub struct SeenTracker {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    records: RwLock<HashMap<B256, SeenRecord>>,
}

impl SeenTracker {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert_seen_bits(&self, data_root: B256, bits: &AggregationBits) -> Result<(), PoolError> {
        let now = self.clock.now();
        let mut records = self.records.write();

        let record = records.entry(data_root).or_insert_with(|| SeenRecord {
            patterns: vec![],
            expires_at: now + self.ttl,
        });

        if record.expires_at <= now {
            record.patterns.clear();
        }

        for pattern in &record.patterns {
            if contains(pattern, bits)? {
                return Ok(());
            }
        }

        let mut patterns = Vec::with_capacity(record.patterns.len() + 1);
        for pattern in record.patterns.drain(..) {
            if !contains(bits, &pattern)? {
                patterns.push(pattern);
            }
        }
        patterns.push(bits.clone());

        record.patterns = patterns;
        record.expires_at = now + self.ttl;

        Ok(())
    }

    pub fn has_seen_bits(&self, data_root: B256, bits: &AggregationBits) -> Result<bool, PoolError> {
        let now = self.clock.now();
        let records = self.records.read();

        let Some(record) = records.get(&data_root) else {
            return Ok(false);
        };

        if record.expires_at <= now {
            return Ok(false);
        }

        for pattern in &record.patterns {
            if contains(pattern, bits)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Drops expired records and returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut records = self.records.write();

        let before = records.len();
        records.retain(|_, record| record.expires_at > now);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
