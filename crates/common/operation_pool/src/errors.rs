use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Bitlist length mismatch: {left} != {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Aggregation bits overlap")]
    BitsOverlap,

    #[error("Invalid number of items to aggregate")]
    InvalidCount,

    #[error("Attestation is not unaggregated, {0} bits set")]
    NotUnaggregated(usize),

    #[error("Attestation is not aggregated, {0} bits set")]
    NotAggregated(usize),

    #[error("Signature count {signatures} does not match participant count {participants}")]
    SignatureCountMismatch {
        signatures: usize,
        participants: usize,
    },

    #[error("Bitfield error: {0}")]
    Bitfield(String),

    #[error("Batch item {index} rejected: {source}")]
    BatchItem {
        index: usize,
        #[source]
        source: Box<PoolError>,
    },

    #[error("Aggregation task failed: {0}")]
    AggregationTask(String),
}

impl From<ssz_types::Error> for PoolError {
    fn from(err: ssz_types::Error) -> Self {
        PoolError::Bitfield(format!("{err:?}"))
    }
}

/// Runs `operation` over every item and keeps going past failures, reporting the first one.
pub(crate) fn process_batch<T>(
    items: impl IntoIterator<Item = T>,
    mut operation: impl FnMut(T) -> Result<(), PoolError>,
) -> Result<(), PoolError> {
    let mut first_error = None;

    for (index, item) in items.into_iter().enumerate() {
        if let Err(err) = operation(item) {
            first_error.get_or_insert(PoolError::BatchItem {
                index,
                source: Box::new(err),
            });
        }
    }

    first_error.map_or(Ok(()), Err)
}
