use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};

/// An individual ML-DSA-87 signature.
///
/// The scheme has no aggregation operation, so aggregated votes carry one [PQSignature] per
/// participant instead of a single combined signature. The pool never verifies these bytes, it
/// only keeps them aligned with the participation bits they belong to.
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PQSignature {
    inner: Bytes,
}

impl PQSignature {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<Vec<u8>> for PQSignature {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for PQSignature {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
