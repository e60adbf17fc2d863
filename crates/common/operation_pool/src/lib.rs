pub mod aggregation;
pub mod attestation;
pub mod bitlist;
pub mod config;
pub mod errors;
pub mod seen;
pub mod service;
pub mod sync_contribution;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_utils;
