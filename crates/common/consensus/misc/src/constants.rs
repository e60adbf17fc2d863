use ssz_types::typenum::{U128, U2048};

pub const SLOTS_PER_EPOCH: u64 = 32;
pub const SECONDS_PER_SLOT: u64 = 12;

/// Upper bound of a committee's participation bitlist.
pub type MaxValidatorsPerCommittee = U2048;

/// SYNC_COMMITTEE_SIZE / SYNC_COMMITTEE_SUBNET_COUNT
pub type SyncSubcommitteeSize = U128;
