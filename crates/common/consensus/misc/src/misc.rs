use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns `None` before genesis.
pub fn get_current_slot(genesis_time: u64, seconds_per_slot: u64) -> Option<u64> {
    let genesis_instant = UNIX_EPOCH + Duration::from_secs(genesis_time);
    let elapsed = SystemTime::now().duration_since(genesis_instant).ok()?;

    elapsed.as_secs().checked_div(seconds_per_slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_slot_before_genesis() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX EPOCH")
            .as_secs();

        assert_eq!(get_current_slot(now + 3600, 12), None);
        assert!(get_current_slot(0, 12).is_some());
        assert_eq!(get_current_slot(0, 0), None);
    }
}
