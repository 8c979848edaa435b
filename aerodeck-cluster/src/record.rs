//! Records returned by reads and scans.

use crate::value::Value;
use chrono::Utc;
use std::collections::BTreeMap;

/// Named bins of a record.
pub type Bins = BTreeMap<String, Value>;

/// Offset of the cluster epoch (2010-01-01T00:00:00Z) from the Unix epoch, in seconds.
pub const CLUSTER_EPOCH_OFFSET: i64 = 1_262_304_000;

/// A record as stored by the cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Bin values.
    pub bins: Bins,
    /// Version counter, bumped on every write.
    pub generation: u32,
    /// Absolute expiration in seconds since the cluster epoch (0 = never expires).
    pub expiration: u32,
}

impl Record {
    pub fn new(bins: Bins, generation: u32, expiration: u32) -> Self {
        Self {
            bins,
            generation,
            expiration,
        }
    }

    /// Returns the remaining lifetime in seconds (-1 when the record never expires).
    pub fn time_to_live(&self) -> i32 {
        time_to_live_at(self.expiration, now_cluster_secs())
    }

    /// Returns whether the record has expired at the given cluster time.
    pub fn is_expired_at(&self, now: u32) -> bool {
        self.expiration != 0 && self.expiration <= now
    }
}

/// Current time in seconds since the cluster epoch.
pub fn now_cluster_secs() -> u32 {
    let secs = Utc::now().timestamp() - CLUSTER_EPOCH_OFFSET;
    secs.clamp(0, u32::MAX as i64) as u32
}

/// Remaining lifetime for an expiration at a given cluster time.
///
/// Never-expiring records report -1; records at or past their expiration report 1.
pub fn time_to_live_at(expiration: u32, now: u32) -> i32 {
    if expiration == 0 {
        return -1;
    }
    if expiration > now {
        (expiration - now).min(i32::MAX as u32) as i32
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_to_live() {
        assert_eq!(time_to_live_at(0, 1000), -1);
        assert_eq!(time_to_live_at(1060, 1000), 60);
        assert_eq!(time_to_live_at(900, 1000), 1);
    }

    #[test]
    fn test_expiry() {
        let record = Record::new(Bins::new(), 1, 100);
        assert!(record.is_expired_at(100));
        assert!(!record.is_expired_at(99));
        assert!(!Record::new(Bins::new(), 1, 0).is_expired_at(u32::MAX));
    }

    #[test]
    fn test_now_is_after_epoch() {
        assert!(now_cluster_secs() > 0);
    }
}
