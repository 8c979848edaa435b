//! Scan and write policies.

/// Expiration override: use the namespace default TTL.
pub const TTL_NAMESPACE_DEFAULT: i32 = 0;

/// Expiration override: the record never expires.
pub const TTL_NEVER_EXPIRE: i32 = -1;

/// Expiration override: keep the record's current expiration.
pub const TTL_DONT_UPDATE: i32 = -2;

/// Scan configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanPolicy {
    /// Maximum records delivered to the callback (0 = unbounded).
    pub max_records: u64,
}

impl ScanPolicy {
    pub fn new(max_records: u64) -> Self {
        Self { max_records }
    }
}

/// Returned by scan callbacks to continue or stop the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    Continue,
    Stop,
}

/// Write configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    /// Expiration override in seconds, or one of the `TTL_*` sentinels.
    pub expiration: i32,
    /// Store the user key alongside the record.
    pub send_key: bool,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            expiration: TTL_NAMESPACE_DEFAULT,
            send_key: false,
        }
    }
}

impl WritePolicy {
    pub fn with_expiration(mut self, expiration: i32) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn with_send_key(mut self, send_key: bool) -> Self {
        self.send_key = send_key;
        self
    }
}
