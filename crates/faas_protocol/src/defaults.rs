//! Canonical default values shared across the Director and Worker.

pub const DEFAULT_DIRECTOR_BIND_ADDR: &str = "tcp://127.0.0.1:5555";

pub const DEFAULT_HEARTBEAT_CHECK_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_EXPECTED_HEARTBEAT_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_SYNCHRONIZATION_INTERVAL_MS: u64 = 5_000;

/// A Worker is considered dead after this many missed expected-heartbeat
/// intervals (spec.md §4.1, §8).
pub const HEARTBEAT_MISS_TOLERANCE: u64 = 2;

pub const DEFAULT_CACHE_MAX_SIZE: usize = 128;

pub const DEFAULT_CLIENT_RECV_TIMEOUT_MS: u64 = 5_000;

pub const WORKER_IDENTITY_PREFIX: &str = "worker-";
pub const CLIENT_IDENTITY_PREFIX: &str = "client-";
