//! Expiration policy.
//!
//! Timestamps are whole seconds since the epoch stored as `u32`, matching
//! the width of the on-disk header. `0` means the entry never expires.
//! Arithmetic wraps at `u32::MAX` (year 2106) rather than widening, so
//! records written by older builds keep their meaning.

use std::time::{SystemTime, UNIX_EPOCH};

/// Sentinel expiration for entries that never expire.
pub const NEVER: u32 = 0;

/// Current time in whole epoch seconds, truncated to the on-disk width.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as u32)
}

/// Whether an entry with `expiration` is expired at `now`.
#[must_use]
pub fn is_expired(expiration: u32, now: u32) -> bool {
    expiration != NEVER && expiration < now
}

/// Converts a relative TTL into an absolute expiration.
///
/// A TTL of `0` yields [`NEVER`].
#[must_use]
pub fn compute_expiration(ttl: u32, now: u32) -> u32 {
    if ttl == 0 {
        NEVER
    } else {
        now.wrapping_add(ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_never_sentinel() {
        assert_eq!(compute_expiration(0, 1_700_000_000), NEVER);
        assert!(!is_expired(NEVER, 0));
        assert!(!is_expired(NEVER, u32::MAX));
    }

    #[test]
    fn test_expired_strictly_after() {
        assert!(!is_expired(100, 99));
        assert!(!is_expired(100, 100));
        assert!(is_expired(100, 101));
    }

    #[test]
    fn test_compute_wraps_at_u32() {
        assert_eq!(compute_expiration(10, u32::MAX - 4), 5);
    }

    #[test]
    fn test_now_is_recent() {
        // 2023-11-14, comfortably in the past for any test run
        assert!(now() > 1_700_000_000);
    }

    proptest! {
        #[test]
        fn prop_live_before_ttl_elapses(ttl in 1u32..1_000_000, t0 in 1u32..3_000_000_000) {
            let exp = compute_expiration(ttl, t0);
            prop_assert!(!is_expired(exp, t0 + ttl - 1));
            prop_assert!(!is_expired(exp, t0));
        }

        #[test]
        fn prop_expired_after_ttl_elapses(ttl in 1u32..1_000_000, t0 in 1u32..3_000_000_000) {
            let exp = compute_expiration(ttl, t0);
            prop_assert!(is_expired(exp, t0 + ttl + 1));
        }

        #[test]
        fn prop_zero_ttl_never_expires(t0 in any::<u32>(), later in any::<u32>()) {
            prop_assert!(!is_expired(compute_expiration(0, t0), later));
        }
    }
}
