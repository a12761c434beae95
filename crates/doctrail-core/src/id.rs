//! Document identifier generation
//!
//! Ids are random UUIDs drawn from the OS random source. When that source is
//! unavailable, a timestamp-based id is produced instead: the current time in
//! milliseconds as base 36 followed by 6 random base-36 characters. Both forms
//! are URL-safe and neither path can fail.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::rngs::{OsRng, SmallRng};
use rand::{Rng, RngCore, SeedableRng};
use tracing::warn;
use uuid::Builder;

/// Number of random characters appended to a fallback id
const FALLBACK_SUFFIX_LEN: usize = 6;

/// Mixed into fallback seeds so ids minted in the same instant differ
static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new globally-unique document id
pub fn new_id() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string(),
        Err(e) => {
            warn!("OS random source unavailable ({}), using timestamp id", e);
            fallback_id()
        }
    }
}

/// Timestamp-plus-random id used when the OS random source is unavailable
pub fn fallback_id() -> String {
    let now = Utc::now();
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    let nanos = u64::from(now.timestamp_subsec_nanos());
    let count = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut rng = SmallRng::seed_from_u64(nanos ^ millis.rotate_left(17) ^ count.rotate_left(43));
    let suffix: String = (0..FALLBACK_SUFFIX_LEN)
        .map(|_| std::char::from_digit(rng.gen_range(0..36), 36).unwrap_or('0'))
        .collect();

    format!("{}{}", to_base36(millis), suffix)
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = (value % 36) as u32;
        digits.push(std::char::from_digit(digit, 36).unwrap_or('0'));
        value /= 36;
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    #[test]
    fn test_new_id_is_uuid() {
        let id = new_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_new_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_fallback_id_shape() {
        let id = fallback_id();
        assert!(id.len() > FALLBACK_SUFFIX_LEN);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert!(Uuid::parse_str(&id).is_err());
    }

    #[test]
    fn test_fallback_ids_differ_in_same_instant() {
        let ids: HashSet<String> = (0..200).map(|_| fallback_id()).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_295), "zz");
    }
}
