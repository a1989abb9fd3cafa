//! NTP fixed-point timestamps
//!
//! Sender capture clocks travel on the wire as 64-bit NTP timestamps
//! (seconds since 1900 in the high word, binary fraction in the low
//! word). The receiver maps them to unix nanoseconds before stamping
//! frames, so everything past the transport speaks one time base.

use super::time::{unix_timestamp_ns, SECOND};

/// 64-bit NTP timestamp: Q32.32 seconds since 1 Jan 1900.
pub type NtpTimestamp = u64;

/// Nanoseconds between the NTP epoch (1 Jan 1900) and the unix epoch
/// (1 Jan 1970): 70 years plus 17 leap days.
const EPOCH_OFFSET_NS: i64 = (70 * 365 + 17) * 24 * 3600 * SECOND;

/// Current time as an NTP timestamp.
pub fn ntp_timestamp() -> NtpTimestamp {
    nanoseconds_to_ntp(unix_timestamp_ns() + EPOCH_OFFSET_NS)
}

/// Convert nanoseconds since the NTP epoch to an NTP timestamp.
///
/// # Panics
/// Panics on a negative input; NTP timestamps cannot represent times
/// before their epoch.
pub fn nanoseconds_to_ntp(ns: i64) -> NtpTimestamp {
    assert!(
        ns >= 0,
        "ntp: can not convert negative timestamp {}ns",
        ns
    );

    let seconds = (ns / SECOND) as u64;
    let frac_ns = (ns % SECOND) as u64;

    (seconds << 32) | ((frac_ns << 32) / SECOND as u64)
}

/// Convert an NTP timestamp to nanoseconds since the NTP epoch.
pub fn ntp_to_nanoseconds(ts: NtpTimestamp) -> i64 {
    let seconds = (ts >> 32) as i64;
    let nans = ((ts & 0xFFFF_FFFF) * SECOND as u64) >> 32;

    seconds * SECOND + nans as i64
}

/// Convert an NTP timestamp to unix nanoseconds.
pub fn ntp_to_unix_ns(ts: NtpTimestamp) -> i64 {
    ntp_to_nanoseconds(ts) - EPOCH_OFFSET_NS
}

/// True when two NTP timestamps differ by at most `delta`.
pub fn ntp_equal_delta(a: NtpTimestamp, b: NtpTimestamp, delta: NtpTimestamp) -> bool {
    a.max(b) - a.min(b) <= delta
}

#[cfg(test)]
mod tests {
    use super::*;

    /// one microsecond as an NTP fraction
    const DELTA_US: NtpTimestamp = (1u64 << 32) / 1_000_000;

    #[test]
    fn test_seconds_map_to_high_word() {
        let ts = nanoseconds_to_ntp(5 * SECOND);
        assert_eq!(ts >> 32, 5);
        assert_eq!(ts & 0xFFFF_FFFF, 0);
    }

    #[test]
    fn test_half_second_fraction() {
        let ts = nanoseconds_to_ntp(SECOND / 2);
        assert_eq!(ts >> 32, 0);
        // 0.5 s is exactly half the fraction range
        assert!(ntp_equal_delta(ts, 1u64 << 31, DELTA_US));
    }

    #[test]
    fn test_round_trip_within_quantization() {
        for ns in [0i64, 1, 999, SECOND - 1, SECOND, 3 * SECOND + 123_456_789] {
            let back = ntp_to_nanoseconds(nanoseconds_to_ntp(ns));
            // the 32-bit fraction quantizes to ~0.23 ns
            assert!(
                (back - ns).abs() <= 1,
                "round trip of {}ns drifted to {}ns",
                ns,
                back
            );
        }
    }

    #[test]
    fn test_unix_mapping_round_trip() {
        let capture_unix = 1_700_000_000 * SECOND + 250_000_000;
        let ntp = nanoseconds_to_ntp(capture_unix + super::EPOCH_OFFSET_NS);
        let back = ntp_to_unix_ns(ntp);
        assert!((back - capture_unix).abs() <= 1);
    }

    #[test]
    fn test_equal_delta() {
        let a = nanoseconds_to_ntp(SECOND);
        let b = nanoseconds_to_ntp(SECOND + 500);
        assert!(ntp_equal_delta(a, b, DELTA_US));
        assert!(!ntp_equal_delta(a, b, 0));
    }

    #[test]
    fn test_now_is_past_ntp_era_2() {
        // 2026 is firmly in the second half of the NTP era
        let seconds = ntp_timestamp() >> 32;
        assert!(seconds > 3_900_000_000, "got {} NTP seconds", seconds);
    }

    #[test]
    #[should_panic(expected = "negative timestamp")]
    fn test_negative_input_panics() {
        nanoseconds_to_ntp(-1);
    }
}
