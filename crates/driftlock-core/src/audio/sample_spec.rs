//! Sample stream parameters and time/sample arithmetic
//!
//! A [`SampleSpec`] describes one end of the pipeline (the sender's or
//! the sink's format) and converts between wall-clock nanoseconds and
//! rate-dependent sample counts. All conversions round to the nearest
//! sample and saturate instead of wrapping on multi-hour intervals.

use crate::packet::StreamTimestampDelta;
use crate::util::time::SECOND;

/// Bitmask of active channels (bit N = channel N).
pub type ChannelMask = u64;

/// Encoding of individual samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// 32-bit float, the pipeline's internal format
    F32,
    /// 16-bit signed integer, the common wire format
    S16,
}

/// Parameters of a sample stream: rate, channel mask, sample format.
///
/// # Example
/// ```
/// use driftlock_core::audio::sample_spec::{SampleFormat, SampleSpec};
///
/// let spec = SampleSpec::new(48000, 0x3, SampleFormat::F32);
/// assert_eq!(spec.num_channels(), 2);
/// // one millisecond is 48 samples per channel
/// assert_eq!(spec.ns_to_samples_per_chan(1_000_000), 48);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpec {
    sample_rate: u32,
    channel_mask: ChannelMask,
    sample_format: SampleFormat,
}

impl SampleSpec {
    pub fn new(sample_rate: u32, channel_mask: ChannelMask, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channel_mask,
            sample_format,
        }
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Mask of active channels.
    pub fn channel_mask(&self) -> ChannelMask {
        self.channel_mask
    }

    /// Number of active channels.
    pub fn num_channels(&self) -> usize {
        self.channel_mask.count_ones() as usize
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    /// Convert a signed nanosecond interval to a stream-timestamp
    /// difference at this rate.
    ///
    /// Rounds to the nearest sample. Intervals that do not fit the
    /// signed 32-bit timestamp range saturate rather than wrap.
    ///
    /// A zero-rate spec converts everything to zero; the latency monitor
    /// rejects such specs at construction.
    pub fn ns_to_stream_timestamp(&self, ns: i64) -> StreamTimestampDelta {
        let samples = (ns as f64 * self.sample_rate as f64 / SECOND as f64).round();

        if samples >= StreamTimestampDelta::MAX as f64 {
            StreamTimestampDelta::MAX
        } else if samples <= StreamTimestampDelta::MIN as f64 {
            StreamTimestampDelta::MIN
        } else {
            samples as StreamTimestampDelta
        }
    }

    /// Convert a stream-timestamp difference to nanoseconds at this rate.
    pub fn stream_timestamp_to_ns(&self, ts: StreamTimestampDelta) -> i64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (ts as f64 * SECOND as f64 / self.sample_rate as f64).round() as i64
    }

    /// Convert a non-negative nanosecond interval to samples per channel.
    ///
    /// # Panics
    /// Panics on a negative interval; durations are never negative.
    pub fn ns_to_samples_per_chan(&self, ns: i64) -> u64 {
        assert!(ns >= 0, "sample spec: negative duration {}ns", ns);
        (ns as f64 * self.sample_rate as f64 / SECOND as f64).round() as u64
    }

    /// Convert a per-channel sample count to nanoseconds.
    pub fn samples_per_chan_to_ns(&self, samples: u64) -> i64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (samples as f64 * SECOND as f64 / self.sample_rate as f64).round() as i64
    }

    /// Convert a non-negative nanosecond interval to an overall sample
    /// count across all channels.
    pub fn ns_to_samples_overall(&self, ns: i64) -> u64 {
        self.ns_to_samples_per_chan(ns) * self.num_channels() as u64
    }

    /// Convert an overall sample count (all channels) to nanoseconds.
    ///
    /// # Panics
    /// Panics when `samples` is not a multiple of the channel count.
    pub fn samples_overall_to_ns(&self, samples: u64) -> i64 {
        let num_channels = self.num_channels() as u64;
        assert!(
            num_channels > 0 && samples % num_channels == 0,
            "sample spec: overall count {} not divisible by {} channels",
            samples,
            num_channels
        );
        self.samples_per_chan_to_ns(samples / num_channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44100;

    fn spec_with_channels(num_channels: u32) -> SampleSpec {
        SampleSpec::new(
            SAMPLE_RATE,
            ((1u64 << num_channels) - 1) as ChannelMask,
            SampleFormat::F32,
        )
    }

    #[test]
    fn test_num_channels_from_mask() {
        for num_channels in 1..32 {
            let spec = spec_with_channels(num_channels);
            assert_eq!(spec.num_channels(), num_channels as usize);
        }
    }

    #[test]
    fn test_ns_to_samples_rounding() {
        let spec = spec_with_channels(2);
        let half_period = SECOND / (2 * SAMPLE_RATE as i64);

        // just past half a sample period rounds up, just short rounds down
        assert_eq!(spec.ns_to_samples_per_chan(half_period + 1), 1);
        assert_eq!(spec.ns_to_samples_per_chan(half_period - 1), 0);

        let period = SECOND / SAMPLE_RATE as i64;
        assert_eq!(spec.ns_to_samples_per_chan(period), 1);
        assert_eq!(spec.ns_to_samples_per_chan(2 * period), 2);
        assert_eq!(spec.ns_to_stream_timestamp(period), 1);
        assert_eq!(spec.ns_to_stream_timestamp(2 * period), 2);
    }

    #[test]
    fn test_ns_to_samples_overall() {
        for num_channels in 1..32u32 {
            let spec = spec_with_channels(num_channels);
            let period = SECOND / SAMPLE_RATE as i64;

            assert_eq!(spec.ns_to_samples_overall(period), num_channels as u64);
            assert_eq!(spec.ns_to_samples_overall(2 * period), 2 * num_channels as u64);
        }
    }

    #[test]
    fn test_samples_to_ns() {
        let epsilon = (0.01 / SAMPLE_RATE as f64 * SECOND as f64) as i64;
        let sampling_period = (1.0 / SAMPLE_RATE as f64 * SECOND as f64) as i64;

        for num_channels in 1..32u32 {
            let spec = spec_with_channels(num_channels);

            assert!((spec.samples_per_chan_to_ns(1) - sampling_period).abs() <= epsilon);
            assert!(
                (spec.samples_overall_to_ns(num_channels as u64) - sampling_period).abs()
                    <= epsilon
            );
            assert!((spec.stream_timestamp_to_ns(1) - sampling_period).abs() <= epsilon);
        }
    }

    #[test]
    fn test_round_trip_within_one_sample() {
        let spec = spec_with_channels(2);
        let period = SECOND / SAMPLE_RATE as i64;

        for ns in [1_000_000i64, 80_000_000, 200_000_000, 5 * SECOND] {
            let ts = spec.ns_to_stream_timestamp(ns);
            let back = spec.stream_timestamp_to_ns(ts);
            assert!(
                (back - ns).abs() <= period,
                "round trip of {}ns drifted to {}ns",
                ns,
                back
            );
        }
    }

    #[test]
    fn test_conversion_saturates() {
        let spec = spec_with_channels(2);

        // a year of audio does not fit the signed timestamp range
        let huge = 365 * 24 * 3600 * SECOND;
        assert_eq!(spec.ns_to_stream_timestamp(huge), StreamTimestampDelta::MAX);
        assert_eq!(spec.ns_to_stream_timestamp(-huge), StreamTimestampDelta::MIN);
    }

    #[test]
    fn test_zero_rate_converts_to_zero() {
        let spec = SampleSpec::new(0, 0x3, SampleFormat::F32);
        assert_eq!(spec.ns_to_stream_timestamp(SECOND), 0);
        assert_eq!(spec.stream_timestamp_to_ns(48000), 0);
    }

    #[test]
    #[should_panic(expected = "negative duration")]
    fn test_negative_duration_panics() {
        spec_with_channels(2).ns_to_samples_per_chan(-1);
    }
}
