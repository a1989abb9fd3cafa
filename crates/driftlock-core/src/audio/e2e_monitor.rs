//! End-to-end latency observation without queue monitoring
//!
//! A pass-through frame reader that measures capture-to-play delay from
//! frame capture timestamps. Sessions that do not run the full latency
//! monitor (for instance, a fixed-rate sink with no resampler) insert
//! this into their read chain for observability alone; it never affects
//! playback.

use crate::audio::frame::{Frame, FrameReader};
use crate::util::time::unix_timestamp_ns;

/// Frame reader wrapper tracking end-to-end latency.
pub struct EndToEndLatencyMonitor<'a> {
    reader: &'a mut dyn FrameReader,
    ready: bool,
    e2e_latency: i64,
}

impl<'a> EndToEndLatencyMonitor<'a> {
    pub fn new(reader: &'a mut dyn FrameReader) -> Self {
        Self {
            reader,
            ready: false,
            e2e_latency: 0,
        }
    }

    /// True when the most recent frame carried a capture timestamp.
    pub fn has_latency(&self) -> bool {
        self.ready
    }

    /// Capture-to-play delay of the most recent stamped frame, in
    /// nanoseconds.
    pub fn latency(&self) -> i64 {
        self.e2e_latency
    }
}

impl FrameReader for EndToEndLatencyMonitor<'_> {
    fn read(&mut self, frame: &mut Frame) -> bool {
        let res = self.reader.read(frame);

        if frame.capture_timestamp() != 0 {
            self.ready = true;
            self.e2e_latency = unix_timestamp_ns() - frame.capture_timestamp();
        } else {
            self.ready = false;
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::time::MILLISECOND;

    /// Hands out frames with a scripted sequence of capture timestamps.
    struct StampedReader {
        offsets_ns: Vec<i64>,
        pos: usize,
    }

    impl FrameReader for StampedReader {
        fn read(&mut self, frame: &mut Frame) -> bool {
            let offset = self.offsets_ns[self.pos];
            self.pos += 1;
            frame.set_capture_timestamp(if offset == 0 {
                0
            } else {
                unix_timestamp_ns() - offset
            });
            true
        }
    }

    #[test]
    fn test_latency_from_capture_timestamp() {
        let mut reader = StampedReader {
            offsets_ns: vec![80 * MILLISECOND],
            pos: 0,
        };
        let mut monitor = EndToEndLatencyMonitor::new(&mut reader);
        let mut frame = Frame::new(64);

        assert!(monitor.read(&mut frame));
        assert!(monitor.has_latency());

        let error = monitor.latency() - 80 * MILLISECOND;
        assert!(
            error.abs() < 2 * MILLISECOND,
            "expected ~80ms, got {}ns",
            monitor.latency()
        );
    }

    #[test]
    fn test_unstamped_frame_resets_readiness() {
        let mut reader = StampedReader {
            offsets_ns: vec![80 * MILLISECOND, 0],
            pos: 0,
        };
        let mut monitor = EndToEndLatencyMonitor::new(&mut reader);
        let mut frame = Frame::new(64);

        assert!(monitor.read(&mut frame));
        assert!(monitor.has_latency());

        assert!(monitor.read(&mut frame));
        assert!(
            !monitor.has_latency(),
            "a frame without a capture timestamp clears readiness"
        );
    }
}
