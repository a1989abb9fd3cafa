//! Audio frames pulled through the session read path

/// One block of interleaved samples moving through the session.
///
/// Frames are allocated by the caller and refilled on every read; the
/// read path itself never allocates.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    samples: Vec<f32>,
    capture_timestamp: i64,
}

impl Frame {
    /// Create a zeroed frame holding `num_samples` interleaved samples.
    pub fn new(num_samples: usize) -> Self {
        Self {
            samples: vec![0.0; num_samples],
            capture_timestamp: 0,
        }
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Unix nanoseconds when the sender captured the first sample of
    /// this frame. Zero means unknown and is ignored downstream.
    pub fn capture_timestamp(&self) -> i64 {
        self.capture_timestamp
    }

    pub fn set_capture_timestamp(&mut self, ns: i64) {
        self.capture_timestamp = ns;
    }
}

/// Downstream frame source the session pulls from (typically the
/// resampler at the end of the per-session chain).
pub trait FrameReader {
    /// Fill the frame with the next block of samples.
    ///
    /// Returns false when the stream has ended or the source failed;
    /// frame contents are unspecified in that case.
    fn read(&mut self, frame: &mut Frame) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_silent() {
        let frame = Frame::new(256);
        assert_eq!(frame.num_samples(), 256);
        assert!(frame.samples().iter().all(|&s| s == 0.0));
        assert_eq!(frame.capture_timestamp(), 0, "capture defaults to unknown");
    }

    #[test]
    fn test_capture_timestamp_round_trip() {
        let mut frame = Frame::new(16);
        frame.set_capture_timestamp(1_700_000_000_000_000_000);
        assert_eq!(frame.capture_timestamp(), 1_700_000_000_000_000_000);
    }
}
