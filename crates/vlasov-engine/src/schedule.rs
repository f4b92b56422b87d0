//! Fixed-cadence frame schedule, independent of the adaptive step count.

use vlasov_core::FrameIndex;

/// Decides when a diagnostic frame is due.
///
/// Frame 0 is the initial state. Frames `1..=n_frames` fire when the
/// clock meets or crosses `t_start + k * period`, or reaches `t_end`.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSchedule {
    t_start: f64,
    t_end: f64,
    period: f64,
    n_frames: u32,
    next: FrameIndex,
    written: u32,
}

impl FrameSchedule {
    /// A schedule of `n_frames` frames evenly spaced over `[t_start, t_end]`.
    pub fn new(t_start: f64, t_end: f64, n_frames: u32) -> Self {
        let n_frames = n_frames.max(1);
        Self {
            t_start,
            t_end,
            period: (t_end - t_start) / f64::from(n_frames),
            n_frames,
            next: FrameIndex(0),
            written: 0,
        }
    }

    /// Spacing between thresholds.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Index the next frame will get.
    pub fn next_frame(&self) -> FrameIndex {
        self.next
    }

    /// Frames handed out so far, including frame 0.
    pub fn frames_written(&self) -> u32 {
        self.written
    }

    /// Whether every frame has been handed out.
    pub fn is_complete(&self) -> bool {
        self.next.0 > self.n_frames
    }

    /// Time the next frame is nominally due.
    pub fn next_threshold(&self) -> f64 {
        if self.next.0 == self.n_frames {
            self.t_end
        } else {
            self.t_start + f64::from(self.next.0) * self.period
        }
    }

    /// Whether a frame should be written at time `t`.
    pub fn is_due(&self, t: f64) -> bool {
        if self.is_complete() {
            return false;
        }
        t >= self.next_threshold() - self.tolerance() || t >= self.t_end
    }

    /// Hand out the next frame index and move the threshold on by one period.
    ///
    /// Once `t_end` has been reached the schedule completes, so the final
    /// frame is always written at `t_end`.
    pub fn advance(&mut self, t: f64) -> FrameIndex {
        let frame = self.next;
        self.written += 1;
        self.next = if t >= self.t_end {
            FrameIndex(self.n_frames + 1)
        } else {
            frame.next()
        };
        frame
    }

    fn tolerance(&self) -> f64 {
        1e-9 * self.period
    }
}
