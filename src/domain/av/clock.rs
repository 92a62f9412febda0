/// Constant-rate output timeline.
///
/// Source frames arrive at their own timestamps; the output runs at a fixed
/// frame rate. The most recent composite is held and repeated until the
/// output catches up with the next source timestamp, so every clip occupies
/// exactly its natural duration on the output.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frame_rate: u32,
    emitted: i64,
}

impl FrameClock {
    pub fn new(frame_rate: u32) -> Self {
        Self {
            frame_rate: frame_rate.max(1),
            emitted: 0,
        }
    }

    /// Output frames needed so the timeline reaches `seconds`.
    pub fn frames_until(&self, seconds: f64) -> i64 {
        let target = (seconds.max(0.0) * self.frame_rate as f64).round() as i64;
        (target - self.emitted).max(0)
    }

    /// Claim the next output frame index (its PTS in `1/frame_rate` units).
    pub fn tick(&mut self) -> i64 {
        let pts = self.emitted;
        self.emitted += 1;
        pts
    }

    pub fn emitted(&self) -> i64 {
        self.emitted
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.emitted as f64 / self.frame_rate as f64
    }
}
