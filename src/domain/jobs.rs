use serde::{Deserialize, Serialize};

/// A source still image, as listed by a frame source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRef {
    pub key: String,
    pub url: String,
    pub name: String,
}

impl FrameRef {
    pub fn new(key: impl Into<String>, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    Pending,
    Generating,
    Retrying,
    Completed,
    Failed,
}

impl ClipStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ClipStatus::Completed | ClipStatus::Failed)
    }
}

/// One source frame turned into one generated clip.
///
/// Transitions return `false` and leave the job untouched when they are not
/// legal from the current status; `Completed` and `Failed` absorb everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipJob {
    frame_index: usize,
    source_ref: String,
    status: ClipStatus,
    retry_count: u32,
    output_ref: Option<String>,
    error_message: Option<String>,
    duration_seconds: Option<f64>,
}

impl ClipJob {
    pub fn new(frame_index: usize, source_ref: impl Into<String>) -> Self {
        Self {
            frame_index,
            source_ref: source_ref.into(),
            status: ClipStatus::Pending,
            retry_count: 0,
            output_ref: None,
            error_message: None,
            duration_seconds: None,
        }
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn source_ref(&self) -> &str {
        &self.source_ref
    }

    pub fn status(&self) -> ClipStatus {
        self.status
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn output_ref(&self) -> Option<&str> {
        self.output_ref.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration_seconds
    }

    /// Pending or Retrying -> Generating.
    pub fn start(&mut self) -> bool {
        match self.status {
            ClipStatus::Pending | ClipStatus::Retrying => {
                self.status = ClipStatus::Generating;
                true
            }
            _ => false,
        }
    }

    /// Generating -> Completed.
    pub fn complete(&mut self, output_ref: impl Into<String>, duration_seconds: Option<f64>) -> bool {
        if self.status != ClipStatus::Generating {
            return false;
        }
        self.status = ClipStatus::Completed;
        self.output_ref = Some(output_ref.into());
        self.duration_seconds = duration_seconds;
        true
    }

    /// Generating -> Retrying, bumping the retry count.
    pub fn schedule_retry(&mut self) -> bool {
        if self.status != ClipStatus::Generating {
            return false;
        }
        self.status = ClipStatus::Retrying;
        self.retry_count += 1;
        true
    }

    /// Any non-terminal status -> Failed.
    ///
    /// Besides the regular Generating -> Failed edge this also covers jobs that
    /// were never dispatched because the session was cancelled.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ClipStatus::Failed;
        self.error_message = Some(message.into());
        true
    }
}

/// Aggregate counters, updated as each job terminates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub failed: usize,
    pub current_batch: usize,
    pub total_batches: usize,
    pub percent: u8,
}

impl Progress {
    pub fn new(total_batches: usize) -> Self {
        Self {
            total_batches,
            ..Default::default()
        }
    }

    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    /// Recompute `percent` as `round(100 * finished / total_frames)`.
    pub fn refresh_percent(&mut self, total_frames: usize) {
        if total_frames == 0 {
            self.percent = 0;
            return;
        }
        let percent = (100.0 * self.finished() as f64 / total_frames as f64).round();
        self.percent = percent.min(100.0) as u8;
    }
}

/// Result of one orchestration run. Read-only once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSession {
    pub session_id: String,
    pub total_frames: usize,
    pub jobs: Vec<ClipJob>,
    pub progress: Progress,
    pub success: bool,
    pub cancelled: bool,
}

impl GenerationSession {
    /// Completed clips in ascending frame order, ready to be merged.
    pub fn completed_clips(&self) -> Vec<ClipSource> {
        self.jobs
            .iter()
            .filter_map(|job| {
                job.output_ref().map(|url| ClipSource {
                    url: url.to_string(),
                    duration_seconds: job.duration_seconds(),
                })
            })
            .collect()
    }
}

/// A clip handed to the merge stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSource {
    pub url: String,
    pub duration_seconds: Option<f64>,
}

impl ClipSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            duration_seconds: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_sets_output_only_on_completion() {
        let mut job = ClipJob::new(0, "frames/a.png");
        assert_eq!(job.status(), ClipStatus::Pending);
        assert!(job.output_ref().is_none());

        assert!(job.start());
        assert!(job.output_ref().is_none());
        assert!(job.complete("https://cdn/clip-0.mp4", Some(5.0)));

        assert_eq!(job.status(), ClipStatus::Completed);
        assert_eq!(job.output_ref(), Some("https://cdn/clip-0.mp4"));
        assert_eq!(job.duration_seconds(), Some(5.0));
        assert!(job.error_message().is_none());
    }

    #[test]
    fn test_retry_cycle_counts_retries() {
        let mut job = ClipJob::new(3, "frames/d.png");
        job.start();
        assert!(job.schedule_retry());
        assert_eq!(job.status(), ClipStatus::Retrying);
        assert!(job.start());
        assert!(job.schedule_retry());
        assert!(job.start());
        assert!(job.fail("provider error: rejected"));

        assert_eq!(job.retry_count(), 2);
        assert_eq!(job.status(), ClipStatus::Failed);
        assert_eq!(job.error_message(), Some("provider error: rejected"));
        assert!(job.output_ref().is_none());
    }

    #[test]
    fn test_no_transition_skips_generating() {
        let mut job = ClipJob::new(0, "a");
        assert!(!job.complete("x", None));
        assert!(!job.schedule_retry());
        assert_eq!(job.status(), ClipStatus::Pending);
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        let mut done = ClipJob::new(0, "a");
        done.start();
        done.complete("x", None);
        assert!(!done.start());
        assert!(!done.fail("late"));
        assert!(!done.schedule_retry());
        assert_eq!(done.status(), ClipStatus::Completed);
        assert!(done.error_message().is_none());

        let mut failed = ClipJob::new(1, "b");
        failed.fail("cancelled");
        assert!(!failed.start());
        assert!(!failed.complete("x", None));
        assert_eq!(failed.status(), ClipStatus::Failed);
    }

    #[test]
    fn test_percent_rounds_against_total_frames() {
        let mut progress = Progress::new(3);
        progress.completed = 1;
        progress.refresh_percent(3);
        assert_eq!(progress.percent, 33);

        progress.completed = 2;
        progress.refresh_percent(3);
        assert_eq!(progress.percent, 67);

        progress.failed = 1;
        progress.refresh_percent(3);
        assert_eq!(progress.percent, 100);
    }

    #[test]
    fn test_completed_clips_keep_frame_order_and_skip_failures() {
        let mut jobs: Vec<ClipJob> = (0..3).map(|i| ClipJob::new(i, format!("f{i}"))).collect();
        for job in &mut jobs {
            job.start();
        }
        jobs[0].complete("c0", Some(5.0));
        jobs[1].fail("boom");
        jobs[2].complete("c2", None);

        let session = GenerationSession {
            session_id: "s".into(),
            total_frames: 3,
            jobs,
            progress: Progress::default(),
            success: true,
            cancelled: false,
        };

        let urls: Vec<_> = session.completed_clips().into_iter().map(|c| c.url).collect();
        assert_eq!(urls, vec!["c0", "c2"]);
    }
}
