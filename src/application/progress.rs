use crate::domain::jobs::{ClipStatus, Progress};
use tokio::sync::watch;

/// Single writer for a session's progress, published over a watch channel.
///
/// Workers report here as each job terminates so subscribers see live counts
/// rather than batch-boundary snapshots.
#[derive(Debug)]
pub struct ProgressTracker {
    sender: watch::Sender<Progress>,
    total_frames: usize,
}

impl ProgressTracker {
    pub fn new(sender: watch::Sender<Progress>, total_frames: usize, total_batches: usize) -> Self {
        sender.send_replace(Progress::new(total_batches));
        Self {
            sender,
            total_frames,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.sender.subscribe()
    }

    /// 1-based batch number currently running.
    pub fn enter_batch(&self, batch: usize) {
        self.sender.send_modify(|p| p.current_batch = batch);
    }

    pub fn record(&self, status: ClipStatus) {
        let total_frames = self.total_frames;
        self.sender.send_if_modified(|p| {
            match status {
                ClipStatus::Completed => p.completed += 1,
                ClipStatus::Failed => p.failed += 1,
                _ => return false,
            }
            p.refresh_percent(total_frames);
            true
        });
    }

    pub fn snapshot(&self) -> Progress {
        self.sender.borrow().clone()
    }
}
