use crate::application::progress::ProgressTracker;
use crate::application::worker::{ClipWorker, PollConfig};
use crate::domain::batch::BatchPlan;
use crate::domain::jobs::{ClipJob, ClipStatus, FrameRef, GenerationSession, Progress};
use crate::domain::retry::RetryPolicy;
use crate::error::ValidationError;
use crate::ports::{FramePreprocessor, VideoGenerationProvider};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub const DEFAULT_PROMPT: &str =
    "Animate this image with smooth, natural motion while keeping the composition intact";

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause between consecutive batches, never after the last one.
    pub batch_cooldown: Duration,
    pub poll: PollConfig,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_cooldown: Duration::from_secs(12),
            poll: PollConfig::default(),
            retry_base_delay: Duration::from_millis(2000),
            retry_max_delay: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub batch_size: usize,
    pub prompt: String,
    pub max_retries: u32,
    pub clip_duration_seconds: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            batch_size: 3,
            prompt: DEFAULT_PROMPT.to_string(),
            max_retries: 2,
            clip_duration_seconds: 5,
        }
    }
}

/// Caller-side handles into a running session: live progress and a
/// cooperative abort checked between batches.
#[derive(Debug)]
pub struct GenerationControl {
    pub progress: watch::Sender<Progress>,
    pub cancel: CancellationToken,
}

impl Default for GenerationControl {
    fn default() -> Self {
        let (progress, _) = watch::channel(Progress::default());
        Self {
            progress,
            cancel: CancellationToken::new(),
        }
    }
}

impl GenerationControl {
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }
}

pub struct ClipOrchestrator<P> {
    provider: Arc<P>,
    config: OrchestratorConfig,
    preprocessor: Option<Arc<dyn FramePreprocessor>>,
}

impl<P> ClipOrchestrator<P>
where
    P: VideoGenerationProvider + 'static,
{
    pub fn new(provider: Arc<P>, config: OrchestratorConfig) -> Self {
        Self {
            provider,
            config,
            preprocessor: None,
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn FramePreprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub async fn generate(
        &self,
        frames: &[FrameRef],
        options: &GenerationOptions,
    ) -> Result<GenerationSession, ValidationError> {
        self.generate_with(frames, options, GenerationControl::default())
            .await
    }

    /// One clip per frame. Jobs of a batch run concurrently, batches run one
    /// after the other with a cooldown in between.
    ///
    /// Partial failure is not an error: the session succeeds when at least one
    /// clip completed.
    pub async fn generate_with(
        &self,
        frames: &[FrameRef],
        options: &GenerationOptions,
        control: GenerationControl,
    ) -> Result<GenerationSession, ValidationError> {
        let plan = BatchPlan::new(frames.len(), options.batch_size)?;
        let session_id = Uuid::new_v4().to_string();
        let tracker = ProgressTracker::new(control.progress, frames.len(), plan.count());

        let policy = RetryPolicy::new(options.max_retries)
            .with_base_delay(self.config.retry_base_delay)
            .with_max_delay(self.config.retry_max_delay);
        let worker = ClipWorker::new(self.provider.clone(), policy, self.config.poll.clone())
            .with_preprocessor(self.preprocessor.clone());

        let mut jobs: Vec<ClipJob> = frames
            .iter()
            .enumerate()
            .map(|(index, frame)| ClipJob::new(index, frame.url.clone()))
            .collect();

        info!(
            session_id = %session_id,
            frames = frames.len(),
            batches = plan.count(),
            batch_size = options.batch_size,
            "Starting generation session"
        );

        let mut cancelled = false;
        for (b, range) in plan.batches().enumerate() {
            if b > 0 {
                info!(
                    session_id = %session_id,
                    cooldown_secs = self.config.batch_cooldown.as_secs_f64(),
                    "Cooling down before next batch"
                );
                tokio::select! {
                    _ = control.cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.config.batch_cooldown) => {}
                }
            }
            if control.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            tracker.enter_batch(b + 1);
            info!(session_id = %session_id, batch = b + 1, frames = ?range, "Dispatching batch");

            let worker = &worker;
            let tracker = &tracker;
            let runs = jobs[range.clone()]
                .iter_mut()
                .zip(&frames[range])
                .map(|(job, frame)| {
                    let span = info_span!(
                        "clip",
                        session_id = %session_id,
                        batch = b + 1,
                        frame_index = job.frame_index()
                    );
                    async move {
                        worker
                            .run(job, frame, &options.prompt, options.clip_duration_seconds)
                            .await;
                        tracker.record(job.status());
                    }
                    .instrument(span)
                });
            join_all(runs).await;
        }

        if cancelled {
            let mut skipped = 0;
            for job in jobs.iter_mut().filter(|job| job.status() == ClipStatus::Pending) {
                job.fail("cancelled");
                tracker.record(ClipStatus::Failed);
                skipped += 1;
            }
            warn!(session_id = %session_id, skipped, "Generation cancelled");
        }

        let progress = tracker.snapshot();
        let session = GenerationSession {
            session_id,
            total_frames: frames.len(),
            success: progress.completed > 0,
            jobs,
            progress,
            cancelled,
        };

        info!(
            session_id = %session.session_id,
            completed = session.progress.completed,
            failed = session.progress.failed,
            success = session.success,
            "Generation session finished"
        );
        Ok(session)
    }
}
