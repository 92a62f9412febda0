use crate::domain::jobs::{ClipJob, FrameRef};
use crate::domain::retry::RetryPolicy;
use crate::error::ProviderError;
use crate::ports::provider::{
    GenerationRequest, JobHandle, PollResult, ProviderStatus, Submission, VideoGenerationProvider,
};
use crate::ports::FramePreprocessor;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Poll cadence for one submitted job. The per-call timeout and the overall
/// wait budget are independent layers.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub call_timeout: Duration,
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            call_timeout: Duration::from_secs(10),
            max_wait: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct GeneratedClip {
    url: String,
    duration_seconds: Option<f64>,
}

/// Drives a single `ClipJob` through submit, poll and retry.
pub struct ClipWorker<P: ?Sized> {
    provider: Arc<P>,
    policy: RetryPolicy,
    poll: PollConfig,
    preprocessor: Option<Arc<dyn FramePreprocessor>>,
}

impl<P> ClipWorker<P>
where
    P: VideoGenerationProvider + ?Sized,
{
    pub fn new(provider: Arc<P>, policy: RetryPolicy, poll: PollConfig) -> Self {
        Self {
            provider,
            policy,
            poll,
            preprocessor: None,
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: Option<Arc<dyn FramePreprocessor>>) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Run `job` until it reaches `Completed` or `Failed`.
    pub async fn run(&self, job: &mut ClipJob, frame: &FrameRef, prompt: &str, duration_seconds: u32) {
        let request = GenerationRequest {
            image: self.prepare(frame).await,
            prompt: prompt.to_string(),
            duration_seconds,
        };

        let mut attempt = 0;
        loop {
            job.start();
            attempt += 1;
            debug!(attempt, "Submitting clip");

            match self.attempt(&request).await {
                Ok(clip) => {
                    info!(attempt, url = %clip.url, "Clip completed");
                    job.complete(clip.url, clip.duration_seconds);
                    return;
                }
                Err(err) => {
                    let decision = self.policy.should_retry(attempt, &err);
                    if !decision.retry {
                        warn!(attempt, error = %err, "Clip failed");
                        job.fail(err.to_string());
                        return;
                    }
                    job.schedule_retry();
                    warn!(
                        attempt,
                        error = %err,
                        delay_ms = decision.delay.as_millis() as u64,
                        "Retrying clip"
                    );
                    sleep(decision.delay).await;
                }
            }
        }
    }

    /// Best effort: any failure falls back to the frame's own URL.
    async fn prepare(&self, frame: &FrameRef) -> String {
        let Some(preprocessor) = &self.preprocessor else {
            return frame.url.clone();
        };
        match preprocessor.prepare(frame).await {
            Ok(image) => image,
            Err(e) => {
                debug!(frame = %frame.name, error = %e, "Preprocessing failed, using original reference");
                frame.url.clone()
            }
        }
    }

    async fn attempt(&self, request: &GenerationRequest) -> Result<GeneratedClip, ProviderError> {
        match self.provider.submit(request).await? {
            Submission::Ready(result) => interpret(result)
                .unwrap_or_else(|| Err(ProviderError::retryable("submission returned a non-terminal result"))),
            Submission::Pending(handle) => self.wait_for(&handle).await,
        }
    }

    /// Poll until the job resolves or the wait budget runs out.
    async fn wait_for(&self, handle: &JobHandle) -> Result<GeneratedClip, ProviderError> {
        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            let remaining = self.poll.max_wait.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(ProviderError::Timeout {
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            sleep(self.poll.interval.min(remaining)).await;
            polls += 1;

            // Never let one call run past the wait budget.
            let remaining = self.poll.max_wait.saturating_sub(started.elapsed());
            let call_timeout = self.poll.call_timeout.min(remaining);

            match timeout(call_timeout, self.provider.poll(handle)).await {
                Ok(Ok(result)) => {
                    if let Some(outcome) = interpret(result.clone()) {
                        return outcome;
                    }
                    debug!(job = %handle.0, polls, status = ?result.status, "Still generating");
                }
                Ok(Err(e)) => warn!(job = %handle.0, polls, error = %e, "Poll failed, continuing"),
                Err(_) => warn!(
                    job = %handle.0,
                    polls,
                    timeout_secs = call_timeout.as_secs_f64(),
                    "Poll call timed out, continuing"
                ),
            }
        }
    }
}

/// `None` while the job is still in flight.
fn interpret(result: PollResult) -> Option<Result<GeneratedClip, ProviderError>> {
    match result.status {
        ProviderStatus::Completed => Some(match result.output_url {
            Some(url) => Ok(GeneratedClip {
                url,
                duration_seconds: result.duration_seconds,
            }),
            None => Err(ProviderError::retryable("job completed without an output url")),
        }),
        ProviderStatus::Failed => Some(Err(ProviderError::terminal(
            result.error.unwrap_or_else(|| "job failed".to_string()),
        ))),
        ProviderStatus::Cancelled => Some(Err(ProviderError::terminal(
            result.error.unwrap_or_else(|| "job cancelled".to_string()),
        ))),
        ProviderStatus::Pending | ProviderStatus::Processing => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::jobs::ClipStatus;
    use crate::error::StorageError;
    use crate::ports::preprocess::MockFramePreprocessor;
    use crate::ports::provider::MockVideoGenerationProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn frame() -> FrameRef {
        FrameRef::new("frames/a.png", "https://cdn.test/frames/a.png", "a.png")
    }

    fn fast_poll() -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(3),
            call_timeout: Duration::from_secs(10),
            max_wait: Duration::from_secs(30),
        }
    }

    fn worker<P: VideoGenerationProvider>(provider: P, max_retries: u32) -> ClipWorker<P> {
        ClipWorker::new(Arc::new(provider), RetryPolicy::new(max_retries), fast_poll())
    }

    async fn run(worker: &ClipWorker<impl VideoGenerationProvider>) -> ClipJob {
        let mut job = ClipJob::new(0, "https://cdn.test/frames/a.png");
        worker.run(&mut job, &frame(), "animate", 5).await;
        job
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_result_skips_polling() {
        let mut provider = MockVideoGenerationProvider::new();
        provider
            .expect_submit()
            .times(1)
            .returning(|_| Ok(Submission::Ready(PollResult::completed("https://out/0.mp4", Some(5.0)))));
        provider.expect_poll().never();

        let job = run(&worker(provider, 2)).await;
        assert_eq!(job.status(), ClipStatus::Completed);
        assert_eq!(job.output_ref(), Some("https://out/0.mp4"));
        assert_eq!(job.duration_seconds(), Some(5.0));
        assert_eq!(job.retry_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_completed() {
        let mut provider = MockVideoGenerationProvider::new();
        provider
            .expect_submit()
            .withf(|req| req.image == "https://cdn.test/frames/a.png" && req.prompt == "animate" && req.duration_seconds == 5)
            .times(1)
            .returning(|_| Ok(Submission::Pending(JobHandle("job-1".into()))));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        provider.expect_poll().returning(move |handle| {
            assert_eq!(handle.0, "job-1");
            Ok(match counter.fetch_add(1, Ordering::SeqCst) {
                0 => PollResult::with_status(ProviderStatus::Pending),
                1 => PollResult::with_status(ProviderStatus::Processing),
                _ => PollResult::completed("https://out/1.mp4", None),
            })
        });

        let job = run(&worker(provider, 2)).await;
        assert_eq!(job.status(), ClipStatus::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_is_not_retried() {
        let mut provider = MockVideoGenerationProvider::new();
        provider
            .expect_submit()
            .times(1)
            .returning(|_| Ok(Submission::Pending(JobHandle("job-2".into()))));
        provider.expect_poll().returning(|_| {
            Ok(PollResult {
                error: Some("content policy".into()),
                ..PollResult::with_status(ProviderStatus::Failed)
            })
        });

        let job = run(&worker(provider, 2)).await;
        assert_eq!(job.status(), ClipStatus::Failed);
        assert_eq!(job.retry_count(), 0);
        assert_eq!(job.error_message(), Some("provider error: content policy"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_transient_failures_exhaust_retries() {
        let mut provider = MockVideoGenerationProvider::new();
        provider
            .expect_submit()
            .times(3)
            .returning(|_| Err(ProviderError::retryable("503 Service Unavailable")));

        let job = run(&worker(provider, 2)).await;
        assert_eq!(job.status(), ClipStatus::Failed);
        assert_eq!(job.retry_count(), 2);
        assert!(job.output_ref().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success() {
        let mut provider = MockVideoGenerationProvider::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        provider.expect_submit().times(3).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::retryable("connection reset"))
            } else {
                Ok(Submission::Ready(PollResult::completed("https://out/2.mp4", Some(5.0))))
            }
        });

        let job = run(&worker(provider, 2)).await;
        assert_eq!(job.status(), ClipStatus::Completed);
        assert_eq!(job.retry_count(), 2);
        assert!(job.error_message().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_between_attempts() {
        let mut provider = MockVideoGenerationProvider::new();
        provider
            .expect_submit()
            .times(3)
            .returning(|_| Err(ProviderError::retryable("429")));

        let started = Instant::now();
        run(&worker(provider, 2)).await;
        // 2s after the first failure, 4s after the second
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_do_not_abort_the_job() {
        let mut provider = MockVideoGenerationProvider::new();
        provider
            .expect_submit()
            .times(1)
            .returning(|_| Ok(Submission::Pending(JobHandle("job-3".into()))));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        provider.expect_poll().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::retryable("connection refused"))
            } else {
                Ok(PollResult::completed("https://out/3.mp4", None))
            }
        });

        let job = run(&worker(provider, 0)).await;
        assert_eq!(job.status(), ClipStatus::Completed);
        assert_eq!(job.retry_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_budget_exhaustion_fails_with_timeout() {
        let mut provider = MockVideoGenerationProvider::new();
        provider
            .expect_submit()
            .times(1)
            .returning(|_| Ok(Submission::Pending(JobHandle("job-4".into()))));
        provider
            .expect_poll()
            .returning(|_| Ok(PollResult::with_status(ProviderStatus::Processing)));

        let job = run(&worker(provider, 0)).await;
        assert_eq!(job.status(), ClipStatus::Failed);
        assert_eq!(job.error_message(), Some("clip generation timed out after 30s"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_without_url_is_retried() {
        let mut provider = MockVideoGenerationProvider::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        provider.expect_submit().times(2).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(Submission::Ready(PollResult::with_status(ProviderStatus::Completed)))
            } else {
                Ok(Submission::Ready(PollResult::completed("https://out/5.mp4", None)))
            }
        });

        let job = run(&worker(provider, 2)).await;
        assert_eq!(job.status(), ClipStatus::Completed);
        assert_eq!(job.retry_count(), 1);
    }

    /// Hangs on the first `hang_first` polls, answers after that.
    struct HangingProvider {
        polls: AtomicUsize,
        hang_first: usize,
    }

    #[async_trait]
    impl VideoGenerationProvider for HangingProvider {
        async fn submit(&self, _request: &GenerationRequest) -> Result<Submission, ProviderError> {
            Ok(Submission::Pending(JobHandle("job-hang".into())))
        }

        async fn poll(&self, _handle: &JobHandle) -> Result<PollResult, ProviderError> {
            if self.polls.fetch_add(1, Ordering::SeqCst) < self.hang_first {
                std::future::pending::<()>().await;
            }
            Ok(PollResult::completed("https://out/hang.mp4", None))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_poll_is_bounded_by_call_timeout() {
        let provider = HangingProvider {
            polls: AtomicUsize::new(0),
            hang_first: 1,
        };
        let started = Instant::now();
        let job = run(&worker(provider, 0)).await;

        assert_eq!(job.status(), ClipStatus::Completed);
        // interval + call timeout + interval
        assert_eq!(started.elapsed(), Duration::from_secs(16));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_polls_stop_at_the_wait_budget() {
        let provider = HangingProvider {
            polls: AtomicUsize::new(0),
            hang_first: usize::MAX,
        };
        let started = Instant::now();
        let job = run(&worker(provider, 0)).await;

        assert_eq!(job.status(), ClipStatus::Failed);
        assert_eq!(job.error_message(), Some("clip generation timed out after 30s"));
        // 3 + 10, 3 + 10, then 3 + a call cut to the last second
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_preprocessing_failure_falls_back_to_original_url() {
        let mut preprocessor = MockFramePreprocessor::new();
        preprocessor
            .expect_prepare()
            .returning(|_| Err(StorageError::NotFound("a.png".into())));

        let mut provider = MockVideoGenerationProvider::new();
        provider
            .expect_submit()
            .withf(|req| req.image == "https://cdn.test/frames/a.png")
            .times(1)
            .returning(|_| Ok(Submission::Ready(PollResult::completed("https://out/6.mp4", None))));

        let worker = worker(provider, 0).with_preprocessor(Some(Arc::new(preprocessor)));
        let job = run(&worker).await;
        assert_eq!(job.status(), ClipStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preprocessed_image_is_submitted() {
        let mut preprocessor = MockFramePreprocessor::new();
        preprocessor
            .expect_prepare()
            .times(1)
            .returning(|_| Ok("data:image/png;base64,AAAA".into()));

        let mut provider = MockVideoGenerationProvider::new();
        provider
            .expect_submit()
            .withf(|req| req.image == "data:image/png;base64,AAAA")
            .times(1)
            .returning(|_| Ok(Submission::Ready(PollResult::completed("https://out/7.mp4", None))));

        let worker = worker(provider, 0).with_preprocessor(Some(Arc::new(preprocessor)));
        assert_eq!(run(&worker).await.status(), ClipStatus::Completed);
    }
}
