use crate::application::merge::{MergeOptions, MergeService, MergeTask, MergedAsset};
use crate::application::orchestrator::{ClipOrchestrator, GenerationControl, GenerationOptions};
use crate::domain::jobs::{FrameRef, GenerationSession};
use crate::error::ReelError;
use crate::ports::{FrameSource, ObjectStore, SessionRepository, VideoGenerationProvider};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct ReelOptions {
    pub generation: GenerationOptions,
    pub merge: MergeOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReelOutcome {
    pub session: GenerationSession,
    /// `None` when no clip completed.
    pub asset: Option<MergedAsset>,
}

/// Frames in, one merged video out.
pub struct ReelService<P, S, R> {
    orchestrator: ClipOrchestrator<P>,
    merger: MergeService<S>,
    repo: R,
}

impl<P, S, R> ReelService<P, S, R>
where
    P: VideoGenerationProvider + 'static,
    S: ObjectStore,
    R: SessionRepository,
{
    pub fn new(orchestrator: ClipOrchestrator<P>, merger: MergeService<S>, repo: R) -> Self {
        Self {
            orchestrator,
            merger,
            repo,
        }
    }

    pub async fn create_reel(
        &self,
        frames: &[FrameRef],
        options: &ReelOptions,
        control: GenerationControl,
    ) -> Result<ReelOutcome, ReelError> {
        // 1. Generate one clip per frame
        let session = self
            .orchestrator
            .generate_with(frames, &options.generation, control)
            .await?;

        // 2. Hand the session to persistence
        self.repo.save_session(&session).await?;

        // 3. Merge whatever completed, in frame order
        let clips = session.completed_clips();
        if clips.is_empty() {
            warn!(session_id = %session.session_id, "No clip completed, nothing to merge");
            return Ok(ReelOutcome {
                session,
                asset: None,
            });
        }

        let asset = self
            .merger
            .merge(MergeTask {
                clips,
                options: options.merge.clone(),
            })
            .await?;

        info!(
            session_id = %session.session_id,
            url = %asset.url,
            duration_seconds = asset.duration_seconds,
            degraded = asset.degraded,
            "Reel ready"
        );
        Ok(ReelOutcome {
            session,
            asset: Some(asset),
        })
    }

    pub async fn create_reel_for_owner<F>(
        &self,
        frames: &F,
        owner_id: &str,
        options: &ReelOptions,
        control: GenerationControl,
    ) -> Result<ReelOutcome, ReelError>
    where
        F: FrameSource + ?Sized,
    {
        let frames = frames.list(owner_id).await?;
        info!(owner_id, frames = frames.len(), "Listed frames");
        self.create_reel(&frames, options, control).await
    }

    pub async fn session(&self, session_id: &str) -> Result<Option<GenerationSession>, ReelError> {
        Ok(self.repo.get_session(session_id).await?)
    }
}
