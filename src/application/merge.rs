use crate::domain::av::codec::OutputFormat;
use crate::domain::av::letterbox::Rgb;
use crate::domain::av::merge::{merge_clips, ClipInput, MergeSettings};
use crate::domain::av::probe::ClipInfo;
use crate::domain::jobs::ClipSource;
use crate::domain::plan::{plan, MergePlan};
use crate::error::MergeError;
use crate::ports::ObjectStore;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// What to do when compositing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Surface the error.
    #[default]
    Strict,
    /// Hand back the first clip verbatim, flagged as degraded.
    FirstClip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOptions {
    pub output_format: OutputFormat,
    pub quality: f64,
    pub frame_rate: u32,
    pub background: Rgb,
    pub fallback: FallbackMode,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Mp4,
            quality: 0.8,
            frame_rate: 30,
            background: Rgb::BLACK,
            fallback: FallbackMode::Strict,
        }
    }
}

impl MergeOptions {
    fn settings(&self) -> MergeSettings {
        MergeSettings {
            format: self.output_format,
            quality: self.quality,
            frame_rate: self.frame_rate,
            background: self.background,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MergeTask {
    pub clips: Vec<ClipSource>,
    pub options: MergeOptions,
}

/// The single output video.
#[derive(Debug, Clone, Serialize)]
pub struct MergedAsset {
    #[serde(skip)]
    pub bytes: Bytes,
    pub url: String,
    pub key: String,
    pub mime_type: String,
    pub duration_seconds: f64,
    pub size_bytes: u64,
    /// Set when the asset is the first clip only, returned by `FallbackMode::FirstClip`.
    pub degraded: bool,
}

pub struct MergeService<S> {
    store: S,
}

impl<S> MergeService<S>
where
    S: ObjectStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn merge(&self, task: MergeTask) -> Result<MergedAsset, MergeError> {
        let options = task.options;
        options.settings().validate()?;

        match plan(&task.clips)? {
            MergePlan::SingleClip(clip) => {
                info!(url = %clip.url, "Single clip, skipping composite");
                self.passthrough(&clip, &options).await
            }
            MergePlan::Composite(clips) => match self.composite(&clips, &options).await {
                Ok(asset) => Ok(asset),
                Err(err) if options.fallback == FallbackMode::FirstClip => {
                    warn!(error = %err, "Merge failed, returning first clip as degraded asset");
                    let mut asset = self.passthrough(&clips[0], &options).await?;
                    asset.degraded = true;
                    Ok(asset)
                }
                Err(err) => Err(err),
            },
        }
    }

    /// Persist one clip as the final asset without touching its frames.
    async fn passthrough(
        &self,
        clip: &ClipSource,
        options: &MergeOptions,
    ) -> Result<MergedAsset, MergeError> {
        let scratch = tempfile::tempdir()?;
        let extension = source_extension(&clip.url)
            .unwrap_or_else(|| options.output_format.extension().to_string());
        let local = scratch.path().join(format!("clip.{}", extension));

        self.store
            .download(&clip.url, &local)
            .await
            .map_err(|e| MergeError::decode(0, &clip.url, e))?;

        let duration_seconds = match clip.duration_seconds {
            Some(duration) => duration,
            None => match ClipInfo::from_path(&local).await {
                Ok(info) => info.duration_seconds,
                Err(e) => {
                    warn!(clip = %clip.url, error = %e, "Could not probe clip, reporting zero duration");
                    0.0
                }
            },
        };

        let bytes = Bytes::from(tokio::fs::read(&local).await?);
        let key = format!("merged/{}.{}", Uuid::new_v4(), extension);
        self.store_asset(bytes, &key, &extension, duration_seconds).await
    }

    async fn composite(
        &self,
        clips: &[ClipSource],
        options: &MergeOptions,
    ) -> Result<MergedAsset, MergeError> {
        let scratch = tempfile::tempdir()?;

        let mut inputs = Vec::with_capacity(clips.len());
        for (index, clip) in clips.iter().enumerate() {
            let name = match source_extension(&clip.url) {
                Some(ext) => format!("clip_{:03}.{}", index, ext),
                None => format!("clip_{:03}", index),
            };
            let path = scratch.path().join(name);
            self.store
                .download(&clip.url, &path)
                .await
                .map_err(|e| MergeError::decode(index, &clip.url, e))?;
            inputs.push(ClipInput {
                path,
                reference: clip.url.clone(),
            });
        }

        let extension = options.output_format.extension();
        let output = scratch.path().join(format!("merged.{}", extension));
        let settings = options.settings();

        info!(clips = inputs.len(), format = %options.output_format, "Merging clips");
        let report = {
            let output = output.clone();
            tokio::task::spawn_blocking(move || merge_clips(&inputs, &output, &settings))
                .await
                .map_err(MergeError::encode)??
        };
        info!(
            duration_seconds = report.duration_seconds,
            frames = report.frame_count,
            codec = %report.codec,
            "Merge encoded"
        );

        let bytes = Bytes::from(tokio::fs::read(&output).await?);
        let key = format!("merged/{}.{}", Uuid::new_v4(), extension);
        self.store_asset(bytes, &key, extension, report.duration_seconds)
            .await
    }

    async fn store_asset(
        &self,
        bytes: Bytes,
        key: &str,
        extension: &str,
        duration_seconds: f64,
    ) -> Result<MergedAsset, MergeError> {
        let stored = self.store.upload(&bytes, key).await?;
        let mime_type = extension
            .parse::<OutputFormat>()
            .map(|f| f.mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string());

        Ok(MergedAsset {
            bytes,
            url: stored.url,
            key: stored.key,
            mime_type,
            duration_seconds,
            size_bytes: stored.size,
            degraded: false,
        })
    }
}

/// Extension of the last path segment of a URL or key, ignoring any query.
fn source_extension(reference: &str) -> Option<String> {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    let name = path.rsplit('/').next().unwrap_or(path);
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
