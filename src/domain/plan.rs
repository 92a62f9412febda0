use crate::domain::jobs::ClipSource;
use crate::error::MergeError;

/// What the merge stage has to do with a list of completed clips.
#[derive(Debug, Clone, PartialEq)]
pub enum MergePlan {
    /// Exactly one clip: it already is the final asset.
    SingleClip(ClipSource),
    /// Two or more clips: run the compositing engine.
    Composite(Vec<ClipSource>),
}

pub fn plan(clips: &[ClipSource]) -> Result<MergePlan, MergeError> {
    match clips {
        [] => Err(MergeError::NothingToMerge),
        [single] => Ok(MergePlan::SingleClip(single.clone())),
        many => Ok(MergePlan::Composite(many.to_vec())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_clips_is_an_error() {
        assert!(matches!(plan(&[]), Err(MergeError::NothingToMerge)));
    }

    #[test]
    fn test_single_clip_passes_through_unchanged() {
        let clip = ClipSource {
            url: "https://cdn.example.com/clips/0.mp4?sig=abc".into(),
            duration_seconds: Some(5.0),
        };
        assert_eq!(plan(&[clip.clone()]).unwrap(), MergePlan::SingleClip(clip));
    }

    #[test]
    fn test_many_clips_keep_order() {
        let clips: Vec<ClipSource> = ["c0", "c1", "c2"].into_iter().map(ClipSource::new).collect();
        match plan(&clips).unwrap() {
            MergePlan::Composite(planned) => assert_eq!(planned, clips),
            other => panic!("expected composite plan, got {:?}", other),
        }
    }
}
