use crate::error::ValidationError;
use std::ops::Range;

/// Contiguous, order-preserving partition of `total` frames into batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    total: usize,
    batch_size: usize,
}

impl BatchPlan {
    pub fn new(total: usize, batch_size: usize) -> Result<Self, ValidationError> {
        if total == 0 {
            return Err(ValidationError::EmptyFrames);
        }
        if batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize);
        }
        Ok(Self { total, batch_size })
    }

    /// `ceil(total / batch_size)`
    pub fn count(&self) -> usize {
        self.total.div_ceil(self.batch_size)
    }

    /// Frame indices of batch `b`: `[b * size, min((b + 1) * size, total))`.
    pub fn batch(&self, b: usize) -> Range<usize> {
        let start = (b * self.batch_size).min(self.total);
        let end = ((b + 1) * self.batch_size).min(self.total);
        start..end
    }

    pub fn batches(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.count()).map(move |b| self.batch(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seven_frames_in_threes() {
        let plan = BatchPlan::new(7, 3).unwrap();
        let sizes: Vec<usize> = plan.batches().map(|r| r.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(plan.batch(2), 6..7);
    }

    #[test]
    fn test_every_frame_lands_in_exactly_one_batch() {
        for total in 1..40 {
            for size in 1..10 {
                let plan = BatchPlan::new(total, size).unwrap();
                assert_eq!(plan.count(), (total + size - 1) / size);

                let flattened: Vec<usize> = plan.batches().flatten().collect();
                assert_eq!(flattened, (0..total).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_batch_larger_than_input() {
        let plan = BatchPlan::new(2, 5).unwrap();
        assert_eq!(plan.count(), 1);
        assert_eq!(plan.batch(0), 0..2);
    }

    #[test]
    fn test_rejects_empty_input_and_zero_size() {
        assert_eq!(BatchPlan::new(0, 3), Err(ValidationError::EmptyFrames));
        assert_eq!(BatchPlan::new(4, 0), Err(ValidationError::InvalidBatchSize));
    }
}
