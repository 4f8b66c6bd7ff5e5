// src/sequence.rs - Time-ordered pose series with a minimum-yield gate
use crate::error::{AnalysisError, SequenceError};
use crate::pose::PoseFrame;
use tracing::{debug, warn};

/// Fewest posed frames a sequence needs before any metric is computed.
pub const MIN_POSED_FRAMES: usize = 12;

/// Posed frames from one sampling pass, strictly increasing by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSequence {
    frames: Vec<PoseFrame>,
}

impl PoseSequence {
    pub fn frames(&self) -> &[PoseFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first(&self) -> Option<&PoseFrame> {
        self.frames.first()
    }

    pub fn last(&self) -> Option<&PoseFrame> {
        self.frames.last()
    }

    pub fn get(&self, index: usize) -> Option<&PoseFrame> {
        self.frames.get(index)
    }
}

/// Collects `(timestamp, pose-or-none)` pairs into a [`PoseSequence`].
#[derive(Debug, Default)]
pub struct PoseSequenceBuilder {
    frames: Vec<PoseFrame>,
    offered: usize,
    last_timestamp: Option<f64>,
}

impl PoseSequenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Records one sampled timestamp. Entries without a pose are dropped but
    /// still count toward the ordering check.
    pub fn push(&mut self, timestamp: f64, pose: Option<PoseFrame>) -> Result<(), SequenceError> {
        if let Some(previous) = self.last_timestamp {
            if !(timestamp > previous) {
                return Err(SequenceError::NonMonotonicTimestamp {
                    index: self.offered,
                    previous,
                    timestamp,
                });
            }
        }
        self.last_timestamp = Some(timestamp);
        self.offered += 1;

        match pose {
            Some(mut frame) => {
                frame.timestamp = timestamp;
                self.frames.push(frame);
            }
            None => debug!(timestamp, "no pose at sampled timestamp"),
        }
        Ok(())
    }

    pub fn posed_count(&self) -> usize {
        self.frames.len()
    }

    pub fn offered_count(&self) -> usize {
        self.offered
    }

    /// Finishes the sequence, failing when fewer than [`MIN_POSED_FRAMES`] posed.
    pub fn build(self) -> Result<PoseSequence, AnalysisError> {
        if self.frames.len() < MIN_POSED_FRAMES {
            warn!(
                posed = self.frames.len(),
                offered = self.offered,
                required = MIN_POSED_FRAMES,
                "insufficient pose coverage"
            );
            return Err(AnalysisError::InsufficientCoverage {
                posed: self.frames.len(),
                required: MIN_POSED_FRAMES,
            });
        }
        Ok(PoseSequence {
            frames: self.frames,
        })
    }
}
