// src/lib.rs
pub mod analysis;
pub mod config;
pub mod data;
pub mod detector;
pub mod error;
pub mod feedback;
pub mod live;
pub mod metrics;
pub mod pose;
pub mod sampler;
pub mod sequence;
pub mod simulation;
pub mod video;

pub use analysis::{AnalysisResult, SwingAnalyzer};
pub use config::EngineConfig;
pub use detector::PoseDetector;
pub use error::{AnalysisError, DetectorError, ExportError};
pub use feedback::{CoachingFeedbackGenerator, CoachingTip};
pub use live::{LivePoseReader, LiveThrottledTracker};
pub use metrics::{MetricCalculator, PlaneMetric, SwayMetric, SwingMetrics, TempoMetric};
pub use pose::{JointId, JointObservation, PoseFrame, RawPose};
pub use sequence::{PoseSequence, PoseSequenceBuilder, MIN_POSED_FRAMES};
pub use video::{VideoFrame, VideoSource};
