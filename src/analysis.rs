// src/analysis.rs - Batch swing analysis over a recorded clip
use crate::config::BatchConfig;
use crate::detector::PoseDetector;
use crate::error::AnalysisError;
use crate::metrics::{MetricCalculator, PlaneMetric, SwayMetric, TempoMetric};
use crate::sampler::{FrameSampler, SampledPose};
use crate::sequence::{PoseSequence, PoseSequenceBuilder};
use crate::video::VideoSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Everything one analysis call produces. The engine keeps no copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub tempo: TempoMetric,
    pub plane: PlaneMetric,
    pub sway: SwayMetric,
    pub top_frame_index: usize,
    pub posed_frames: usize,
    pub requested_frames: usize,
    /// Share of requested frames that produced a pose, `0..=1`.
    pub confidence: f64,
    pub processing_time: Duration,
}

impl AnalysisResult {
    pub fn summary_chip(&self) -> String {
        format!(
            "Tempo {:.1}:1 • Plane {:.0}° • Sway {:+.0}cm",
            self.tempo.ratio, self.plane.angle_at_top, self.sway.delta_cm
        )
    }
}

/// Stateless driver for the recorded-clip pipeline:
/// sample, detect, gate on coverage, compute metrics.
pub struct SwingAnalyzer {
    sampler: FrameSampler,
}

impl SwingAnalyzer {
    /// Fails with [`AnalysisError::InvalidConfig`] for settings that could never
    /// produce a result.
    pub fn new(config: &BatchConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            sampler: FrameSampler::new(config)?,
        })
    }

    pub async fn analyze(
        &self,
        source: Arc<dyn VideoSource>,
        detector: Arc<dyn PoseDetector>,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_with_sequence(source, detector)
            .await
            .map(|(result, _)| result)
    }

    /// Like [`analyze`](Self::analyze), also handing back the gated pose sequence
    /// the metrics were computed from.
    pub async fn analyze_with_sequence(
        &self,
        source: Arc<dyn VideoSource>,
        detector: Arc<dyn PoseDetector>,
    ) -> Result<(AnalysisResult, PoseSequence), AnalysisError> {
        let started = Instant::now();
        let requested = self.sampler.frame_count();
        info!(requested, "starting swing analysis");

        let samples = self.sampler.sample(source, detector).await?;
        let sequence = assemble(samples)?;
        let result = evaluate(&sequence, requested, started.elapsed());

        info!(
            posed = result.posed_frames,
            requested,
            elapsed_ms = result.processing_time.as_millis() as u64,
            summary = %result.summary_chip(),
            "swing analysis finished"
        );
        Ok((result, sequence))
    }
}

fn assemble(samples: Vec<SampledPose>) -> Result<PoseSequence, AnalysisError> {
    let mut builder = PoseSequenceBuilder::with_capacity(samples.len());
    for sample in samples {
        builder.push(sample.timestamp, sample.pose)?;
    }
    builder.build()
}

fn evaluate(sequence: &PoseSequence, requested: usize, elapsed: Duration) -> AnalysisResult {
    let metrics = MetricCalculator::compute(sequence);
    let posed = sequence.len();

    AnalysisResult {
        tempo: metrics.tempo,
        plane: metrics.plane,
        sway: metrics.sway,
        top_frame_index: metrics.top_frame_index,
        posed_frames: posed,
        requested_frames: requested,
        confidence: if requested == 0 {
            0.0
        } else {
            (posed as f64 / requested as f64).min(1.0)
        },
        processing_time: elapsed,
    }
}
