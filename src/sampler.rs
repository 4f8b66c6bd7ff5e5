// src/sampler.rs - Even frame sampling over a clip with ordered pose detection
use crate::config::BatchConfig;
use crate::detector::PoseDetector;
use crate::error::AnalysisError;
use crate::pose::PoseFrame;
use crate::video::VideoSource;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Outcome of sampling one timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledPose {
    pub timestamp: f64,
    pub pose: Option<PoseFrame>,
}

pub struct FrameSampler {
    frame_count: usize,
    max_in_flight: usize,
    confidence_threshold: f32,
}

impl FrameSampler {
    pub fn new(config: &BatchConfig) -> Result<Self, AnalysisError> {
        if config.frame_count < 2 {
            return Err(AnalysisError::invalid_config(format!(
                "frame_count must be at least 2, got {}",
                config.frame_count
            )));
        }
        if config.max_concurrent_detections == 0 {
            return Err(AnalysisError::invalid_config(
                "max_concurrent_detections must be at least 1",
            ));
        }

        Ok(Self {
            frame_count: config.frame_count,
            max_in_flight: config.max_concurrent_detections,
            confidence_threshold: config.confidence_threshold,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// `frame_count` instants spread over `[0, duration]`, both ends included.
    pub fn timestamps(&self, duration: f64) -> Vec<f64> {
        let last = self.frame_count - 1;
        (0..self.frame_count)
            .map(|i| {
                if i == last {
                    duration
                } else {
                    duration * i as f64 / last as f64
                }
            })
            .collect()
    }

    /// Requests one detection per sampled timestamp and returns the outcomes in
    /// timestamp order, whatever order the detections finished in.
    pub async fn sample(
        &self,
        source: Arc<dyn VideoSource>,
        detector: Arc<dyn PoseDetector>,
    ) -> Result<Vec<SampledPose>, AnalysisError> {
        let duration = match source.duration() {
            Some(d) if d.is_finite() && d > 0.0 => d,
            other => {
                warn!(duration = ?other, "clip has no usable duration, skipping detection");
                return Err(AnalysisError::InputUnavailable { duration: other });
            }
        };

        let timestamps = self.timestamps(duration);
        if !timestamps.windows(2).all(|w| w[0] < w[1]) {
            warn!(duration, "clip too short to hold distinct sample times");
            return Err(AnalysisError::InputUnavailable {
                duration: Some(duration),
            });
        }
        let mut slots: Vec<Option<PoseFrame>> = vec![None; timestamps.len()];
        let mut tasks = JoinSet::new();

        for (index, &timestamp) in timestamps.iter().enumerate() {
            while tasks.len() >= self.max_in_flight {
                Self::collect_one(&mut tasks, &mut slots).await;
            }

            let source = Arc::clone(&source);
            let detector = Arc::clone(&detector);
            let threshold = self.confidence_threshold;
            tasks.spawn_blocking(move || {
                let pose = detect_at(source.as_ref(), detector.as_ref(), timestamp, threshold);
                (index, pose)
            });
        }

        while !tasks.is_empty() {
            Self::collect_one(&mut tasks, &mut slots).await;
        }

        Ok(timestamps
            .into_iter()
            .zip(slots)
            .map(|(timestamp, pose)| SampledPose { timestamp, pose })
            .collect())
    }

    async fn collect_one(
        tasks: &mut JoinSet<(usize, Option<PoseFrame>)>,
        slots: &mut [Option<PoseFrame>],
    ) {
        match tasks.join_next().await {
            Some(Ok((index, pose))) => slots[index] = pose,
            Some(Err(err)) => error!(%err, "pose detection task failed"),
            None => {}
        }
    }
}

/// Single detection for one timestamp; every failure collapses to "no pose".
fn detect_at(
    source: &dyn VideoSource,
    detector: &dyn PoseDetector,
    timestamp: f64,
    confidence_threshold: f32,
) -> Option<PoseFrame> {
    let Some(frame) = source.image_at(timestamp) else {
        debug!(timestamp, "no image at timestamp");
        return None;
    };

    match detector.detect(&frame) {
        Ok(Some(raw)) => {
            let pose = PoseFrame::from_observations(timestamp, &raw, confidence_threshold);
            if pose.is_empty() {
                debug!(timestamp, "no joint cleared the confidence threshold");
                None
            } else {
                Some(pose)
            }
        }
        Ok(None) => None,
        Err(err) => {
            warn!(timestamp, %err, "pose detection failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectorError;
    use crate::pose::{JointId, JointObservation, RawPose};
    use crate::video::VideoFrame;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedClip(Option<f64>);

    impl VideoSource for FixedClip {
        fn duration(&self) -> Option<f64> {
            self.0
        }

        fn image_at(&self, timestamp: f64) -> Option<VideoFrame> {
            Some(VideoFrame::new(timestamp, DynamicImage::new_rgb8(2, 2)))
        }
    }

    struct CountingDetector {
        calls: AtomicUsize,
    }

    impl PoseDetector for CountingDetector {
        fn detect(&self, frame: &VideoFrame) -> Result<Option<RawPose>, DetectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Early frames finish last to exercise reordering.
            std::thread::sleep(Duration::from_millis((10.0 * (1.0 - frame.timestamp)) as u64));
            let mut pose = RawPose::new();
            pose.insert(JointId::Root, JointObservation::new(frame.timestamp, 0.4, 0.9));
            Ok(Some(pose))
        }
    }

    fn sampler(frame_count: usize, in_flight: usize) -> FrameSampler {
        FrameSampler::new(&BatchConfig {
            frame_count,
            max_concurrent_detections: in_flight,
            ..BatchConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn degenerate_config_is_rejected() {
        for (frame_count, in_flight) in [(0, 4), (1, 4), (24, 0)] {
            let result = FrameSampler::new(&BatchConfig {
                frame_count,
                max_concurrent_detections: in_flight,
                ..BatchConfig::default()
            });
            assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
        }
    }

    #[test]
    fn tiny_durations_stay_ordered_or_are_refused() {
        let s = sampler(24, 1);
        let ts = s.timestamps(1e-300);
        assert_eq!(ts[23], 1e-300);
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
        assert!(ts.iter().all(|t| *t <= 1e-300));
    }

    #[tokio::test]
    async fn subnormal_duration_is_input_unavailable() {
        let detector = Arc::new(CountingDetector {
            calls: AtomicUsize::new(0),
        });
        let result = sampler(24, 4)
            .sample(Arc::new(FixedClip(Some(1e-322))), detector.clone())
            .await;
        assert_eq!(
            result.unwrap_err(),
            AnalysisError::InputUnavailable {
                duration: Some(1e-322)
            }
        );
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn timestamps_span_whole_clip() {
        let ts = sampler(24, 1).timestamps(1.2);
        assert_eq!(ts.len(), 24);
        assert_eq!(ts[0], 0.0);
        assert_eq!(ts[23], 1.2);
        assert!((ts[1] - 1.2 / 23.0).abs() < 1e-12);
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn unusable_duration_never_calls_detector() {
        for duration in [None, Some(0.0), Some(-1.0), Some(f64::NAN)] {
            let detector = Arc::new(CountingDetector {
                calls: AtomicUsize::new(0),
            });
            let result = sampler(24, 4)
                .sample(Arc::new(FixedClip(duration)), detector.clone())
                .await;
            assert!(matches!(result, Err(AnalysisError::InputUnavailable { .. })));
            assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn concurrent_results_come_back_in_timestamp_order() {
        let detector = Arc::new(CountingDetector {
            calls: AtomicUsize::new(0),
        });
        let samples = sampler(16, 8)
            .sample(Arc::new(FixedClip(Some(1.0))), detector.clone())
            .await
            .unwrap();

        assert_eq!(detector.calls.load(Ordering::SeqCst), 16);
        assert_eq!(samples.len(), 16);
        for s in &samples {
            let pose = s.pose.as_ref().unwrap();
            assert_eq!(pose.timestamp, s.timestamp);
            assert_eq!(pose.joint(JointId::Root).unwrap().x, s.timestamp);
        }
    }

    #[tokio::test]
    async fn failures_and_weak_poses_become_gaps() {
        let detector = |frame: &VideoFrame| -> Result<Option<RawPose>, DetectorError> {
            let i = (frame.timestamp * 10.0).round() as usize;
            let mut pose = RawPose::new();
            match i % 3 {
                0 => Err(DetectorError::Failed("model crashed".into())),
                1 => {
                    pose.insert(JointId::Root, JointObservation::new(0.5, 0.4, 0.1));
                    Ok(Some(pose))
                }
                _ => {
                    pose.insert(JointId::Root, JointObservation::new(0.5, 0.4, 0.8));
                    Ok(Some(pose))
                }
            }
        };
        let samples = sampler(11, 1)
            .sample(Arc::new(FixedClip(Some(1.0))), Arc::new(detector))
            .await
            .unwrap();
        let posed: Vec<usize> = samples
            .iter()
            .enumerate()
            .filter(|(_, s)| s.pose.is_some())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(posed, vec![2, 5, 8]);
    }
}
