// src/live.rs - Rate-limited pose tracking for a live camera overlay
use crate::config::LiveConfig;
use crate::detector::PoseDetector;
use crate::error::AnalysisError;
use crate::pose::PoseFrame;
use crate::video::VideoFrame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// Admits at most one event per `min_interval`.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last_accepted: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: None,
        }
    }

    pub fn admit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }
}

/// Read side of the single-slot handoff: always the newest pose, never a backlog.
#[derive(Debug, Clone)]
pub struct LivePoseReader {
    rx: watch::Receiver<Option<PoseFrame>>,
}

impl LivePoseReader {
    pub fn current(&self) -> Option<PoseFrame> {
        self.rx.borrow().clone()
    }

    /// Waits for a newer pose. Returns `false` once the tracker is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    pub fn into_inner(self) -> watch::Receiver<Option<PoseFrame>> {
        self.rx
    }
}

/// Clears the in-flight flag when a detection ends, even by panic.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct LiveThrottledTracker {
    detector: Arc<dyn PoseDetector>,
    throttle: Throttle,
    confidence_threshold: f32,
    slot: Arc<watch::Sender<Option<PoseFrame>>>,
    in_flight: Arc<AtomicBool>,
    runtime: Handle,
    accepted: u64,
    dropped: u64,
}

impl LiveThrottledTracker {
    /// Detection for accepted frames runs on `runtime`'s blocking pool so the
    /// capture thread calling [`offer`](Self::offer) never waits on the model.
    pub fn new(
        detector: Arc<dyn PoseDetector>,
        config: &LiveConfig,
        runtime: Handle,
    ) -> Result<(Self, LivePoseReader), AnalysisError> {
        config.validate()?;
        let (tx, rx) = watch::channel(None);
        let tracker = Self {
            detector,
            throttle: Throttle::new(config.min_interval()?),
            confidence_threshold: config.confidence_threshold,
            slot: Arc::new(tx),
            in_flight: Arc::new(AtomicBool::new(false)),
            runtime,
            accepted: 0,
            dropped: 0,
        };
        Ok((tracker, LivePoseReader { rx }))
    }

    pub fn offer(&mut self, frame: VideoFrame) -> bool {
        self.offer_at(frame, Instant::now())
    }

    /// Same as [`offer`](Self::offer) with an explicit arrival time.
    ///
    /// A frame is dropped while an earlier detection is still running, and
    /// otherwise when it arrives inside the minimum interval.
    pub fn offer_at(&mut self, frame: VideoFrame, now: Instant) -> bool {
        if self.in_flight.load(Ordering::Acquire) {
            self.dropped += 1;
            trace!(timestamp = frame.timestamp, "detector busy, live frame dropped");
            return false;
        }
        if !self.throttle.admit(now) {
            self.dropped += 1;
            trace!(timestamp = frame.timestamp, "live frame throttled");
            return false;
        }
        self.accepted += 1;
        self.in_flight.store(true, Ordering::Release);

        let detector = Arc::clone(&self.detector);
        let slot = Arc::clone(&self.slot);
        let guard = InFlight(Arc::clone(&self.in_flight));
        let threshold = self.confidence_threshold;
        self.runtime.spawn_blocking(move || {
            let outcome = detector.detect(&frame);
            drop(guard);
            match outcome {
                Ok(Some(raw)) => {
                    let pose = PoseFrame::from_observations(frame.timestamp, &raw, threshold);
                    publish(&slot, pose);
                }
                Ok(None) => debug!(timestamp = frame.timestamp, "no person in live frame"),
                Err(err) => warn!(timestamp = frame.timestamp, %err, "live pose detection failed"),
            }
        });
        true
    }

    /// Whether a detection started by an earlier offer is still running.
    pub fn is_detecting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

/// Overwrites the slot unless a pose from a later frame already landed there.
fn publish(slot: &watch::Sender<Option<PoseFrame>>, pose: PoseFrame) {
    slot.send_if_modified(move |current| {
        let newer = current
            .as_ref()
            .map_or(true, |existing| existing.timestamp <= pose.timestamp);
        if newer {
            *current = Some(pose);
        }
        newer
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectorError;
    use crate::pose::{JointId, JointObservation, RawPose};
    use image::DynamicImage;

    fn frame(t: f64) -> VideoFrame {
        VideoFrame::new(t, DynamicImage::new_rgb8(2, 2))
    }

    fn detector(frame: &VideoFrame) -> Result<Option<RawPose>, DetectorError> {
        let mut pose = RawPose::new();
        pose.insert(JointId::Neck, JointObservation::new(0.5, 0.8, 0.25));
        pose.insert(JointId::Root, JointObservation::new(frame.timestamp, 0.4, 0.15));
        Ok(Some(pose))
    }

    #[test]
    fn throttle_spacing() {
        let mut throttle = Throttle::new(Duration::from_millis(100));
        let t0 = Instant::now();
        assert!(throttle.admit(t0));
        assert!(!throttle.admit(t0 + Duration::from_millis(50)));
        assert!(!throttle.admit(t0 + Duration::from_millis(99)));
        assert!(throttle.admit(t0 + Duration::from_millis(100)));
        assert!(!throttle.admit(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn publish_keeps_latest_timestamp() {
        let (tx, rx) = watch::channel(None);
        publish(&tx, PoseFrame::new(0.5));
        publish(&tx, PoseFrame::new(0.2));
        assert_eq!(rx.borrow().as_ref().unwrap().timestamp, 0.5);
        publish(&tx, PoseFrame::new(0.7));
        assert_eq!(rx.borrow().as_ref().unwrap().timestamp, 0.7);
    }

    async fn wait_idle(tracker: &LiveThrottledTracker) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while tracker.is_detecting() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("detection finished");
    }

    #[tokio::test]
    async fn frames_inside_interval_are_dropped() {
        let config = LiveConfig::default();
        let (mut tracker, reader) =
            LiveThrottledTracker::new(Arc::new(detector), &config, Handle::current()).unwrap();
        let mut rx = reader.into_inner();

        let t0 = Instant::now();
        assert!(tracker.offer_at(frame(0.0), t0));
        wait_idle(&tracker).await;
        assert!(!tracker.offer_at(frame(0.033), t0 + Duration::from_millis(33)));
        assert!(!tracker.offer_at(frame(0.066), t0 + Duration::from_millis(66)));
        assert!(tracker.offer_at(frame(0.1), t0 + Duration::from_millis(100)));
        assert_eq!(tracker.accepted_count(), 2);
        assert_eq!(tracker.dropped_count(), 2);

        let latest = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|p| p.as_ref().map_or(false, |p| p.timestamp == 0.1)),
        )
        .await
        .expect("pose published")
        .expect("tracker alive")
        .clone();

        let pose = latest.unwrap();
        // Live threshold keeps the 0.25 neck but not the 0.15 root.
        assert!(pose.joint(JointId::Neck).is_some());
        assert!(pose.joint(JointId::Root).is_none());
    }

    #[tokio::test]
    async fn unusable_rate_is_rejected_at_construction() {
        let config = LiveConfig {
            max_rate_hz: 0.0,
            ..LiveConfig::default()
        };
        let result = LiveThrottledTracker::new(Arc::new(detector), &config, Handle::current());
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn empty_pose_is_kept_and_no_person_publishes_nothing() {
        // Odd tenths see nobody, even tenths only see weak joints.
        let detector = |frame: &VideoFrame| -> Result<Option<RawPose>, DetectorError> {
            let tenth = (frame.timestamp * 10.0).round() as u32;
            match tenth {
                3 => Err(DetectorError::Failed("model crashed".into())),
                t if t % 2 == 1 => Ok(None),
                _ => {
                    let mut pose = RawPose::new();
                    pose.insert(JointId::Neck, JointObservation::new(0.5, 0.8, 0.2));
                    pose.insert(JointId::Root, JointObservation::new(0.5, 0.4, 0.05));
                    Ok(Some(pose))
                }
            }
        };
        let (mut tracker, reader) =
            LiveThrottledTracker::new(Arc::new(detector), &LiveConfig::default(), Handle::current())
                .unwrap();
        let mut rx = reader.into_inner();

        let t0 = Instant::now();
        assert!(tracker.offer_at(frame(0.0), t0));
        let anchored = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|p| p.is_some()),
        )
        .await
        .expect("pose published")
        .expect("tracker alive")
        .clone()
        .unwrap();
        assert_eq!(anchored.timestamp, 0.0);
        assert!(anchored.is_empty());
        wait_idle(&tracker).await;

        for (i, t) in [0.1, 0.3].into_iter().enumerate() {
            let arrival = t0 + Duration::from_millis(100 * (i as u64 + 1));
            assert!(tracker.offer_at(frame(t), arrival));
            wait_idle(&tracker).await;
            tokio::task::yield_now().await;
            assert!(!rx.has_changed().unwrap());
            assert_eq!(rx.borrow().as_ref().unwrap().timestamp, 0.0);
        }
    }

    #[tokio::test]
    async fn frames_are_dropped_while_detection_runs() {
        let (release, gate) = std::sync::mpsc::channel::<()>();
        let gate = std::sync::Mutex::new(gate);
        let detector = move |frame: &VideoFrame| -> Result<Option<RawPose>, DetectorError> {
            if let Ok(gate) = gate.lock() {
                let _ = gate.recv();
            }
            let mut pose = RawPose::new();
            pose.insert(JointId::Neck, JointObservation::new(frame.timestamp, 0.8, 0.9));
            Ok(Some(pose))
        };
        let (mut tracker, reader) =
            LiveThrottledTracker::new(Arc::new(detector), &LiveConfig::default(), Handle::current())
                .unwrap();
        let mut rx = reader.into_inner();

        let t0 = Instant::now();
        assert!(tracker.offer_at(frame(0.0), t0));
        assert!(tracker.is_detecting());
        // Well past the interval, but the first detection is still blocked.
        assert!(!tracker.offer_at(frame(0.5), t0 + Duration::from_millis(500)));
        assert_eq!(tracker.dropped_count(), 1);

        release.send(()).unwrap();
        tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|p| p.as_ref().map_or(false, |p| p.timestamp == 0.0)),
        )
        .await
        .expect("pose published")
        .expect("tracker alive");
        wait_idle(&tracker).await;

        assert!(tracker.offer_at(frame(0.6), t0 + Duration::from_millis(600)));
        release.send(()).unwrap();
        tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|p| p.as_ref().map_or(false, |p| p.timestamp == 0.6)),
        )
        .await
        .expect("pose published")
        .expect("tracker alive");
        assert_eq!(tracker.accepted_count(), 2);
    }
}
