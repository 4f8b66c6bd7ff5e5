// src/simulation.rs - Scripted golf swing for demos and tests
use crate::detector::PoseDetector;
use crate::error::DetectorError;
use crate::pose::{JointId, JointObservation, RawPose};
use crate::video::{VideoFrame, VideoSource};
use image::DynamicImage;
use std::f64::consts::FRAC_PI_2;

const SHOULDER: (f64, f64) = (0.45, 0.70);
const ARM_LENGTH: f64 = 0.30;
const HIP_Y: f64 = 0.45;

/// A synthetic clip plus the detector that "sees" it.
///
/// The lead arm swings from hanging straight down at address up to
/// `plane_deg` above horizontal at `top_time`, then back down to impact at the
/// end of the clip. The hip root drifts linearly by `sway_cm`.
#[derive(Debug, Clone)]
pub struct SimulatedSwing {
    pub duration: f64,
    pub top_time: f64,
    pub plane_deg: f64,
    pub sway_cm: f64,
    pub fps: f64,
    /// Every n-th frame reports no person; 0 disables dropouts.
    pub dropout_every: usize,
}

impl Default for SimulatedSwing {
    fn default() -> Self {
        Self {
            duration: 1.2,
            top_time: 0.9,
            plane_deg: 52.0,
            sway_cm: 4.0,
            fps: 30.0,
            dropout_every: 0,
        }
    }
}

impl SimulatedSwing {
    /// Swing progress in `[0, 1]`: 0 at address and impact, 1 at the top.
    fn lift(&self, t: f64) -> f64 {
        let phase = if t <= self.top_time {
            if self.top_time <= 0.0 {
                1.0
            } else {
                t / self.top_time
            }
        } else {
            let down = self.duration - self.top_time;
            if down <= 0.0 {
                0.0
            } else {
                1.0 - (t - self.top_time) / down
            }
        };
        smoothstep(phase.clamp(0.0, 1.0))
    }

    fn lead_wrist(&self, t: f64) -> (f64, f64) {
        let angle = -FRAC_PI_2 + (self.plane_deg.to_radians() + FRAC_PI_2) * self.lift(t);
        (
            SHOULDER.0 + ARM_LENGTH * angle.cos(),
            SHOULDER.1 + ARM_LENGTH * angle.sin(),
        )
    }

    fn hip_x(&self, t: f64) -> f64 {
        let progress = if self.duration > 0.0 {
            (t / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        0.5 + self.sway_cm / 100.0 * progress
    }

    fn dropped(&self, t: f64) -> bool {
        if self.dropout_every == 0 {
            return false;
        }
        let index = (t * self.fps).round() as usize;
        index % self.dropout_every == self.dropout_every - 1
    }

    pub fn pose_at(&self, t: f64) -> RawPose {
        let (wx, wy) = self.lead_wrist(t);
        let hip_x = self.hip_x(t);
        let joints = [
            (JointId::Neck, 0.50, 0.78, 0.9),
            (JointId::LeftShoulder, SHOULDER.0, SHOULDER.1, 0.9),
            (JointId::RightShoulder, 0.56, 0.70, 0.85),
            (JointId::LeftElbow, (SHOULDER.0 + wx) / 2.0, (SHOULDER.1 + wy) / 2.0, 0.7),
            (JointId::LeftWrist, wx, wy, 0.8),
            (JointId::RightWrist, wx + 0.02, wy, 0.6),
            (JointId::Root, hip_x, HIP_Y, 0.9),
            (JointId::LeftHip, hip_x - 0.04, HIP_Y, 0.8),
            (JointId::RightHip, hip_x + 0.04, HIP_Y, 0.8),
            (JointId::LeftKnee, 0.47, 0.25, 0.7),
            (JointId::RightKnee, 0.55, 0.25, 0.7),
            (JointId::LeftAnkle, 0.46, 0.06, 0.35),
            // Only clears the live threshold.
            (JointId::RightAnkle, 0.56, 0.06, 0.25),
        ];

        joints
            .into_iter()
            .map(|(id, x, y, c)| (id, JointObservation::new(x, y, c)))
            .collect()
    }

    /// Frames of a live camera feed at `fps`, covering the whole swing.
    pub fn live_feed(&self, fps: f64) -> impl Iterator<Item = VideoFrame> + '_ {
        let count = if fps > 0.0 {
            (self.duration * fps + 1e-9).floor() as usize + 1
        } else {
            0
        };
        (0..count).filter_map(move |i| self.image_at(i as f64 / fps))
    }
}

impl VideoSource for SimulatedSwing {
    fn duration(&self) -> Option<f64> {
        Some(self.duration)
    }

    fn image_at(&self, timestamp: f64) -> Option<VideoFrame> {
        if !(0.0..=self.duration + 1e-9).contains(&timestamp) {
            return None;
        }
        Some(VideoFrame::new(timestamp, DynamicImage::new_rgb8(8, 8)))
    }
}

impl PoseDetector for SimulatedSwing {
    fn detect(&self, frame: &VideoFrame) -> Result<Option<RawPose>, DetectorError> {
        if self.dropped(frame.timestamp) {
            return Ok(None);
        }
        Ok(Some(self.pose_at(frame.timestamp)))
    }
}

fn smoothstep(x: f64) -> f64 {
    x * x * (3.0 - 2.0 * x)
}
