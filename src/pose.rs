// src/pose.rs - Joint identifiers and confidence-filtered pose frames
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Detection confidence a joint must exceed to be kept by the batch analysis.
pub const BATCH_CONFIDENCE_THRESHOLD: f32 = 0.3;
/// Live overlay tracking trades precision for responsiveness.
pub const LIVE_CONFIDENCE_THRESHOLD: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointId {
    Neck,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    Root,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointId {
    pub const ALL: [JointId; 14] = [
        JointId::Neck,
        JointId::LeftShoulder,
        JointId::RightShoulder,
        JointId::LeftElbow,
        JointId::RightElbow,
        JointId::LeftWrist,
        JointId::RightWrist,
        JointId::Root,
        JointId::LeftHip,
        JointId::RightHip,
        JointId::LeftKnee,
        JointId::RightKnee,
        JointId::LeftAnkle,
        JointId::RightAnkle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            JointId::Neck => "neck",
            JointId::LeftShoulder => "left_shoulder",
            JointId::RightShoulder => "right_shoulder",
            JointId::LeftElbow => "left_elbow",
            JointId::RightElbow => "right_elbow",
            JointId::LeftWrist => "left_wrist",
            JointId::RightWrist => "right_wrist",
            JointId::Root => "root",
            JointId::LeftHip => "left_hip",
            JointId::RightHip => "right_hip",
            JointId::LeftKnee => "left_knee",
            JointId::RightKnee => "right_knee",
            JointId::LeftAnkle => "left_ankle",
            JointId::RightAnkle => "right_ankle",
        }
    }
}

/// One joint as reported by a pose detector, before confidence filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointObservation {
    pub x: f64,
    pub y: f64,
    pub confidence: f32,
}

impl JointObservation {
    pub fn new(x: f64, y: f64, confidence: f32) -> Self {
        Self { x, y, confidence }
    }
}

/// Detector output for a single image.
pub type RawPose = HashMap<JointId, JointObservation>;

/// A detected skeleton at one instant.
///
/// Coordinates are normalized to `[0, 1]` with the origin at the bottom-left of
/// the frame (x right, y up). Joints that did not clear the confidence threshold
/// are absent from `joints`; there is no sentinel position.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFrame {
    pub timestamp: f64,
    joints: BTreeMap<JointId, Point2<f64>>,
}

impl PoseFrame {
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            joints: BTreeMap::new(),
        }
    }

    pub fn from_observations(timestamp: f64, raw: &RawPose, confidence_threshold: f32) -> Self {
        let joints = raw
            .iter()
            .filter(|(_, obs)| obs.confidence > confidence_threshold)
            .filter(|(_, obs)| obs.x.is_finite() && obs.y.is_finite())
            .map(|(id, obs)| (*id, Point2::new(obs.x, obs.y)))
            .collect();

        Self { timestamp, joints }
    }

    pub fn with_joint(mut self, joint: JointId, x: f64, y: f64) -> Self {
        self.joints.insert(joint, Point2::new(x, y));
        self
    }

    pub fn joint(&self, joint: JointId) -> Option<Point2<f64>> {
        self.joints.get(&joint).copied()
    }

    pub fn joints(&self) -> impl Iterator<Item = (JointId, Point2<f64>)> + '_ {
        self.joints.iter().map(|(id, p)| (*id, *p))
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Mean height of whichever wrists are tracked, `None` when neither is.
    pub fn mean_wrist_height(&self) -> Option<f64> {
        let heights: Vec<f64> = [JointId::LeftWrist, JointId::RightWrist]
            .iter()
            .filter_map(|j| self.joint(*j))
            .map(|p| p.y)
            .collect();

        if heights.is_empty() {
            None
        } else {
            Some(heights.iter().sum::<f64>() / heights.len() as f64)
        }
    }
}
