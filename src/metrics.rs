// src/metrics.rs - Tempo, swing plane and hip sway from a pose sequence
use crate::pose::JointId;
use crate::sequence::PoseSequence;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TEMPO_GOOD_MIN: f64 = 2.5;
pub const TEMPO_GOOD_MAX: f64 = 3.5;
pub const PLANE_STEEP_ABOVE_DEG: f64 = 60.0;
pub const PLANE_FLAT_BELOW_DEG: f64 = 45.0;
/// Reported when the lead shoulder or wrist is missing at the top frame.
pub const PLANE_FALLBACK_DEG: f64 = 45.0;
pub const SWAY_LIMIT_CM: f64 = 8.0;
/// One normalized unit of frame width is treated as roughly a metre.
pub const CM_PER_NORMALIZED_UNIT: f64 = 100.0;
/// Floor for the downswing duration so the tempo ratio stays finite.
pub const MIN_DOWNSWING_SECS: f64 = 1e-3;

const LEAD_SHOULDER: JointId = JointId::LeftShoulder;
const LEAD_WRIST: JointId = JointId::LeftWrist;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempoClass {
    Good,
    TooFast,
    SlowTransition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoMetric {
    pub backswing_duration: f64,
    pub downswing_duration: f64,
    pub ratio: f64,
}

impl TempoMetric {
    /// Builds the metric from raw phase durations, clamping a degenerate downswing.
    pub fn from_durations(backswing: f64, downswing: f64) -> Self {
        let backswing_duration = backswing.max(0.0);
        let downswing_duration = if downswing < MIN_DOWNSWING_SECS {
            debug!(downswing, "degenerate downswing, clamping divisor");
            MIN_DOWNSWING_SECS
        } else {
            downswing
        };

        Self {
            backswing_duration,
            downswing_duration,
            ratio: backswing_duration / downswing_duration,
        }
    }

    pub fn classification(&self) -> TempoClass {
        if self.ratio < TEMPO_GOOD_MIN {
            TempoClass::TooFast
        } else if self.ratio > TEMPO_GOOD_MAX {
            TempoClass::SlowTransition
        } else {
            TempoClass::Good
        }
    }

    pub fn is_good(&self) -> bool {
        self.classification() == TempoClass::Good
    }

    pub fn feedback(&self) -> &'static str {
        match self.classification() {
            TempoClass::TooFast => "Too fast on the way down",
            TempoClass::SlowTransition => "Slow down your transition",
            TempoClass::Good => "Good tempo rhythm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaneClass {
    Good,
    Steep,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneMetric {
    /// Lead arm angle from horizontal at the top of the backswing, in degrees.
    pub angle_at_top: f64,
}

impl PlaneMetric {
    pub fn classification(&self) -> PlaneClass {
        if self.angle_at_top > PLANE_STEEP_ABOVE_DEG {
            PlaneClass::Steep
        } else if self.angle_at_top < PLANE_FLAT_BELOW_DEG {
            PlaneClass::Flat
        } else {
            PlaneClass::Good
        }
    }

    pub fn is_steep(&self) -> bool {
        self.classification() == PlaneClass::Steep
    }

    pub fn is_flat(&self) -> bool {
        self.classification() == PlaneClass::Flat
    }

    pub fn feedback(&self) -> &'static str {
        match self.classification() {
            PlaneClass::Steep => "Shaft too steep at top",
            PlaneClass::Flat => "Shaft too flat at top",
            PlaneClass::Good => "Good shaft angle",
        }
    }
}

/// Direction of hip travel as seen by the camera, not relative to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwayClass {
    Stable,
    Rightward,
    Leftward,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwayMetric {
    pub start_x: f64,
    pub impact_x: f64,
    /// Positive toward the right of the frame.
    pub delta_cm: f64,
}

impl SwayMetric {
    pub fn zero() -> Self {
        Self {
            start_x: 0.0,
            impact_x: 0.0,
            delta_cm: 0.0,
        }
    }

    pub fn classification(&self) -> SwayClass {
        if self.delta_cm > SWAY_LIMIT_CM {
            SwayClass::Rightward
        } else if self.delta_cm < -SWAY_LIMIT_CM {
            SwayClass::Leftward
        } else {
            SwayClass::Stable
        }
    }

    pub fn is_excessive(&self) -> bool {
        self.delta_cm.abs() > SWAY_LIMIT_CM
    }

    pub fn feedback(&self) -> &'static str {
        match self.classification() {
            SwayClass::Rightward => "Too much rightward hip sway",
            SwayClass::Leftward => "Too much leftward hip sway",
            SwayClass::Stable => "Good hip stability",
        }
    }
}

/// The three metrics plus the frame all of them agreed was the top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingMetrics {
    pub top_frame_index: usize,
    pub tempo: TempoMetric,
    pub plane: PlaneMetric,
    pub sway: SwayMetric,
}

/// Stateless metric extraction over a gated [`PoseSequence`].
pub struct MetricCalculator;

impl MetricCalculator {
    pub fn compute(sequence: &PoseSequence) -> SwingMetrics {
        let top = Self::find_top_frame(sequence);

        SwingMetrics {
            top_frame_index: top,
            tempo: Self::tempo(sequence, top),
            plane: Self::plane(sequence, top),
            sway: Self::sway(sequence),
        }
    }

    /// Index of the frame with the highest mean wrist height, earliest on ties.
    /// Frames without any tracked wrist are not candidates; if no frame has one
    /// the first frame is used.
    pub fn find_top_frame(sequence: &PoseSequence) -> usize {
        let mut best: Option<(usize, f64)> = None;

        for (i, frame) in sequence.frames().iter().enumerate() {
            let Some(height) = frame.mean_wrist_height() else {
                continue;
            };
            match best {
                Some((_, best_height)) if height <= best_height => {}
                _ => best = Some((i, height)),
            }
        }

        match best {
            Some((index, _)) => index,
            None => {
                debug!("no wrists tracked in sequence, using first frame as top");
                0
            }
        }
    }

    pub fn tempo(sequence: &PoseSequence, top: usize) -> TempoMetric {
        let (Some(first), Some(last), Some(top_frame)) =
            (sequence.first(), sequence.last(), sequence.get(top))
        else {
            return TempoMetric::from_durations(0.0, 0.0);
        };

        TempoMetric::from_durations(
            top_frame.timestamp - first.timestamp,
            last.timestamp - top_frame.timestamp,
        )
    }

    pub fn plane(sequence: &PoseSequence, top: usize) -> PlaneMetric {
        let joints = sequence
            .get(top)
            .and_then(|f| Some((f.joint(LEAD_SHOULDER)?, f.joint(LEAD_WRIST)?)));

        let Some((shoulder, wrist)) = joints else {
            debug!(top, "lead shoulder or wrist missing at top, using neutral plane");
            return PlaneMetric {
                angle_at_top: PLANE_FALLBACK_DEG,
            };
        };

        let arm = wrist - shoulder;
        PlaneMetric {
            angle_at_top: normalize_degrees(arm.y.atan2(arm.x).to_degrees()),
        }
    }

    pub fn sway(sequence: &PoseSequence) -> SwayMetric {
        let hips = sequence
            .first()
            .and_then(|f| f.joint(JointId::Root))
            .zip(sequence.last().and_then(|f| f.joint(JointId::Root)));

        let Some((start, impact)) = hips else {
            debug!("root joint missing at an endpoint, reporting zero sway");
            return SwayMetric::zero();
        };

        let start_x = start.x * CM_PER_NORMALIZED_UNIT;
        let impact_x = impact.x * CM_PER_NORMALIZED_UNIT;
        SwayMetric {
            start_x,
            impact_x,
            delta_cm: impact_x - start_x,
        }
    }
}

/// Maps an angle into `(-180, 180]`.
fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped - 360.0
    } else if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}
