// src/feedback.rs - Rule-based coaching cues from swing metrics
use crate::analysis::AnalysisResult;
use crate::metrics::TempoClass;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachingTip {
    pub cue: String,
    pub drill: String,
}

impl CoachingTip {
    fn new(cue: &str, drill: &str) -> Self {
        Self {
            cue: cue.to_string(),
            drill: drill.to_string(),
        }
    }
}

pub struct CoachingFeedbackGenerator;

impl CoachingFeedbackGenerator {
    /// One tip per out-of-band metric, ordered tempo, plane, sway. When every
    /// metric is in band a single reinforcement tip is returned instead.
    pub fn generate(result: &AnalysisResult) -> Vec<CoachingTip> {
        let mut tips = Vec::with_capacity(3);

        match result.tempo.classification() {
            TempoClass::TooFast => tips.push(CoachingTip::new(
                result.tempo.feedback(),
                "Count 1-2 to top, 3 through impact",
            )),
            TempoClass::SlowTransition => tips.push(CoachingTip::new(
                result.tempo.feedback(),
                "Pause at top for 1 count",
            )),
            TempoClass::Good => {}
        }

        if result.plane.is_steep() || result.plane.is_flat() {
            tips.push(CoachingTip::new(
                result.plane.feedback(),
                "Practice half-swings with alignment stick",
            ));
        }

        if result.sway.is_excessive() {
            tips.push(CoachingTip::new(
                result.sway.feedback(),
                "Keep trail hip back through impact",
            ));
        }

        if tips.is_empty() {
            tips.push(CoachingTip::new(
                "Good swing fundamentals",
                "Continue with current form",
            ));
        }
        tips
    }

    /// The tip a single-cue presentation would show.
    pub fn primary(result: &AnalysisResult) -> CoachingTip {
        let mut tips = Self::generate(result);
        // generate never returns an empty list
        tips.swap_remove(0)
    }
}
