// src/detector.rs - Boundary to the external body-pose detector
use crate::error::DetectorError;
use crate::pose::RawPose;
use crate::video::VideoFrame;

/// Image to joint-coordinates capability supplied by the host application.
///
/// `Ok(None)` means no person was found in the frame. That is an ordinary
/// outcome, not an error.
pub trait PoseDetector: Send + Sync {
    fn detect(&self, frame: &VideoFrame) -> Result<Option<RawPose>, DetectorError>;
}

impl<F> PoseDetector for F
where
    F: Fn(&VideoFrame) -> Result<Option<RawPose>, DetectorError> + Send + Sync,
{
    fn detect(&self, frame: &VideoFrame) -> Result<Option<RawPose>, DetectorError> {
        self(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{JointId, JointObservation};
    use image::DynamicImage;

    #[test]
    fn closures_act_as_detectors() {
        let detector = |frame: &VideoFrame| -> Result<Option<RawPose>, DetectorError> {
            if frame.timestamp < 0.5 {
                return Ok(None);
            }
            let mut pose = RawPose::new();
            pose.insert(JointId::Root, JointObservation::new(0.5, 0.4, 0.9));
            Ok(Some(pose))
        };

        let early = VideoFrame::new(0.1, DynamicImage::new_rgb8(2, 2));
        let late = VideoFrame::new(0.9, DynamicImage::new_rgb8(2, 2));
        assert!(detector.detect(&early).unwrap().is_none());
        assert_eq!(detector.detect(&late).unwrap().unwrap().len(), 1);
    }
}
