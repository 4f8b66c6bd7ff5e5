// src/video.rs - Video sources the engine samples frames from
use image::DynamicImage;

/// A decoded image together with its position in the clip or feed, in seconds.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub timestamp: f64,
    pub image: DynamicImage,
}

impl VideoFrame {
    pub fn new(timestamp: f64, image: DynamicImage) -> Self {
        Self { timestamp, image }
    }
}

/// A recorded clip the batch analysis can pull frames from.
///
/// Decoding and file access belong to the implementor; the engine only asks for
/// the duration and for an image at a timestamp.
pub trait VideoSource: Send + Sync {
    /// Clip length in seconds, `None` when it cannot be determined.
    fn duration(&self) -> Option<f64>;

    fn image_at(&self, timestamp: f64) -> Option<VideoFrame>;
}

/// Clip whose frames are already decoded in memory.
pub struct DecodedClip {
    frames: Vec<DynamicImage>,
    fps: f64,
}

impl DecodedClip {
    pub fn new(frames: Vec<DynamicImage>, fps: f64) -> Self {
        Self { frames, fps }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    fn index_for(&self, timestamp: f64) -> Option<usize> {
        if self.frames.is_empty() || !timestamp.is_finite() || timestamp < 0.0 {
            return None;
        }
        let index = (timestamp * self.fps).round() as usize;
        Some(index.min(self.frames.len() - 1))
    }
}

impl VideoSource for DecodedClip {
    fn duration(&self) -> Option<f64> {
        if self.fps > 0.0 && self.fps.is_finite() {
            Some(self.frames.len() as f64 / self.fps)
        } else {
            None
        }
    }

    fn image_at(&self, timestamp: f64) -> Option<VideoFrame> {
        let index = self.index_for(timestamp)?;
        self.frames
            .get(index)
            .map(|img| VideoFrame::new(timestamp, img.clone()))
    }
}
