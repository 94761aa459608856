use crate::config::ChannelRange;
use image::{GrayImage, RgbImage};

/// Binary foreground mask: 255 = hand/skin, 0 = background.
/// Dimensions match the frame it was computed from.
pub type Mask = GrayImage;

pub const FOREGROUND: u8 = 255;

/// Trait for frame segmenters
/// Allows swapping the color-threshold segmenter for other backends
pub trait Segmenter {
    /// Classify every pixel of `frame` as foreground or background.
    ///
    /// Never fails: an empty or a full mask is a valid answer and simply
    /// means "no hand" further down the pipeline.
    fn segment(&mut self, frame: &RgbImage) -> Mask;

    /// Replace the HSV skin bounds, keeping any cross-frame state.
    fn set_hsv_range(&mut self, range: ChannelRange);

    /// Drop any state accumulated across frames
    ///
    /// Call this when:
    /// - Switching cameras
    /// - Restarting capture
    /// - Isolating test cases
    fn reset_state(&mut self) {
        // Default implementation: no-op for stateless segmenters
    }
}

/// Number of foreground pixels in a mask.
pub fn foreground_count(mask: &Mask) -> usize {
    mask.as_raw().iter().filter(|&&v| v != 0).count()
}
