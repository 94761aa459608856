use super::color::{rgb_to_ycrcb, ycrcb_to_rgb};
use super::types::Mask;
use crate::config::PreprocessConfig;
use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::equalize_histogram;

/// Preprocessor bringing camera frames to the working resolution and
/// lighting the segmenter expects
pub struct Preprocessor {
    target_width: Option<u32>,
    target_height: Option<u32>,
    blur_sigma: f32,
    equalize_luma: bool,
}

impl Preprocessor {
    pub fn new(config: &PreprocessConfig) -> Self {
        Self {
            target_width: config.resize_width,
            target_height: config.resize_height,
            blur_sigma: config.blur_sigma,
            equalize_luma: config.equalize_luma,
        }
    }

    /// Working dimensions for a frame of the given size. A single configured
    /// side keeps the aspect ratio.
    pub fn working_size(&self, width: u32, height: u32) -> (u32, u32) {
        match (self.target_width, self.target_height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, scale_side(height, w, width)),
            (None, Some(h)) => (scale_side(width, h, height), h),
            (None, None) => (width, height),
        }
    }

    /// Prepare a frame for segmentation
    ///
    /// Steps:
    /// 1. Resize to the working resolution
    /// 2. Gaussian blur to suppress sensor noise
    /// 3. Optionally equalize the luma histogram
    pub fn prepare(&self, image: &RgbImage) -> RgbImage {
        let _span = tracing::debug_span!("preprocess").entered();

        let (width, height) = image.dimensions();
        let (target_width, target_height) = self.working_size(width, height);

        let mut frame = if (width, height) != (target_width, target_height) && width > 0 && height > 0 {
            imageops::resize(image, target_width, target_height, imageops::FilterType::Triangle)
        } else {
            image.clone()
        };

        if self.blur_sigma > 0.0 {
            frame = imageops::blur(&frame, self.blur_sigma);
        }

        if self.equalize_luma {
            frame = equalize_luma(&frame);
        }

        frame
    }

    /// Convert a mask to a black/white RGB image for visualization
    pub fn mask_to_rgb(mask: &Mask) -> RgbImage {
        RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
            let value = mask.get_pixel(x, y)[0];
            Rgb([value, value, value])
        })
    }

    /// Keep the frame's pixels under the mask and black out the rest
    pub fn apply_mask(frame: &RgbImage, mask: &Mask) -> RgbImage {
        RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
            let inside = x < mask.width() && y < mask.height() && mask.get_pixel(x, y)[0] != 0;
            if inside {
                *frame.get_pixel(x, y)
            } else {
                Rgb([0, 0, 0])
            }
        })
    }
}

fn scale_side(side: u32, target: u32, reference: u32) -> u32 {
    if reference == 0 {
        return side;
    }
    ((side as f64 * target as f64 / reference as f64).round() as u32).max(1)
}

/// Histogram-equalize the luma channel, leaving chroma untouched.
fn equalize_luma(frame: &RgbImage) -> RgbImage {
    let (width, height) = frame.dimensions();
    let ycc: Vec<[u8; 3]> = frame.pixels().map(|p| rgb_to_ycrcb(p.0)).collect();

    let luma = GrayImage::from_fn(width, height, |x, y| Luma([ycc[(y * width + x) as usize][0]]));
    let luma = equalize_histogram(&luma);

    RgbImage::from_fn(width, height, |x, y| {
        let [_, cr, cb] = ycc[(y * width + x) as usize];
        Rgb(ycrcb_to_rgb([luma.get_pixel(x, y)[0], cr, cb]))
    })
}
