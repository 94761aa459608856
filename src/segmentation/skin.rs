use super::background::BackgroundModel;
use super::color::{rgb_to_hsv, rgb_to_ycrcb};
use super::types::{Mask, Segmenter, FOREGROUND};
use crate::config::{ChannelRange, KernelShape, SegmentationConfig};
use image::{Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use imageproc::rect::Rect;

/// Color-threshold skin segmenter with an optional background model.
pub struct SkinSegmenter {
    config: SegmentationConfig,
    background: Option<BackgroundModel>,
}

impl SkinSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        let background = config
            .background
            .enabled
            .then(|| BackgroundModel::new(&config.background));
        Self { config, background }
    }
}

impl Segmenter for SkinSegmenter {
    fn segment(&mut self, frame: &RgbImage) -> Mask {
        let _span = tracing::debug_span!("segment").entered();

        let mut mask = skin_mask(frame, &self.config);

        if let Some(model) = self.background.as_mut() {
            let moving = model.apply(frame);
            intersect(&mut mask, &moving);
        }

        clean_up(&mask, &self.config)
    }

    fn set_hsv_range(&mut self, range: ChannelRange) {
        tracing::debug!("HSV skin range now {:?}..={:?}", range.lower, range.upper);
        self.config.hsv = range;
    }

    fn reset_state(&mut self) {
        if let Some(model) = self.background.as_mut() {
            model.reset();
        }
    }
}

/// Stateless segmentation: color thresholds followed by morphology.
///
/// The background model is never consulted, so identical input always
/// produces an identical mask.
pub fn segment(frame: &RgbImage, config: &SegmentationConfig) -> Mask {
    clean_up(&skin_mask(frame, config), config)
}

/// Threshold in HSV and, when configured, YCrCb, keeping pixels inside both.
fn skin_mask(frame: &RgbImage, config: &SegmentationConfig) -> Mask {
    let mut mask = Mask::new(frame.width(), frame.height());
    for (x, y, pixel) in frame.enumerate_pixels() {
        let mut skin = config.hsv.contains(rgb_to_hsv(pixel.0));
        if skin {
            if let Some(ycrcb) = &config.ycrcb {
                skin = ycrcb.contains(rgb_to_ycrcb(pixel.0));
            }
        }
        if skin {
            mask.put_pixel(x, y, Luma([FOREGROUND]));
        }
    }
    mask
}

fn intersect(mask: &mut Mask, other: &Mask) {
    for (value, &keep) in mask.iter_mut().zip(other.iter()) {
        if keep == 0 {
            *value = 0;
        }
    }
}

/// Closing fills small holes, opening removes speckle. Repeating an
/// operation with the same element is the same as one pass with a
/// proportionally larger radius.
fn clean_up(mask: &Mask, config: &SegmentationConfig) -> Mask {
    let norm = match config.kernel_shape {
        KernelShape::Square => Norm::LInf,
        KernelShape::Diamond => Norm::L1,
    };
    let radius = config.kernel_size / 2;

    let mut cleaned = mask.clone();
    if radius == 0 || mask.width() == 0 || mask.height() == 0 {
        return cleaned;
    }

    let close_radius = radius.saturating_mul(config.close_iterations);
    if close_radius > 0 {
        cleaned = morphology::close(&cleaned, norm, close_radius);
    }
    let open_radius = radius.saturating_mul(config.open_iterations);
    if open_radius > 0 {
        cleaned = morphology::open(&cleaned, norm, open_radius);
    }
    cleaned
}

/// A `side`×`side` square in the middle of a frame, clipped to the frame.
pub fn center_sample_region(width: u32, height: u32, side: u32) -> Rect {
    let side_w = side.min(width).max(1);
    let side_h = side.min(height).max(1);
    let left = width.saturating_sub(side_w) / 2;
    let top = height.saturating_sub(side_h) / 2;
    Rect::at(left as i32, top as i32).of_size(side_w, side_h)
}

/// Derive HSV skin bounds from a region known to contain only skin.
///
/// The mean HSV of the region is widened by ±10 in hue (kept within the
/// 0..=25 skin band) and ±40 in saturation and value, with floors of 30 and
/// 60 so very dark or washed-out samples still leave a usable range.
/// Returns `None` when the region does not overlap the frame.
pub fn calibrate_skin_range(frame: &RgbImage, region: Rect) -> Option<ChannelRange> {
    let x0 = region.left().max(0) as u32;
    let y0 = region.top().max(0) as u32;
    let x1 = (region.right() + 1).max(0) as u32;
    let y1 = (region.bottom() + 1).max(0) as u32;
    let x1 = x1.min(frame.width());
    let y1 = y1.min(frame.height());
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let mut sums = [0.0f64; 3];
    let mut count = 0.0f64;
    for y in y0..y1 {
        for x in x0..x1 {
            let hsv = rgb_to_hsv(frame.get_pixel(x, y).0);
            for c in 0..3 {
                sums[c] += hsv[c] as f64;
            }
            count += 1.0;
        }
    }
    let [h, s, v] = sums.map(|sum| sum / count);

    let upper = [
        (h + 10.0).min(25.0),
        (s + 40.0).min(255.0),
        (v + 40.0).min(255.0),
    ];
    let lower = [
        (h - 10.0).max(0.0).min(upper[0]),
        (s - 40.0).max(30.0).min(upper[1]),
        (v - 40.0).max(60.0).min(upper[2]),
    ];

    Some(ChannelRange::new(
        lower.map(|c| c.round() as u8),
        upper.map(|c| c.round() as u8),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackgroundConfig;
    use crate::segmentation::types::foreground_count;
    use image::Rgb;

    const SKIN: Rgb<u8> = Rgb([224, 172, 105]);
    const WALL: Rgb<u8> = Rgb([30, 90, 200]);

    fn hand_frame() -> RgbImage {
        RgbImage::from_fn(60, 40, |x, y| {
            if (20..40).contains(&x) && (10..30).contains(&y) {
                SKIN
            } else {
                WALL
            }
        })
    }

    #[test]
    fn finds_skin_block() {
        let mask = segment(&hand_frame(), &SegmentationConfig::default());
        assert_eq!(mask.get_pixel(30, 20)[0], FOREGROUND);
        assert_eq!(mask.get_pixel(5, 5)[0], 0);
        assert_eq!(foreground_count(&mask), 400);
    }

    #[test]
    fn ycrcb_bounds_veto_hsv_matches() {
        let mut config = SegmentationConfig::default();
        config.ycrcb = Some(ChannelRange::new([0, 0, 0], [255, 130, 255]));
        let mask = segment(&hand_frame(), &config);
        assert_eq!(foreground_count(&mask), 0);
    }

    #[test]
    fn opening_removes_speckle() {
        let mut frame = RgbImage::from_pixel(40, 40, WALL);
        frame.put_pixel(10, 10, SKIN);
        frame.put_pixel(30, 12, SKIN);
        let mask = segment(&frame, &SegmentationConfig::default());
        assert_eq!(foreground_count(&mask), 0);
    }

    #[test]
    fn empty_and_full_frames_are_valid() {
        let config = SegmentationConfig::default();
        let empty = segment(&RgbImage::from_pixel(16, 16, WALL), &config);
        assert_eq!(foreground_count(&empty), 0);
        let full = segment(&RgbImage::from_pixel(16, 16, SKIN), &config);
        assert_eq!(foreground_count(&full), 256);
        let nothing = segment(&RgbImage::new(0, 0), &config);
        assert_eq!(nothing.dimensions(), (0, 0));
    }

    #[test]
    fn stateless_segmentation_is_repeatable() {
        let config = SegmentationConfig::default();
        let frame = hand_frame();
        assert_eq!(segment(&frame, &config), segment(&frame, &config));

        let mut segmenter = SkinSegmenter::new(config);
        let first = segmenter.segment(&frame);
        let second = segmenter.segment(&frame);
        assert_eq!(first, second);
    }

    #[test]
    fn background_model_suppresses_static_skin() {
        let mut config = SegmentationConfig::default();
        config.background = BackgroundConfig {
            enabled: true,
            ..BackgroundConfig::default()
        };
        let mut segmenter = SkinSegmenter::new(config);

        let empty_room = RgbImage::from_pixel(60, 40, WALL);
        segmenter.segment(&empty_room);
        segmenter.segment(&empty_room);
        let mask = segmenter.segment(&hand_frame());
        assert_eq!(foreground_count(&mask), 400);

        segmenter.reset_state();
        // Seeding frame after a reset is all background.
        let mask = segmenter.segment(&hand_frame());
        assert_eq!(foreground_count(&mask), 0);
    }

    #[test]
    fn new_range_applies_without_reseeding_background() {
        let mut config = SegmentationConfig::default();
        config.background.enabled = true;
        let mut segmenter = SkinSegmenter::new(config);

        let empty_room = RgbImage::from_pixel(60, 40, WALL);
        segmenter.segment(&empty_room);
        segmenter.segment(&empty_room);

        segmenter.set_hsv_range(ChannelRange::new([0, 30, 60], [25, 255, 255]));
        let mask = segmenter.segment(&hand_frame());
        assert_eq!(foreground_count(&mask), 400);

        segmenter.set_hsv_range(ChannelRange::new([100, 0, 0], [120, 255, 255]));
        assert_eq!(foreground_count(&segmenter.segment(&hand_frame())), 0);
    }

    #[test]
    fn calibration_centers_on_sample() {
        let frame = RgbImage::from_pixel(200, 200, SKIN);
        let region = center_sample_region(200, 200, 100);
        assert_eq!((region.left(), region.top(), region.width()), (50, 50, 100));

        let range = calibrate_skin_range(&frame, region).unwrap();
        // Sample is H=17, S=135, V=224.
        assert_eq!(range.lower, [7, 95, 184]);
        assert_eq!(range.upper, [25, 175, 255]);
        assert!(range.contains(rgb_to_hsv(SKIN.0)));
    }

    #[test]
    fn calibration_outside_frame_is_none() {
        let frame = RgbImage::from_pixel(10, 10, SKIN);
        assert!(calibrate_skin_range(&frame, Rect::at(20, 20).of_size(5, 5)).is_none());
    }
}
