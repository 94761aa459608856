use super::types::{Mask, FOREGROUND};
use crate::config::BackgroundConfig;
use image::{Luma, RgbImage};

const VAR_INIT: f32 = 15.0;
const VAR_MIN: f32 = 4.0;
const VAR_MAX: f32 = 5.0 * VAR_INIT;

/// Running per-pixel Gaussian background model.
///
/// Every pixel keeps a mean color and an isotropic variance. A pixel is
/// foreground when its squared distance to the mean exceeds
/// `var_threshold * variance`. Both statistics are updated on every frame with
/// a learning rate of `1 / min(frames_seen, history)`, so the model adapts
/// quickly while warming up and then settles to a `history`-frame average.
///
/// The model is an explicit object owned by the segmenter; `reset` returns it
/// to the untrained state.
pub struct BackgroundModel {
    history: u32,
    var_threshold: f32,
    width: u32,
    height: u32,
    mean: Vec<f32>,
    variance: Vec<f32>,
    frames_seen: u32,
}

impl BackgroundModel {
    pub fn new(config: &BackgroundConfig) -> Self {
        Self {
            history: config.history.max(1),
            var_threshold: config.var_threshold,
            width: 0,
            height: 0,
            mean: Vec::new(),
            variance: Vec::new(),
            frames_seen: 0,
        }
    }

    pub fn frames_seen(&self) -> u32 {
        self.frames_seen
    }

    pub fn reset(&mut self) {
        tracing::debug!("Resetting background model");
        self.mean.clear();
        self.variance.clear();
        self.frames_seen = 0;
    }

    /// Classify `frame` against the model, then fold it into the model.
    ///
    /// The first frame (or the first after a resolution change) seeds the
    /// model and is reported as all background.
    pub fn apply(&mut self, frame: &RgbImage) -> Mask {
        let (width, height) = frame.dimensions();
        let mut mask = Mask::new(width, height);

        if self.frames_seen == 0 || (width, height) != (self.width, self.height) {
            self.seed(frame);
            return mask;
        }

        self.frames_seen = self.frames_seen.saturating_add(1);
        let alpha = 1.0 / self.frames_seen.min(self.history) as f32;

        for (i, (x, y, pixel)) in frame.enumerate_pixels().enumerate() {
            let base = i * 3;
            let mut dist2 = 0.0;
            let mut deltas = [0.0f32; 3];
            for c in 0..3 {
                let delta = pixel[c] as f32 - self.mean[base + c];
                deltas[c] = delta;
                dist2 += delta * delta;
            }

            let variance = self.variance[i];
            if dist2 > self.var_threshold * variance {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
            }

            for c in 0..3 {
                self.mean[base + c] += alpha * deltas[c];
            }
            self.variance[i] = (variance + alpha * (dist2 - variance)).clamp(VAR_MIN, VAR_MAX);
        }

        mask
    }

    fn seed(&mut self, frame: &RgbImage) {
        let (width, height) = frame.dimensions();
        tracing::debug!("Seeding background model at {}x{}", width, height);
        self.width = width;
        self.height = height;
        self.mean = frame.as_raw().iter().map(|&v| v as f32).collect();
        self.variance = vec![VAR_INIT; (width * height) as usize];
        self.frames_seen = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::types::foreground_count;
    use image::Rgb;

    fn scene(with_object: bool) -> RgbImage {
        RgbImage::from_fn(20, 20, |x, y| {
            if with_object && (5..10).contains(&x) && (5..10).contains(&y) {
                Rgb([230, 180, 120])
            } else {
                Rgb([40, 40, 40])
            }
        })
    }

    #[test]
    fn first_frame_is_background() {
        let mut model = BackgroundModel::new(&BackgroundConfig::default());
        let mask = model.apply(&scene(true));
        assert_eq!(foreground_count(&mask), 0);
        assert_eq!(model.frames_seen(), 1);
    }

    #[test]
    fn new_object_is_foreground() {
        let mut model = BackgroundModel::new(&BackgroundConfig::default());
        for _ in 0..5 {
            model.apply(&scene(false));
        }
        let mask = model.apply(&scene(true));
        assert_eq!(foreground_count(&mask), 25);
        assert_eq!(mask.get_pixel(7, 7)[0], FOREGROUND);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn static_object_is_absorbed() {
        let config = BackgroundConfig {
            enabled: true,
            history: 10,
            var_threshold: 16.0,
        };
        let mut model = BackgroundModel::new(&config);
        model.apply(&scene(false));
        let mut last = 0;
        for _ in 0..60 {
            last = foreground_count(&model.apply(&scene(true)));
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn reset_makes_runs_repeatable() {
        let mut model = BackgroundModel::new(&BackgroundConfig::default());
        model.apply(&scene(false));
        let first = model.apply(&scene(true));
        model.reset();
        model.apply(&scene(false));
        let second = model.apply(&scene(true));
        assert_eq!(first, second);
    }
}
