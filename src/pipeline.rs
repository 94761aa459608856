use crate::config::{ChannelRange, GestureConfig};
use crate::error::PipelineResult;
use crate::geometry::{create_counter, Contour, ContourExtractor, FingerCounter};
use crate::segmentation::{
    calibrate_skin_range, center_sample_region, create_default_segmenter, Mask, Preprocessor,
    Segmenter,
};
use crate::tracking::{GestureAggregator, GestureEvent, MotionState, MotionTracker};
use image::RgbImage;
use imageproc::point::Point;
use std::time::{Duration, Instant};

/// Side of the square sampled by [`GesturePipeline::calibrate`].
pub const CALIBRATION_SIDE: u32 = 100;

/// Per-frame summary of the detected hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandState {
    pub centroid: Point<f64>,
    pub finger_count: u32,
    pub fingertips: Vec<Point<i32>>,
    pub contour: Contour,
    pub hull: Vec<Point<i32>>,
    pub area: f64,
}

/// Wall time spent in each stage for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    pub preprocess: Duration,
    pub segment: Duration,
    pub contour: Duration,
    pub fingers: Duration,
    pub tracking: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.preprocess + self.segment + self.contour + self.fingers + self.tracking
    }

    pub fn accumulate(&mut self, other: &StageTimings) {
        self.preprocess += other.preprocess;
        self.segment += other.segment;
        self.contour += other.contour;
        self.fingers += other.fingers;
        self.tracking += other.tracking;
    }
}

/// Everything the pipeline produced for one frame.
///
/// `frame` and `mask` are at the working resolution, and all geometry in
/// `hand` is expressed in that coordinate space.
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub frame: RgbImage,
    pub mask: Mask,
    /// `None` when no contour reached the minimum area. A present hand with
    /// zero fingers is `Some` with `finger_count == 0`.
    pub hand: Option<HandState>,
    pub motion: MotionState,
    pub gesture: Option<GestureEvent>,
    pub timings: StageTimings,
}

/// Frame-to-gesture pipeline. Owns every piece of cross-frame state and is
/// driven from a single thread, one frame at a time.
pub struct GesturePipeline {
    config: GestureConfig,
    preprocessor: Preprocessor,
    segmenter: Box<dyn Segmenter + Send>,
    extractor: ContourExtractor,
    counter: Box<dyn FingerCounter + Send>,
    motion: MotionTracker,
    aggregator: GestureAggregator,
    started: Instant,
}

impl GesturePipeline {
    pub fn new(config: &GestureConfig) -> PipelineResult<Self> {
        config.validate()?;

        let counter = create_counter(&config.fingers);
        tracing::info!(
            "Gesture pipeline: counter={}, min_area={:.0}, debounce={:.1}s, background={}",
            counter.name(),
            config.contour.min_area,
            config.gesture.debounce_secs,
            config.segmentation.background.enabled
        );

        Ok(Self {
            preprocessor: Preprocessor::new(&config.preprocess),
            segmenter: create_default_segmenter(&config.segmentation),
            extractor: ContourExtractor::new(&config.contour),
            counter,
            motion: MotionTracker::new(&config.motion),
            aggregator: GestureAggregator::new(&config.gesture),
            started: Instant::now(),
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Process a frame, timestamped relative to pipeline creation.
    pub fn process_frame(&mut self, frame: &RgbImage) -> FrameResult {
        let now = self.started.elapsed();
        self.process_frame_at(frame, now)
    }

    /// Process a frame with an explicit timestamp. Timestamps are expected to
    /// be non-decreasing.
    pub fn process_frame_at(&mut self, frame: &RgbImage, now: Duration) -> FrameResult {
        let mut timings = StageTimings::default();

        let start = Instant::now();
        let working = self.preprocessor.prepare(frame);
        timings.preprocess = start.elapsed();

        let start = Instant::now();
        let mask = self.segmenter.segment(&working);
        timings.segment = start.elapsed();

        let start = Instant::now();
        let candidate = self.extractor.extract(&mask);
        timings.contour = start.elapsed();

        let start = Instant::now();
        let hand = candidate.map(|candidate| {
            let estimate = self.counter.count(&candidate.contour);
            HandState {
                centroid: candidate.centroid,
                finger_count: estimate.count,
                fingertips: estimate.fingertips,
                contour: candidate.contour,
                hull: estimate.hull,
                area: candidate.area,
            }
        });
        timings.fingers = start.elapsed();

        let start = Instant::now();
        let gesture = {
            let _span = tracing::debug_span!("track").entered();
            match &hand {
                Some(hand) => {
                    let direction = self.motion.update(hand.centroid);
                    self.aggregator.observe(hand.finger_count, direction, now)
                }
                None => {
                    self.motion.mark_lost();
                    None
                }
            }
        };
        timings.tracking = start.elapsed();

        if let Some(event) = &gesture {
            tracing::debug!(
                "Gesture at {:.2}s: fingers={}, direction={}",
                event.timestamp.as_secs_f64(),
                event.fingers,
                event.direction
            );
        }

        FrameResult {
            frame: working,
            mask,
            hand,
            motion: self.motion.state(),
            gesture,
            timings,
        }
    }

    /// Re-derive the HSV skin range from the centre of `frame` and use it for
    /// subsequent frames. Only the bounds change; the background model and
    /// tracking state are kept. Returns the new range, or `None` when the
    /// frame is too small to sample.
    pub fn calibrate(&mut self, frame: &RgbImage) -> Option<ChannelRange> {
        let working = self.preprocessor.prepare(frame);
        let (width, height) = working.dimensions();
        let side = CALIBRATION_SIDE.min(width).min(height);
        if side == 0 {
            return None;
        }

        let range = calibrate_skin_range(&working, center_sample_region(width, height, side))?;
        tracing::info!(
            "Calibrated skin range: lower={:?}, upper={:?}",
            range.lower,
            range.upper
        );

        self.config.segmentation.hsv = range;
        self.segmenter.set_hsv_range(range);
        Some(range)
    }

    /// Forget all cross-frame state: background model, motion and debounce.
    pub fn reset(&mut self) {
        self.segmenter.reset_state();
        self.motion.reset();
        self.aggregator.reset();
        self.started = Instant::now();
    }
}
