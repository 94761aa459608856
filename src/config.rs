use crate::error::{PipelineError, PipelineResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Complete per-run configuration of the frame-to-gesture pipeline.
///
/// Every section defaults independently, so a config file only needs the
/// fields it wants to change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub preprocess: PreprocessConfig,
    pub segmentation: SegmentationConfig,
    pub contour: ContourConfig,
    pub fingers: FingerConfig,
    pub motion: MotionConfig,
    pub gesture: AggregatorConfig,
}

/// Inclusive per-channel bounds, applied after a color space conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ChannelRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, sample: [u8; 3]) -> bool {
        (0..3).all(|c| sample[c] >= self.lower[c] && sample[c] <= self.upper[c])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Working resolution; frames are downscaled before segmentation when set.
    pub resize_width: Option<u32>,
    pub resize_height: Option<u32>,
    /// Gaussian blur sigma, 0 disables the blur.
    pub blur_sigma: f32,
    /// Equalize the luma histogram before segmentation.
    pub equalize_luma: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            resize_width: None,
            resize_height: None,
            blur_sigma: 0.8,
            equalize_luma: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelShape {
    /// Full square structuring element (chessboard distance).
    Square,
    /// Diamond structuring element (city-block distance), the closest the
    /// distance-based morphology gets to an ellipse.
    Diamond,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// HSV bounds, OpenCV convention: H in [0, 180), S and V in [0, 255].
    pub hsv: ChannelRange,
    /// Optional YCrCb bounds, ANDed with the HSV mask when present.
    pub ycrcb: Option<ChannelRange>,
    /// Odd structuring element side length.
    pub kernel_size: u8,
    pub kernel_shape: KernelShape,
    pub close_iterations: u8,
    pub open_iterations: u8,
    pub background: BackgroundConfig,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            hsv: ChannelRange::new([0, 48, 80], [20, 255, 255]),
            ycrcb: Some(ChannelRange::new([0, 133, 77], [255, 173, 127])),
            kernel_size: 5,
            kernel_shape: KernelShape::Square,
            close_iterations: 2,
            open_iterations: 2,
            background: BackgroundConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub enabled: bool,
    /// Number of frames the learning rate averages over once warmed up.
    pub history: u32,
    /// Squared Mahalanobis distance above which a pixel is foreground.
    pub var_threshold: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            history: 500,
            var_threshold: 16.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Minimum enclosed area in px² at the working resolution.
    pub min_area: f64,
    /// Polygon approximation tolerance as a fraction of the perimeter.
    /// 0 keeps the traced contour untouched.
    pub approx_fraction: f64,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            min_area: 5000.0,
            approx_fraction: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountingMethod {
    Defects,
    Angles,
}

impl std::str::FromStr for CountingMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "defects" => Ok(Self::Defects),
            "angles" => Ok(Self::Angles),
            other => Err(format!("unknown counting method '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerConfig {
    pub method: CountingMethod,
    /// Contours with fewer points are too coarse to count on.
    pub min_contour_points: usize,
    pub min_defect_depth: f64,
    pub max_valley_angle_deg: f64,
    /// Angle method: hull vertices sharper than this are fingertip candidates.
    pub tip_angle_max_deg: f64,
    /// Angle method: when set, the vertex after a tip must be within this
    /// many degrees of a straight line.
    pub straight_tolerance_deg: Option<f64>,
    /// Angle method: when set, the distance between the tip's two hull
    /// neighbours must stay below this many pixels.
    pub max_span_px: Option<f64>,
    /// Report one finger when no valley qualifies but the silhouette is
    /// elongated. Unreliable; see `DefectCounter`.
    pub single_finger_fallback: bool,
    /// Isoperimetric ratio `perimeter² / (4π·area)` above which the fallback
    /// reports a finger. A disc is 1.0.
    pub fallback_compactness: f64,
}

impl Default for FingerConfig {
    fn default() -> Self {
        Self {
            method: CountingMethod::Defects,
            min_contour_points: 20,
            min_defect_depth: 20.0,
            max_valley_angle_deg: 90.0,
            tip_angle_max_deg: 45.0,
            straight_tolerance_deg: None,
            max_span_px: None,
            single_finger_fallback: false,
            fallback_compactness: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Centroid displacement that must be exceeded to change direction.
    pub min_movement: f64,
    /// Selfie-view camera: positive image dx is the user's left.
    pub mirrored: bool,
    /// Forget the previous centroid after this many frames without a hand.
    pub reset_after_lost_frames: Option<u32>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            min_movement: 15.0,
            mirrored: true,
            reset_after_lost_frames: Some(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub debounce_secs: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self { debounce_secs: 2.0 }
    }
}

impl AggregatorConfig {
    /// Debounce interval; out-of-range values saturate instead of panicking.
    pub fn debounce(&self) -> Duration {
        Duration::try_from_secs_f64(self.debounce_secs).unwrap_or(if self.debounce_secs > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }
}

impl GestureConfig {
    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: GestureConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config to {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let seg = &self.segmentation;
        if seg.kernel_size == 0 || seg.kernel_size % 2 == 0 {
            return Err(PipelineError::Config(format!(
                "kernel_size must be odd, got {}",
                seg.kernel_size
            )));
        }
        let mut ranges = vec![("hsv", seg.hsv)];
        if let Some(ycrcb) = seg.ycrcb {
            ranges.push(("ycrcb", ycrcb));
        }
        for (name, range) in ranges {
            if (0..3).any(|c| range.lower[c] > range.upper[c]) {
                return Err(PipelineError::Config(format!(
                    "{name} lower bound {:?} exceeds upper bound {:?}",
                    range.lower, range.upper
                )));
            }
        }
        if seg.background.enabled && seg.background.history == 0 {
            return Err(PipelineError::Config("background history must be > 0".into()));
        }
        if !(self.contour.min_area >= 0.0) {
            return Err(PipelineError::Config("min_area must be >= 0".into()));
        }
        if !(0.0..1.0).contains(&self.contour.approx_fraction) {
            return Err(PipelineError::Config(
                "approx_fraction must be in [0, 1)".into(),
            ));
        }
        let debounce = self.gesture.debounce_secs;
        if !(debounce > 0.0) || Duration::try_from_secs_f64(debounce).is_err() {
            return Err(PipelineError::Config(format!(
                "debounce_secs must be a positive, representable duration, got {debounce}"
            )));
        }
        if !(self.motion.min_movement >= 0.0) {
            return Err(PipelineError::Config("min_movement must be >= 0".into()));
        }
        if matches!(
            (self.preprocess.resize_width, self.preprocess.resize_height),
            (Some(0), _) | (_, Some(0))
        ) {
            return Err(PipelineError::Config("working resolution must be non-zero".into()));
        }
        Ok(())
    }
}
