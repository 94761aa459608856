mod background;
pub mod color;
mod preprocess;
mod skin;
pub mod types;

pub use background::BackgroundModel;
pub use preprocess::Preprocessor;
pub use skin::{calibrate_skin_range, center_sample_region, segment, SkinSegmenter};
pub use types::{foreground_count, Mask, Segmenter, FOREGROUND};

use crate::config::SegmentationConfig;

/// Create the default segmenter (color thresholds, optional background model)
pub fn create_default_segmenter(config: &SegmentationConfig) -> Box<dyn Segmenter + Send> {
    Box::new(SkinSegmenter::new(config.clone()))
}
