//! Hand gesture recognition from a color video stream.
//!
//! Each frame runs through skin segmentation, contour extraction, convex hull
//! analysis and finger counting. Hand centroid motion and a debouncing
//! aggregator turn the per-frame readings into discrete [`GestureEvent`]s.

pub mod capture;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod segmentation;
pub mod tracking;
pub mod worker;

pub use config::GestureConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{FrameResult, GesturePipeline, HandState};
pub use tracking::{Direction, GestureEvent};
pub use worker::{PipelineWorker, WorkerEvent, WorkerHandle, WorkerOptions};
