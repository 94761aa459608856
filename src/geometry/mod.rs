mod contour;
mod fingers;
pub mod hull;
pub mod types;

pub use contour::{select_candidate, ContourExtractor, HandCandidate};
pub use fingers::{create_counter, AngleCounter, DefectCounter, FingerCounter, FingerEstimate};
pub use hull::{convex_hull_indices, convexity_defects, ConvexityDefect};
pub use types::Contour;
