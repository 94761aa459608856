use super::types::Contour;
use crate::config::ContourConfig;
use crate::segmentation::Mask;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;

/// The contour picked as "the hand" for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandCandidate {
    /// Boundary handed to finger counting, simplified if configured.
    pub contour: Contour,
    /// Center of mass of the traced (unsimplified) boundary.
    pub centroid: Point<f64>,
    pub area: f64,
}

/// Picks the dominant outer silhouette out of a mask.
pub struct ContourExtractor {
    min_area: f64,
    approx_fraction: f64,
}

impl ContourExtractor {
    pub fn new(config: &ContourConfig) -> Self {
        Self {
            min_area: config.min_area,
            approx_fraction: config.approx_fraction,
        }
    }

    pub fn min_area(&self) -> f64 {
        self.min_area
    }

    /// Largest outermost contour whose area reaches `min_area`, or `None`
    /// when nothing in the mask is big enough to be a hand.
    pub fn extract(&self, mask: &Mask) -> Option<HandCandidate> {
        let _span = tracing::debug_span!("extract_contour").entered();

        if mask.width() == 0 || mask.height() == 0 {
            return None;
        }

        let outlines = find_contours::<i32>(mask)
            .into_iter()
            .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
            .map(|c| Contour::new(c.points));

        let candidate = select_candidate(outlines, self.min_area)?;
        let contour = candidate.contour.approximate(self.approx_fraction);
        tracing::trace!(
            "Hand candidate: area={:.0}, points={} ({} after approximation)",
            candidate.area,
            candidate.contour.len(),
            contour.len()
        );

        Some(HandCandidate { contour, ..candidate })
    }
}

/// Choose the largest contour, accepting it only if its area is at least
/// `min_area` and it has a well-defined centroid.
pub fn select_candidate<I>(contours: I, min_area: f64) -> Option<HandCandidate>
where
    I: IntoIterator<Item = Contour>,
{
    let mut best: Option<(f64, Contour)> = None;
    for contour in contours {
        let area = contour.area();
        if best.as_ref().map_or(true, |(best_area, _)| area > *best_area) {
            best = Some((area, contour));
        }
    }

    let (area, contour) = best?;
    if area < min_area {
        tracing::trace!("Largest contour {:.0} px² below minimum {:.0}", area, min_area);
        return None;
    }
    let centroid = contour.centroid()?;
    Some(HandCandidate {
        contour,
        centroid,
        area,
    })
}
