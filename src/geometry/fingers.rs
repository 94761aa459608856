use super::hull::{angle_at, convex_hull_indices, convexity_defects};
use super::types::{distance, Contour};
use crate::config::{CountingMethod, FingerConfig};
use imageproc::point::Point;
use std::f64::consts::PI;

/// Raw per-frame finger estimate for one hand contour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FingerEstimate {
    pub count: u32,
    /// Points believed to be (near) extended fingertips, without duplicates.
    pub fingertips: Vec<Point<i32>>,
    /// Convex hull of the analyzed contour, empty when it was rejected.
    pub hull: Vec<Point<i32>>,
}

/// Strategy interface for finger counting heuristics.
///
/// Implementations are deterministic and never fail: too few points or
/// degenerate angles yield a zero estimate.
pub trait FingerCounter {
    fn name(&self) -> &'static str;

    fn count(&self, contour: &Contour) -> FingerEstimate;
}

/// Create the counter selected in the configuration
pub fn create_counter(config: &FingerConfig) -> Box<dyn FingerCounter + Send> {
    match config.method {
        CountingMethod::Defects => Box::new(DefectCounter::new(config)),
        CountingMethod::Angles => Box::new(AngleCounter::new(config)),
    }
}

/// Counts the sharp, deep valleys between fingers.
///
/// N qualifying valleys mean N + 1 fingers. A single raised finger has no
/// neighbour to form a valley with, so it reads as 0 unless the
/// compactness fallback is enabled. That fallback fires on any elongated
/// silhouette (a forearm entering the frame, a sideways fist) and has not
/// been measured against labelled footage; treat a count of 1 from it as low
/// confidence.
pub struct DefectCounter {
    min_points: usize,
    min_depth: f64,
    max_angle_deg: f64,
    fallback_compactness: Option<f64>,
}

impl DefectCounter {
    pub fn new(config: &FingerConfig) -> Self {
        Self {
            min_points: config.min_contour_points,
            min_depth: config.min_defect_depth,
            max_angle_deg: config.max_valley_angle_deg,
            fallback_compactness: config
                .single_finger_fallback
                .then_some(config.fallback_compactness),
        }
    }

    fn single_finger(&self, contour: &Contour, hull: &[Point<i32>]) -> Option<Point<i32>> {
        let threshold = self.fallback_compactness?;
        let area = contour.area();
        if area <= 0.0 {
            return None;
        }
        let perimeter = contour.perimeter();
        let compactness = perimeter * perimeter / (4.0 * PI * area);
        tracing::trace!("Single-finger fallback: compactness {:.2}", compactness);
        if compactness <= threshold {
            return None;
        }
        // Tip guess: the hull vertex farthest from the center of mass.
        let center = contour.centroid()?;
        hull.iter().copied().max_by(|a, b| {
            let da = (a.x as f64 - center.x).hypot(a.y as f64 - center.y);
            let db = (b.x as f64 - center.x).hypot(b.y as f64 - center.y);
            da.total_cmp(&db)
        })
    }
}

impl FingerCounter for DefectCounter {
    fn name(&self) -> &'static str {
        "defects"
    }

    fn count(&self, contour: &Contour) -> FingerEstimate {
        let _span = tracing::debug_span!("count_fingers", method = "defects").entered();

        if contour.len() < self.min_points {
            tracing::trace!("Contour too coarse: {} points", contour.len());
            return FingerEstimate::default();
        }

        let points = contour.points();
        let hull_indices = convex_hull_indices(points);
        let hull: Vec<Point<i32>> = hull_indices.iter().map(|&i| points[i]).collect();

        let mut valleys = 0u32;
        let mut fingertips = Vec::new();
        for defect in convexity_defects(points, &hull_indices) {
            if defect.depth <= self.min_depth {
                continue;
            }
            let Some(angle) = defect.angle_deg() else {
                continue;
            };
            if angle < self.max_angle_deg {
                valleys += 1;
                push_unique(&mut fingertips, defect.start);
                push_unique(&mut fingertips, defect.end);
            }
        }

        if valleys > 0 {
            return FingerEstimate {
                count: valleys + 1,
                fingertips,
                hull,
            };
        }

        match self.single_finger(contour, &hull) {
            Some(tip) => FingerEstimate {
                count: 1,
                fingertips: vec![tip],
                hull,
            },
            None => FingerEstimate {
                count: 0,
                fingertips,
                hull,
            },
        }
    }
}

/// Counts sharp spikes along the convex hull.
///
/// A hull vertex is a fingertip when its interior angle is below the tip
/// threshold. Optionally the next vertex must be nearly straight and the
/// tip's two neighbours must be close together, which separates a narrow
/// finger from a blunt hull corner.
pub struct AngleCounter {
    min_points: usize,
    tip_angle_max_deg: f64,
    straight_tolerance_deg: Option<f64>,
    max_span_px: Option<f64>,
}

const MIN_HULL_POINTS: usize = 5;

impl AngleCounter {
    pub fn new(config: &FingerConfig) -> Self {
        Self {
            min_points: config.min_contour_points,
            tip_angle_max_deg: config.tip_angle_max_deg,
            straight_tolerance_deg: config.straight_tolerance_deg,
            max_span_px: config.max_span_px,
        }
    }

    fn is_tip(&self, window: [Point<i32>; 4]) -> bool {
        let [prev, cur, next, after] = window;
        let Some(angle) = angle_at(cur, prev, next) else {
            return false;
        };
        if angle >= self.tip_angle_max_deg {
            return false;
        }
        if let Some(tolerance) = self.straight_tolerance_deg {
            match angle_at(next, cur, after) {
                Some(follow) if (follow - 180.0).abs() <= tolerance => {}
                _ => return false,
            }
        }
        if let Some(max_span) = self.max_span_px {
            if distance(prev, next) >= max_span {
                return false;
            }
        }
        true
    }
}

impl FingerCounter for AngleCounter {
    fn name(&self) -> &'static str {
        "angles"
    }

    fn count(&self, contour: &Contour) -> FingerEstimate {
        let _span = tracing::debug_span!("count_fingers", method = "angles").entered();

        if contour.len() < self.min_points {
            return FingerEstimate::default();
        }

        let points = contour.points();
        let hull: Vec<Point<i32>> = convex_hull_indices(points).iter().map(|&i| points[i]).collect();
        if hull.len() < MIN_HULL_POINTS {
            return FingerEstimate {
                hull,
                ..FingerEstimate::default()
            };
        }

        let n = hull.len();
        let fingertips: Vec<Point<i32>> = (0..n)
            .filter(|&i| {
                self.is_tip([
                    hull[(i + n - 1) % n],
                    hull[i],
                    hull[(i + 1) % n],
                    hull[(i + 2) % n],
                ])
            })
            .map(|i| hull[i])
            .collect();

        FingerEstimate {
            count: fingertips.len() as u32,
            fingertips,
            hull,
        }
    }
}

fn push_unique(points: &mut Vec<Point<i32>>, point: Point<i32>) {
    if !points.contains(&point) {
        points.push(point);
    }
}
