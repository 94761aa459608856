use super::types::distance;
use imageproc::point::Point;

/// A concavity between two consecutive hull vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvexityDefect {
    pub start: Point<i32>,
    pub end: Point<i32>,
    /// Contour point between `start` and `end` farthest from the hull edge.
    pub far: Point<i32>,
    /// Perpendicular distance from `far` to the hull edge, in pixels.
    pub depth: f64,
}

impl ConvexityDefect {
    /// Angle at `far` of the triangle start–far–end.
    pub fn angle_deg(&self) -> Option<f64> {
        angle_at(self.far, self.start, self.end)
    }
}

/// Angle in degrees at `vertex` between the rays to `a` and `b`, by the law
/// of cosines. `None` when either ray has zero length.
pub fn angle_at(vertex: Point<i32>, a: Point<i32>, b: Point<i32>) -> Option<f64> {
    let leg_a2 = squared_distance(vertex, a);
    let leg_b2 = squared_distance(vertex, b);
    if leg_a2 == 0 || leg_b2 == 0 {
        return None;
    }
    let opposite2 = squared_distance(a, b);
    let cos = (leg_a2 + leg_b2 - opposite2) as f64 / (2.0 * (leg_a2 as f64).sqrt() * (leg_b2 as f64).sqrt());
    Some(cos.clamp(-1.0, 1.0).acos().to_degrees())
}

fn squared_distance(a: Point<i32>, b: Point<i32>) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

fn turn(o: Point<i32>, a: Point<i32>, b: Point<i32>) -> i64 {
    (a.x - o.x) as i64 * (b.y - o.y) as i64 - (a.y - o.y) as i64 * (b.x - o.x) as i64
}

/// Indices of the contour points on its convex hull, in ascending contour
/// order. Collinear and repeated points are left out.
///
/// Fewer than three indices means the contour has no area to speak of.
pub fn convex_hull_indices(points: &[Point<i32>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by_key(|&i| (points[i].x, points[i].y, i));
    order.dedup_by_key(|i| (points[*i].x, points[*i].y));

    if order.len() < 3 {
        return order;
    }

    // Andrew's monotone chain.
    let reversed: Vec<usize> = order.iter().rev().copied().collect();
    let mut hull: Vec<usize> = Vec::with_capacity(order.len() * 2);
    for pass in [&order[..], &reversed[..]] {
        let floor = hull.len();
        for &i in pass {
            while hull.len() >= floor + 2
                && turn(points[hull[hull.len() - 2]], points[hull[hull.len() - 1]], points[i]) <= 0
            {
                hull.pop();
            }
            hull.push(i);
        }
        hull.pop();
    }

    hull.sort_unstable();
    hull
}

/// Defects between consecutive hull vertices, walking the contour from each
/// hull index to the next (wrapping at the end).
///
/// Spans with no intermediate points, or whose intermediate points all lie
/// on the hull edge, produce no defect.
pub fn convexity_defects(points: &[Point<i32>], hull: &[usize]) -> Vec<ConvexityDefect> {
    if hull.len() < 3 {
        return Vec::new();
    }

    let n = points.len();
    let mut defects = Vec::new();
    for (k, &start_idx) in hull.iter().enumerate() {
        let end_idx = hull[(k + 1) % hull.len()];
        let start = points[start_idx];
        let end = points[end_idx];
        let edge = distance(start, end);

        let mut deepest: Option<(f64, usize)> = None;
        let mut i = (start_idx + 1) % n;
        while i != end_idx {
            let p = points[i];
            let depth = if edge > 0.0 {
                turn(start, end, p).abs() as f64 / edge
            } else {
                distance(start, p)
            };
            if depth > deepest.map_or(0.0, |(d, _)| d) {
                deepest = Some((depth, i));
            }
            i = (i + 1) % n;
        }

        if let Some((depth, far_idx)) = deepest {
            defects.push(ConvexityDefect {
                start,
                end,
                far: points[far_idx],
                depth,
            });
        }
    }
    defects
}
