use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;

/// Closed boundary of a foreground region, in traversal order.
/// The last point connects back to the first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Contour {
    points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn from_vertices(vertices: &[(i32, i32)]) -> Self {
        Self::new(vertices.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shoelace area, positive for one winding and negative for the other.
    pub fn signed_area(&self) -> f64 {
        self.edges().map(|(a, b)| cross(a, b) as f64).sum::<f64>() / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        arc_length(&self.points, true)
    }

    /// Center of mass of the enclosed region from the polygon's area moments.
    ///
    /// `None` when the zeroth moment is exactly zero: lines, single points
    /// and self-cancelling outlines have no meaningful center.
    pub fn centroid(&self) -> Option<Point<f64>> {
        let mut m00 = 0.0;
        let mut m10 = 0.0;
        let mut m01 = 0.0;
        for (a, b) in self.edges() {
            let c = cross(a, b) as f64;
            m00 += c;
            m10 += (a.x + b.x) as f64 * c;
            m01 += (a.y + b.y) as f64 * c;
        }
        if m00 == 0.0 {
            return None;
        }
        // m00 carries a factor 1/2 and the first moments 1/6.
        Some(Point::new(m10 / (3.0 * m00), m01 / (3.0 * m00)))
    }

    /// Douglas-Peucker simplification with a tolerance of
    /// `fraction * perimeter`. A non-positive fraction returns the contour
    /// unchanged, as does a simplification that collapses below a triangle.
    pub fn approximate(&self, fraction: f64) -> Contour {
        if fraction <= 0.0 || self.points.len() < 3 {
            return self.clone();
        }
        let epsilon = fraction * self.perimeter();
        if epsilon <= 0.0 {
            return self.clone();
        }
        // Split the loop at the point farthest from the start and simplify
        // both halves as open chains, so every real corner can survive.
        let points = &self.points;
        let start = points[0];
        let split = (1..points.len())
            .max_by(|&a, &b| distance(start, points[a]).total_cmp(&distance(start, points[b])))
            .unwrap_or(1);
        let mut closing = points[split..].to_vec();
        closing.push(start);

        let mut simplified = simplify_chain(&points[..=split], epsilon);
        let back = simplify_chain(&closing, epsilon);
        simplified.extend_from_slice(&back[1..back.len() - 1]);
        if simplified.len() < 3 {
            return self.clone();
        }
        Contour::new(simplified)
    }

    fn edges(&self) -> impl Iterator<Item = (Point<i32>, Point<i32>)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }
}

/// Douglas-Peucker on an open chain; both endpoints are kept.
fn simplify_chain(chain: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if chain.len() < 3 {
        return chain.to_vec();
    }
    approximate_polygon_dp(chain, epsilon, false)
}

fn cross(a: Point<i32>, b: Point<i32>) -> i64 {
    a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
}

pub fn distance(a: Point<i32>, b: Point<i32>) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    dx.hypot(dy)
}
