//! Rotated-box intersection-over-union geometry.
//!
//! Boxes are `(cx, cy, w, h, angle)` with the angle in radians. The overlap
//! of two rotated rectangles is computed the classical way: collect candidate
//! intersection points (edge/edge crossings plus mutually contained
//! vertices), take their convex hull, and measure it with the shoelace
//! formula. Intermediate geometry runs in `f64` so results are deterministic
//! across platforms; callers get an `f32` back.

use smallvec::SmallVec;

/// Numerical floor below which lengths, areas, and determinants are treated
/// as zero.
const EPS: f64 = 1e-12;

/// A rotated rectangle in center/extent/angle form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedBox {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
    pub angle: f32,
}

impl RotatedBox {
    /// Reads a box from the first five entries of a detection row.
    ///
    /// Rows may carry trailing columns (e.g., a class label in multi-label
    /// layouts); those are ignored here.
    pub fn from_row(row: &[f32]) -> Self {
        RotatedBox {
            cx: row[0],
            cy: row[1],
            w: row[2],
            h: row[3],
            angle: row[4],
        }
    }

    fn area(&self) -> f64 {
        f64::from(self.w) * f64::from(self.h)
    }
}

#[derive(Debug, Clone, Copy)]
struct Point {
    x: f64,
    y: f64,
}

/// Cross product of `(a - o)` and `(b - o)`.
fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Counter-clockwise corners of a rotated rectangle.
fn corners(bx: &RotatedBox) -> [Point; 4] {
    let (sin, cos) = f64::from(bx.angle).sin_cos();
    let cx = f64::from(bx.cx);
    let cy = f64::from(bx.cy);
    let dx = f64::from(bx.w) * 0.5;
    let dy = f64::from(bx.h) * 0.5;
    let rotate = |rx: f64, ry: f64| Point {
        x: cx + cos * rx - sin * ry,
        y: cy + sin * rx + cos * ry,
    };
    [
        rotate(-dx, -dy),
        rotate(dx, -dy),
        rotate(dx, dy),
        rotate(-dx, dy),
    ]
}

/// Intersection point of two closed segments, if they cross.
///
/// Parallel (including collinear) segments yield `None`; overlap endpoints
/// are still collected through the vertex-containment pass.
fn segment_intersection(p1: Point, p2: Point, q1: Point, q2: Point) -> Option<Point> {
    let d1 = Point {
        x: p2.x - p1.x,
        y: p2.y - p1.y,
    };
    let d2 = Point {
        x: q2.x - q1.x,
        y: q2.y - q1.y,
    };
    let denom = d1.x * d2.y - d1.y * d2.x;
    if denom.abs() < EPS {
        return None;
    }
    let qp = Point {
        x: q1.x - p1.x,
        y: q1.y - p1.y,
    };
    let t = (qp.x * d2.y - qp.y * d2.x) / denom;
    let u = (qp.x * d1.y - qp.y * d1.x) / denom;
    if !(-EPS..=1.0 + EPS).contains(&t) || !(-EPS..=1.0 + EPS).contains(&u) {
        return None;
    }
    Some(Point {
        x: p1.x + t * d1.x,
        y: p1.y + t * d1.y,
    })
}

/// Point-in-convex-quad test; boundary points count as contained.
fn contains(quad: &[Point; 4], p: Point) -> bool {
    for i in 0..4 {
        if cross(quad[i], quad[(i + 1) % 4], p) < -EPS {
            return false;
        }
    }
    true
}

/// Convex hull by monotone chain; collinear points are dropped.
fn convex_hull(points: &mut SmallVec<[Point; 24]>) -> SmallVec<[Point; 24]> {
    points.sort_unstable_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    let n = points.len();
    if n < 3 {
        return points.clone();
    }
    let mut hull: SmallVec<[Point; 24]> = SmallVec::new();
    for &p in points.iter() {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= EPS {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in points.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= EPS
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Area of a convex polygon given in boundary order.
fn polygon_area(poly: &[Point]) -> f64 {
    if poly.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        twice_area += a.x * b.y - a.y * b.x;
    }
    twice_area.abs() * 0.5
}

/// Intersection area of two rotated rectangles.
fn intersection_area(a: &RotatedBox, b: &RotatedBox) -> f64 {
    let ca = corners(a);
    let cb = corners(b);
    let mut pts: SmallVec<[Point; 24]> = SmallVec::new();
    for i in 0..4 {
        for j in 0..4 {
            if let Some(p) =
                segment_intersection(ca[i], ca[(i + 1) % 4], cb[j], cb[(j + 1) % 4])
            {
                pts.push(p);
            }
        }
    }
    for &p in &ca {
        if contains(&cb, p) {
            pts.push(p);
        }
    }
    for &p in &cb {
        if contains(&ca, p) {
            pts.push(p);
        }
    }
    if pts.len() < 3 {
        return 0.0;
    }
    polygon_area(&convex_hull(&mut pts))
}

/// Intersection-over-union of two rotated boxes.
///
/// Degenerate boxes (non-positive width or height) and degenerate unions
/// produce `0.0` rather than propagating a division by zero.
pub fn box_iou_rotated_pair(a: &RotatedBox, b: &RotatedBox) -> f32 {
    let area_a = a.area();
    let area_b = b.area();
    if area_a <= EPS || area_b <= EPS {
        return 0.0;
    }
    let inter = intersection_area(a, b);
    let union = area_a + area_b - inter;
    if union <= EPS {
        return 0.0;
    }
    (inter / union) as f32
}
