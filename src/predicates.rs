use crate::shape::Point;
use robust::{incircle, orient2d, Coord};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Orientation {
    /// Clock Wise
    ///
    ///  a     b
    ///             c
    ///
    CW,
    /// Counter Clock Wise
    ///             c
    ///  a     b
    CCW,
    /// Collinear
    ///  a     b    c
    Collinear,
}

impl Orientation {
    pub fn is_cw(&self) -> bool {
        matches!(self, Self::CW)
    }

    pub fn is_ccw(&self) -> bool {
        matches!(self, Self::CCW)
    }

    pub fn is_collinear(&self) -> bool {
        matches!(self, Self::Collinear)
    }
}

#[inline(always)]
fn coord(p: Point) -> Coord<f64> {
    Coord {
        x: f64::from(p.x),
        y: f64::from(p.y),
    }
}

/// Classify `c` against the directed line a -> b. Adaptive-precision, so
/// the result is exact even for nearly collinear input; an inconsistent
/// sign here would corrupt the walk and flip logic.
pub fn orient_2d(a: Point, b: Point, c: Point) -> Orientation {
    let det = orient2d(coord(a), coord(b), coord(c));
    if det > 0. {
        Orientation::CCW
    } else if det < 0. {
        Orientation::CW
    } else {
        Orientation::Collinear
    }
}

/// whether `d` lies strictly inside the circle through `a`, `b`, `c`.
/// The triangle (a, b, c) must be counter-clockwise.
pub fn in_circle(a: Point, b: Point, c: Point, d: Point) -> bool {
    incircle(coord(a), coord(b), coord(c), coord(d)) > 0.
}

/// whether segments a-b and c-d cross in a single interior point.
/// Shared endpoints and endpoint-on-segment contacts do not count.
pub fn segments_cross_properly(a: Point, b: Point, c: Point, d: Point) -> bool {
    let o1 = orient_2d(a, b, c);
    let o2 = orient_2d(a, b, d);
    let o3 = orient_2d(c, d, a);
    let o4 = orient_2d(c, d, b);

    let ab_splits = (o1.is_ccw() && o2.is_cw()) || (o1.is_cw() && o2.is_ccw());
    let cd_splits = (o3.is_ccw() && o4.is_cw()) || (o3.is_cw() && o4.is_ccw());
    ab_splits && cd_splits
}

/// whether `c` lies strictly between `a` and `b` along the segment.
/// Callers must have established collinearity already.
pub fn between_on_segment(a: Point, b: Point, c: Point) -> bool {
    if (b.x - a.x).abs() >= (b.y - a.y).abs() {
        c.x > a.x.min(b.x) && c.x < a.x.max(b.x)
    } else {
        c.y > a.y.min(b.y) && c.y < a.y.max(b.y)
    }
}
