use crate::{shape::Point, Float};

/// Type alias to the underlying type for PointId.
/// PointId compare is in hot path, e.g. triangle neighbor check, edge
/// index lookup, so the size matters.
type NumType = u32;

/// new type for point id, the index in the caller's input sequence
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PointId(pub(crate) NumType);

impl PointId {
    /// Get the inner value as usize
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Get the inner value as u32
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn from_index(index: usize) -> Self {
        Self(index as NumType)
    }

    /// helper used in the crate when the id is known to be valid
    pub(crate) fn get(&self, points: &Points) -> Point {
        points.get(*self)
    }
}

#[derive(Clone, Default)]
pub struct PointsBuilder {
    points: Vec<Point>,
}

impl PointsBuilder {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            points: Vec::with_capacity(cap),
        }
    }

    /// Add a point, returning the id it will have in the store.
    pub fn add_point(&mut self, point: Point) -> PointId {
        let point_id = PointId(self.points.len() as NumType);
        self.points.push(point);
        point_id
    }

    pub fn add_points(&mut self, points: impl IntoIterator<Item = Point>) {
        self.points.extend(points);
    }

    pub fn build(self) -> Points {
        Points::new(self.points)
    }
}

/// Point store. Caller points keep their input order; the three synthetic
/// super-triangle vertices are appended after them so output indices stay
/// stable across the whole operation.
#[derive(Clone)]
pub struct Points {
    points: Vec<Point>,
    real_len: usize,
    min: Point,
    max: Point,
}

impl Points {
    pub fn new(mut points: Vec<Point>) -> Self {
        let real_len = points.len();

        let mut xmin = Float::MAX;
        let mut xmax = Float::MIN;
        let mut ymin = Float::MAX;
        let mut ymax = Float::MIN;
        for p in &points {
            xmin = xmin.min(p.x);
            xmax = xmax.max(p.x);
            ymin = ymin.min(p.y);
            ymax = ymax.max(p.y);
        }
        if points.is_empty() {
            xmin = 0.;
            xmax = 0.;
            ymin = 0.;
            ymax = 0.;
        }

        // The super triangle has to enclose every input point with room to
        // spare, so that all insertions land strictly inside it. The exact
        // predicates keep the far-out coordinates consistent.
        let cx = (xmin + xmax) / 2.;
        let cy = (ymin + ymax) / 2.;
        let r = (xmax - xmin).max(ymax - ymin).max(1.);

        points.push(Point::new(cx - 3. * r, cy - r));
        points.push(Point::new(cx + 3. * r, cy - r));
        points.push(Point::new(cx, cy + 3. * r));

        Self {
            points,
            real_len,
            min: Point::new(xmin, ymin),
            max: Point::new(xmax, ymax),
        }
    }

    /// number of points including the synthetic ones
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// number of caller points
    pub fn real_len(&self) -> usize {
        self.real_len
    }

    pub fn get(&self, point_id: PointId) -> Point {
        self.points[point_id.as_usize()]
    }

    pub fn is_synthetic(&self, point_id: PointId) -> bool {
        point_id.as_usize() >= self.real_len
    }

    /// ids of the three super-triangle vertices, in counter-clockwise order
    pub fn super_vertices(&self) -> [PointId; 3] {
        [
            PointId(self.real_len as NumType),
            PointId(self.real_len as NumType + 1),
            PointId(self.real_len as NumType + 2),
        ]
    }

    pub fn bbox_center(&self) -> Point {
        Point::new((self.min.x + self.max.x) / 2., (self.min.y + self.max.y) / 2.)
    }

    /// caller points, without the synthetic ones
    pub fn real_points(&self) -> &[Point] {
        &self.points[..self.real_len]
    }

    /// iter caller points in insertion order
    pub fn iter_real(&self) -> impl Iterator<Item = (PointId, Point)> + '_ {
        self.points[..self.real_len]
            .iter()
            .enumerate()
            .map(|(idx, p)| (PointId(idx as NumType), *p))
    }
}
