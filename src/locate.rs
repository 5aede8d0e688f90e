use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::points::{PointId, Points};
use crate::predicates::{orient_2d, Orientation};
use crate::shape::Point;
use crate::triangles::{TriangleId, TriangleStore};
use crate::{Float, TriError};

/// How an insertion picks the triangle its locate walk starts from. The
/// choice only affects performance: the walk terminates at the true
/// containing triangle from any live start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartStrategy {
    /// start from a uniformly random previously inserted vertex
    RandomVertex,
    /// start from the inserted vertex closest to the bounding box center
    BboxCenter,
    /// Start from the most recently inserted vertex. Polygon outlines
    /// arrive in traversal order, so consecutive points are close; this
    /// is the default.
    #[default]
    LastInserted,
}

/// Where a query point landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateResult {
    /// strictly inside the triangle
    Inside(TriangleId),
    /// on the interior of edge `1` of triangle `0`
    OnEdge(TriangleId, usize),
    /// coincides with an existing vertex (within the merge tolerance)
    OnVertex(PointId),
    /// outside the triangulated region
    Outside,
}

/// Bookkeeping behind [`StartStrategy`]: remembers the inserted vertices
/// and hands out the start triangle for the next walk.
pub(crate) struct StartFinder {
    strategy: StartStrategy,
    rng: SmallRng,
    inserted: Vec<PointId>,
    center: Point,
    center_pick: Option<(PointId, Float)>,
    pub(crate) last_triangle: TriangleId,
}

impl StartFinder {
    pub fn new(strategy: StartStrategy, center: Point) -> Self {
        Self {
            strategy,
            // fixed seed: repeated runs on the same input walk identically
            rng: SmallRng::seed_from_u64(0x7e0_d317),
            inserted: vec![],
            center,
            center_pick: None,
            last_triangle: TriangleId::INVALID,
        }
    }

    pub fn vertex_inserted(&mut self, id: PointId, at: Point, triangle: TriangleId) {
        self.last_triangle = triangle;
        self.inserted.push(id);

        let d2 = at.distance_squared(&self.center);
        match self.center_pick {
            Some((_, best)) if best <= d2 => {}
            _ => self.center_pick = Some((id, d2)),
        }
    }

    /// The triangle to start the next walk from; INVALID when nothing was
    /// inserted yet (the walk then falls back to the first live triangle).
    pub fn start_hint(&mut self, vertex_tri: &[TriangleId]) -> TriangleId {
        match self.strategy {
            StartStrategy::LastInserted => self.last_triangle,
            StartStrategy::RandomVertex => {
                if self.inserted.is_empty() {
                    TriangleId::INVALID
                } else {
                    let pick = self.inserted[self.rng.gen_range(0..self.inserted.len())];
                    vertex_tri[pick.as_usize()]
                }
            }
            StartStrategy::BboxCenter => match self.center_pick {
                Some((pick, _)) => vertex_tri[pick.as_usize()],
                None => TriangleId::INVALID,
            },
        }
    }
}

/// Walk from `start` towards `target`, crossing one edge per step, guided
/// by orientation tests. Returns where the point landed, or an
/// iteration-cap error when the mesh is corrupted.
pub(crate) fn locate_walk(
    store: &TriangleStore,
    points: &Points,
    start: TriangleId,
    target: Point,
    merge_tolerance: Float,
    cap: usize,
) -> Result<LocateResult, TriError> {
    let mut current = match store.get(start) {
        Some(_) => start,
        None => match store.iter().next() {
            Some((id, _)) => id,
            None => return Ok(LocateResult::Outside),
        },
    };
    let mut came_from = TriangleId::INVALID;
    let tol2 = merge_tolerance * merge_tolerance;

    for _ in 0..cap {
        let tri = *store.get_unchecked(current);

        for &pid in &tri.points {
            if pid.get(points).distance_squared(&target) <= tol2 {
                return Ok(LocateResult::OnVertex(pid));
            }
        }

        let mut exit = None;
        let mut collinear = [false; 3];
        for ei in 0..3 {
            let (u, v) = tri.edge(ei);
            match orient_2d(u.get(points), v.get(points), target) {
                Orientation::CW => {
                    // prefer an exit edge that does not backtrack
                    if exit.is_none() || tri.neighbors[ei] != came_from {
                        exit = Some(ei);
                    }
                }
                Orientation::Collinear => collinear[ei] = true,
                Orientation::CCW => {}
            }
        }

        match exit {
            Some(ei) => {
                let next = tri.neighbors[ei];
                if next.invalid() {
                    return Ok(LocateResult::Outside);
                }
                came_from = current;
                current = next;
            }
            None => {
                // inside the closed triangle; collinear edges decide how
                let on: Vec<usize> = (0..3).filter(|&i| collinear[i]).collect();
                return Ok(match on.len() {
                    0 => LocateResult::Inside(current),
                    1 => LocateResult::OnEdge(current, on[0]),
                    // two collinear edges meet at their shared vertex
                    _ => LocateResult::OnVertex(tri.points[3 - on[0] - on[1]]),
                });
            }
        }
    }

    Err(TriError::IterationCapExceeded {
        operation: "point location walk",
    })
}

/// Exhaustive point location. Used for hole seeds: the mesh is no longer
/// Delaunay after constraints are embedded, so walk termination is not
/// guaranteed there.
pub(crate) fn locate_by_scan(
    store: &TriangleStore,
    points: &Points,
    target: Point,
) -> LocateResult {
    for (tid, tri) in store.iter() {
        let mut outside = false;
        let mut collinear = [false; 3];
        for ei in 0..3 {
            let (u, v) = tri.edge(ei);
            match orient_2d(u.get(points), v.get(points), target) {
                Orientation::CW => {
                    outside = true;
                    break;
                }
                Orientation::Collinear => collinear[ei] = true,
                Orientation::CCW => {}
            }
        }
        if outside {
            continue;
        }
        let on: Vec<usize> = (0..3).filter(|&i| collinear[i]).collect();
        return match on.len() {
            0 => LocateResult::Inside(tid),
            1 => LocateResult::OnEdge(tid, on[0]),
            _ => LocateResult::OnVertex(tri.points[3 - on[0] - on[1]]),
        };
    }
    LocateResult::Outside
}
