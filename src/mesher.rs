use crate::points::{PointId, Points, PointsBuilder};
use crate::shape::{Edge, Point};
use crate::triangles::{TriangleId, TriangleStore};
use crate::triangulation::{Triangulation, TriangulationConfig};
use crate::{Float, TriError, Triangle};

/// Observer for the meshing pipeline, useful for visual debugging when
/// things go wrong and for collecting statistics in tests.
#[allow(unused_variables)]
pub trait Observer {
    /// A vertex was inserted (or merged onto an existing one).
    fn vertex_event(&mut self, point_id: PointId, triangulation: &Triangulation) {}

    /// A constraint edge was embedded.
    fn constraint_event(&mut self, edge: Edge, triangulation: &Triangulation) {}

    /// Exterior and hole triangles were erased.
    fn erase_event(&mut self, erased: usize, triangulation: &Triangulation) {}

    /// The mesh is final.
    fn finalized(&mut self, triangulation: &Triangulation) {}
}

/// Default dummy observer, blank impl, so all calls should be optimized
/// out by the compiler.
impl Observer for () {}

/// Mesher builder.
///
/// # Example
/// ```rust
///    use zonetri::{MesherBuilder, Point};
///
///    let mesher = MesherBuilder::new(vec![
///        Point::new(0., 0.),
///        Point::new(10., 0.),
///        Point::new(10., 10.),
///        Point::new(0., 10.),
///    ])
///    .add_steiner_point(Point::new(2., 2.))
///    .add_hole(vec![
///        Point::new(4., 4.),
///        Point::new(6., 4.),
///        Point::new(6., 6.),
///        Point::new(4., 6.),
///    ])
///    .build();
///    let mesh = mesher.triangulate().unwrap();
///    assert!(mesh.triangle_count() > 0);
/// ```
#[derive(Clone)]
pub struct MesherBuilder {
    points_builder: PointsBuilder,
    edges: Vec<Edge>,
    hole_seeds: Vec<Point>,
    config: TriangulationConfig,
}

impl MesherBuilder {
    /// Create a new builder from the outer boundary polyline. The
    /// polyline is closed automatically; there should be exactly one
    /// outer boundary, holes and steiner points are added on top.
    pub fn new(outline: Vec<Point>) -> Self {
        let mut builder = Self {
            points_builder: PointsBuilder::with_capacity(outline.len()),
            edges: vec![],
            hole_seeds: vec![],
            config: TriangulationConfig::default(),
        };
        builder.push_polyline(outline);
        builder
    }

    fn push_polyline(&mut self, polyline: Vec<Point>) {
        let ids: Vec<PointId> = polyline
            .into_iter()
            .map(|p| self.points_builder.add_point(p))
            .collect();
        if ids.len() < 2 {
            return;
        }
        for i in 0..ids.len() {
            self.edges.push(Edge::new(ids[i], ids[(i + 1) % ids.len()]));
        }
    }

    /// Add a hole bounded by `polyline` (closed automatically). The erase
    /// seed is derived as the vertex average, which assumes the hole is
    /// star shaped around it; use [`Self::add_hole_with_seed`] otherwise.
    pub fn add_hole(mut self, polyline: Vec<Point>) -> Self {
        let seed = vertex_average(&polyline);
        self.push_polyline(polyline);
        if let Some(seed) = seed {
            self.hole_seeds.push(seed);
        }
        self
    }

    /// Add a hole with an explicit interior seed point.
    pub fn add_hole_with_seed(mut self, polyline: Vec<Point>, seed: Point) -> Self {
        self.push_polyline(polyline);
        self.hole_seeds.push(seed);
        self
    }

    /// Add holes
    pub fn add_holes(mut self, holes: impl IntoIterator<Item = Vec<Point>>) -> Self {
        for polyline in holes.into_iter() {
            self = self.add_hole(polyline);
        }
        self
    }

    /// Add a single sparse `Point` with no edges attached. A steiner
    /// point outside the outline has no effect on the final result.
    pub fn add_steiner_point(mut self, point: Point) -> Self {
        self.points_builder.add_point(point);
        self
    }

    /// Add multiple steiner points, batch version of
    /// [`Self::add_steiner_point`].
    pub fn add_steiner_points(mut self, points: impl IntoIterator<Item = Point>) -> Self {
        self.points_builder.add_points(points);
        self
    }

    pub fn with_config(mut self, config: TriangulationConfig) -> Self {
        self.config = config;
        self
    }

    /// build the mesher
    pub fn build(self) -> Mesher {
        Mesher {
            points: self.points_builder.build(),
            edges: self.edges,
            hole_seeds: self.hole_seeds,
            config: self.config,
        }
    }
}

/// vertex average of a polyline, used as the default hole seed
fn vertex_average(polyline: &[Point]) -> Option<Point> {
    if polyline.is_empty() {
        return None;
    }
    let n = polyline.len() as Float;
    Some(Point::new(
        polyline.iter().map(|p| p.x).sum::<Float>() / n,
        polyline.iter().map(|p| p.y).sum::<Float>() / n,
    ))
}

/// Main interface, built by [`MesherBuilder::build`]. Consumes one
/// polygon problem and produces the interior [`Mesh`].
#[derive(Clone)]
pub struct Mesher {
    points: Points,
    edges: Vec<Edge>,
    hole_seeds: Vec<Point>,
    config: TriangulationConfig,
}

impl Mesher {
    /// Run the triangulation with a dummy observer.
    pub fn triangulate(self) -> Result<Mesh, TriError> {
        self.triangulate_with_observer(&mut ())
    }

    /// Run the triangulation: insert every vertex, embed every constraint
    /// edge, erase exterior and holes.
    pub fn triangulate_with_observer(
        self,
        observer: &mut impl Observer,
    ) -> Result<Mesh, TriError> {
        if self.points.real_len() < 3 {
            return Err(TriError::TooFewPoints(self.points.real_len()));
        }
        for (id, p) in self.points.iter_real() {
            if !p.is_finite() {
                return Err(TriError::NonFiniteCoordinate {
                    index: id.as_usize(),
                });
            }
        }

        let mut triangulation = Triangulation::from_points(self.points, self.config);

        for index in 0..triangulation.points.real_len() {
            let id = PointId::from_index(index);
            triangulation.insert_vertex(id)?;
            observer.vertex_event(id, &triangulation);
            debug_assert!(triangulation.mesh_is_consistent());
        }

        for edge in &self.edges {
            triangulation.insert_constraint(edge.p, edge.q)?;
            let (a, b) = (triangulation.resolve(edge.p), triangulation.resolve(edge.q));
            if a != b {
                observer.constraint_event(Edge::new(a, b), &triangulation);
            }
        }
        debug_assert!(triangulation.mesh_is_consistent());

        let erased = triangulation.erase_exterior(&self.hole_seeds)?;
        observer.erase_event(erased, &triangulation);
        observer.finalized(&triangulation);

        Ok(Mesh::from_triangulation(triangulation))
    }
}

/// The result of a triangulation: the interior triangles, referencing the
/// caller's point indices.
pub struct Mesh {
    points: Points,
    triangles: TriangleStore,
    result: Vec<TriangleId>,
    constrained: Vec<Edge>,

    /// iterator next cursor
    next: usize,
}

impl Mesh {
    pub(crate) fn from_triangulation(triangulation: Triangulation) -> Self {
        let Triangulation {
            points, triangles, ..
        } = triangulation;

        let result: Vec<TriangleId> = triangles.iter().map(|(tid, _)| tid).collect();

        let mut constrained: Vec<Edge> = vec![];
        for (_, tri) in triangles.iter() {
            for i in 0..3 {
                if tri.is_constrained(i) {
                    let (u, v) = tri.edge(i);
                    constrained.push(Edge::new(u, v));
                }
            }
        }
        constrained.sort();
        constrained.dedup();

        Self {
            points,
            triangles,
            result,
            constrained,
            next: 0,
        }
    }

    /// number of triangles in the final mesh
    pub fn triangle_count(&self) -> usize {
        self.result.len()
    }

    /// The caller's points, in input order. Not every point ends up in a
    /// triangle: merged duplicates and points outside the outline remain
    /// here untouched so indices stay stable.
    pub fn points(&self) -> &[Point] {
        self.points.real_points()
    }

    /// Flat index list, three entries per triangle, referencing the input
    /// point order.
    pub fn triangle_list_indices(&self) -> Vec<u32> {
        let mut indices = Vec::with_capacity(self.result.len() * 3);
        for tid in self.result.iter() {
            let tri = tid.get(&self.triangles);
            indices.extend_from_slice(&[
                tri.points[0].as_u32(),
                tri.points[1].as_u32(),
                tri.points[2].as_u32(),
            ]);
        }
        indices
    }

    /// Sum of the (positive) triangle areas.
    pub fn area(&self) -> Float {
        let mut total = 0.;
        for tid in self.result.iter() {
            let tri = tid.get(&self.triangles);
            let [a, b, c] = tri.points.map(|p| self.points.get(p));
            total += (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        }
        total / 2.
    }

    /// constraint edges surviving in the mesh, sorted
    pub fn constrained_edges(&self) -> &[Edge] {
        &self.constrained
    }
}

impl Iterator for Mesh {
    type Item = Triangle;

    fn next(&mut self) -> Option<Self::Item> {
        let tid = self.result.get(self.next)?;
        self.next += 1;

        let tri = tid.get(&self.triangles);
        Some(Triangle {
            points: tri.points.map(|p| self.points.get(p)),
            indices: tri.points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicates::{in_circle, orient_2d, Orientation};

    fn square() -> Vec<Point> {
        vec![
            Point::new(0., 0.),
            Point::new(5., 0.),
            Point::new(5., 4.),
            Point::new(0., 4.),
        ]
    }

    fn pid(i: usize) -> PointId {
        PointId::from_index(i)
    }

    #[test]
    fn test_square_yields_two_triangles() {
        let mesh = MesherBuilder::new(square()).build().triangulate().unwrap();

        assert_eq!(mesh.triangle_count(), 2);
        assert!((mesh.area() - 20.).abs() < 1e-9);

        // all four boundary edges are constrained edges of the mesh
        for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
            assert!(
                mesh.constrained_edges().contains(&Edge::new(pid(a), pid(b))),
                "boundary edge {a}-{b} missing"
            );
        }

        let indices = mesh.triangle_list_indices();
        assert_eq!(indices.len(), 6);
        assert!(indices.iter().all(|&i| i < 4));
    }

    #[test]
    fn test_square_with_hole() {
        let mesh = MesherBuilder::new(square())
            .add_hole(vec![
                Point::new(1., 1.),
                Point::new(4., 1.),
                Point::new(4., 3.),
                Point::new(1., 3.),
            ])
            .build()
            .triangulate()
            .unwrap();

        // 20 minus the 3x2 hole
        assert!((mesh.area() - 14.).abs() < 1e-9);

        // no triangle lies inside the hole
        for triangle in mesh {
            let cx = (triangle.points[0].x + triangle.points[1].x + triangle.points[2].x) / 3.;
            let cy = (triangle.points[0].y + triangle.points[1].y + triangle.points[2].y) / 3.;
            let inside_hole = cx > 1. && cx < 4. && cy > 1. && cy < 3.;
            assert!(!inside_hole, "triangle centroid ({cx}, {cy}) in hole");
        }
    }

    #[test]
    fn test_steiner_point_fans_out() {
        let mesh = MesherBuilder::new(square())
            .add_steiner_point(Point::new(2.5, 2.))
            .build()
            .triangulate()
            .unwrap();

        assert_eq!(mesh.triangle_count(), 4);
        assert!((mesh.area() - 20.).abs() < 1e-9);
    }

    #[test]
    fn test_l_shape_area_conserved() {
        // non-convex outline: 4x4 square minus the 2x2 upper right corner
        let mesh = MesherBuilder::new(vec![
            Point::new(0., 0.),
            Point::new(4., 0.),
            Point::new(4., 2.),
            Point::new(2., 2.),
            Point::new(2., 4.),
            Point::new(0., 4.),
        ])
        .build()
        .triangulate()
        .unwrap();

        assert!((mesh.area() - 12.).abs() < 1e-9);
        // every output triangle is counter-clockwise
        for triangle in mesh {
            let [a, b, c] = triangle.points;
            assert_eq!(orient_2d(a, b, c), Orientation::CCW);
        }
    }

    #[test]
    fn test_delaunay_property_with_steiner_points() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(99);
        let steiner: Vec<Point> = (0..40)
            .map(|_| {
                Point::new(rng.gen_range(0.5..4.5), rng.gen_range(0.5..3.5))
            })
            .collect();

        let mesh = MesherBuilder::new(square())
            .add_steiner_points(steiner)
            .build()
            .triangulate()
            .unwrap();

        assert!((mesh.area() - 20.).abs() < 1e-9);

        // all vertices sit inside the convex outline, so visibility is
        // unobstructed: no vertex may lie strictly inside any
        // circumcircle
        let points = mesh.points().to_vec();
        let indices = mesh.triangle_list_indices();
        for tri in indices.chunks(3) {
            let (a, b, c) = (
                points[tri[0] as usize],
                points[tri[1] as usize],
                points[tri[2] as usize],
            );
            for (i, p) in points.iter().enumerate() {
                if tri.contains(&(i as u32)) {
                    continue;
                }
                assert!(
                    !in_circle(a, b, c, *p),
                    "vertex {i} violates the empty circumcircle of {tri:?}"
                );
            }
        }
    }

    #[test]
    fn test_coverage_no_overlap() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};

        let mesh = MesherBuilder::new(square())
            .add_hole(vec![
                Point::new(1., 1.),
                Point::new(4., 1.),
                Point::new(4., 3.),
                Point::new(1., 3.),
            ])
            .build()
            .triangulate()
            .unwrap();

        let points = mesh.points().to_vec();
        let indices = mesh.triangle_list_indices();
        let mut rng = SmallRng::seed_from_u64(3);

        let mut checked = 0;
        'samples: for _ in 0..300 {
            let sample = Point::new(rng.gen_range(0.0..5.0), rng.gen_range(0.0..4.0));
            let mut containing = 0;
            for tri in indices.chunks(3) {
                let (a, b, c) = (
                    points[tri[0] as usize],
                    points[tri[1] as usize],
                    points[tri[2] as usize],
                );
                let o = [
                    orient_2d(a, b, sample),
                    orient_2d(b, c, sample),
                    orient_2d(c, a, sample),
                ];
                if o.iter().any(|o| o.is_collinear()) {
                    // on an edge of some triangle, ambiguous sample
                    continue 'samples;
                }
                if o.iter().all(|o| o.is_ccw()) {
                    containing += 1;
                }
            }
            let in_hole = sample.x > 1. && sample.x < 4. && sample.y > 1. && sample.y < 3.;
            assert_eq!(containing, usize::from(!in_hole), "at {sample:?}");
            checked += 1;
        }
        assert!(checked > 200);
    }

    #[test]
    fn test_idempotent_retriangulation() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(5);
        let steiner: Vec<Point> = (0..30)
            .map(|_| Point::new(rng.gen_range(0.5..4.5), rng.gen_range(0.5..3.5)))
            .collect();

        let build = || {
            MesherBuilder::new(square())
                .add_steiner_points(steiner.clone())
                .build()
                .triangulate()
                .unwrap()
        };
        let first = build();
        let second = build();

        assert!((first.area() - second.area()).abs() < 1e-9);
        assert_eq!(first.constrained_edges(), second.constrained_edges());
        assert_eq!(first.triangle_count(), second.triangle_count());
    }

    #[test]
    fn test_duplicate_outline_point_merges() {
        let mesh = MesherBuilder::new(vec![
            Point::new(0., 0.),
            Point::new(5., 0.),
            Point::new(5., 4.),
            Point::new(0., 4.),
        ])
        .add_steiner_point(Point::new(5., 4.)) // duplicate of index 2
        .build()
        .triangulate()
        .unwrap();

        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.points().len(), 5);
        // output indices never reference the merged duplicate
        assert!(mesh.triangle_list_indices().iter().all(|&i| i != 4));
    }

    #[test]
    fn test_observer_sees_all_phases() {
        #[derive(Default)]
        struct Counting {
            vertices: usize,
            constraints: usize,
            erased: usize,
            finalized: usize,
        }

        impl Observer for Counting {
            fn vertex_event(&mut self, _point_id: PointId, _t: &Triangulation) {
                self.vertices += 1;
            }
            fn constraint_event(&mut self, _edge: Edge, _t: &Triangulation) {
                self.constraints += 1;
            }
            fn erase_event(&mut self, erased: usize, _t: &Triangulation) {
                self.erased += erased;
            }
            fn finalized(&mut self, _t: &Triangulation) {
                self.finalized += 1;
            }
        }

        let mut counting = Counting::default();
        let mesh = MesherBuilder::new(square())
            .build()
            .triangulate_with_observer(&mut counting)
            .unwrap();

        assert_eq!(counting.vertices, 4);
        assert_eq!(counting.constraints, 4);
        assert_eq!(counting.finalized, 1);
        // everything but the two interior triangles was erased
        assert_eq!(counting.erased + mesh.triangle_count(), 9);
    }

    #[test]
    fn test_too_few_points_rejected() {
        let result = MesherBuilder::new(vec![Point::new(0., 0.), Point::new(1., 0.)])
            .build()
            .triangulate();
        assert!(matches!(result, Err(TriError::TooFewPoints(2))));
    }
}
