use std::collections::HashSet;

use crate::locate::{locate_walk, LocateResult, StartFinder, StartStrategy};
use crate::points::{PointId, Points};
use crate::predicates::{in_circle, orient_2d};
use crate::shape::{Edge, EdgeAttr, InnerTriangle, Point};
use crate::triangles::{TriangleId, TriangleStore};
use crate::{Float, TriError};

/// Tuning knobs for a triangulation instance.
#[derive(Debug, Clone, Copy)]
pub struct TriangulationConfig {
    pub start_strategy: StartStrategy,
    /// Points closer than this to an existing vertex merge onto it
    /// instead of being inserted. Exact duplicates always merge.
    pub merge_tolerance: Float,
    /// safety bound for the locate walk, 0 derives one from the mesh size
    pub locate_cap: usize,
    /// safety bound for flip propagation, 0 derives one from the mesh size
    pub legalize_cap: usize,
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            start_strategy: StartStrategy::default(),
            merge_tolerance: 1e-9,
            locate_cap: 0,
            legalize_cap: 0,
        }
    }
}

/// The incremental triangulation: vertex store, triangle arena and the
/// adjacency bookkeeping needed for insertion, constraint enforcement and
/// erasure. One instance handles one polygon problem start to finish and
/// owns all of its storage, so independent instances can run on separate
/// threads without any sharing.
pub struct Triangulation {
    pub(crate) points: Points,
    pub(crate) triangles: TriangleStore,
    pub(crate) config: TriangulationConfig,
    /// one live triangle containing each vertex, INVALID until inserted
    pub(crate) vertex_tri: Vec<TriangleId>,
    /// merged duplicates resolve to their surviving vertex
    pub(crate) alias: Vec<PointId>,
    /// constraint edges currently embedded (post merge resolution)
    pub(crate) constrained: HashSet<Edge>,
    pub(crate) finder: StartFinder,
    /// reusable legalize worklist to reduce alloc overhead
    legalize_queue: Vec<(TriangleId, usize)>,
}

impl Triangulation {
    /// Create an empty triangulation over the given points. Nothing is
    /// inserted yet apart from the synthetic super triangle enclosing all
    /// of them.
    pub fn new(points: Vec<Point>, config: TriangulationConfig) -> Result<Self, TriError> {
        if points.len() < 3 {
            return Err(TriError::TooFewPoints(points.len()));
        }
        for (index, p) in points.iter().enumerate() {
            if !p.is_finite() {
                return Err(TriError::NonFiniteCoordinate { index });
            }
        }
        Ok(Self::from_points(Points::new(points), config))
    }

    pub(crate) fn from_points(points: Points, config: TriangulationConfig) -> Self {
        let mut triangles = TriangleStore::with_capacity(points.len() * 2);
        let [s0, s1, s2] = points.super_vertices();
        let super_tri = triangles.insert(InnerTriangle::new(s0, s1, s2));

        let mut vertex_tri = vec![TriangleId::INVALID; points.len()];
        vertex_tri[s0.as_usize()] = super_tri;
        vertex_tri[s1.as_usize()] = super_tri;
        vertex_tri[s2.as_usize()] = super_tri;

        let alias = (0..points.len()).map(PointId::from_index).collect();

        let mut finder = StartFinder::new(config.start_strategy, points.bbox_center());
        finder.last_triangle = super_tri;

        Self {
            points,
            triangles,
            config,
            vertex_tri,
            alias,
            constrained: HashSet::new(),
            finder,
            legalize_queue: Vec::with_capacity(32),
        }
    }

    /// number of live triangles, the super triangle's fan included until
    /// [`Self::erase_exterior`] runs
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// the vertex a (possibly merged) point id resolves to
    pub fn resolve(&self, id: PointId) -> PointId {
        self.alias[id.as_usize()]
    }

    pub(crate) fn locate_cap(&self) -> usize {
        if self.config.locate_cap > 0 {
            self.config.locate_cap
        } else {
            4 * self.triangles.len() + 64
        }
    }

    pub(crate) fn legalize_cap(&self) -> usize {
        if self.config.legalize_cap > 0 {
            self.config.legalize_cap
        } else {
            32 * self.triangles.len() + 1024
        }
    }

    /// Locate a point in the current mesh.
    pub fn locate(&self, target: Point) -> Result<LocateResult, TriError> {
        locate_walk(
            &self.triangles,
            &self.points,
            self.finder.last_triangle,
            target,
            self.config.merge_tolerance,
            self.locate_cap(),
        )
    }

    /// Insert vertex `id` into the mesh. Returns the id that now
    /// represents the vertex: a point coinciding with an existing vertex
    /// (within the merge tolerance) is not inserted again, the existing id
    /// is returned instead and later references resolve to it. Inserting
    /// an already inserted id is a no-op.
    pub fn insert_vertex(&mut self, id: PointId) -> Result<PointId, TriError> {
        if id.as_usize() >= self.points.real_len() {
            return Err(TriError::InvalidPointIndex(id.as_usize()));
        }
        let resolved = self.resolve(id);
        if resolved != id || !self.vertex_tri[resolved.as_usize()].invalid() {
            return Ok(resolved);
        }

        let target = self.points.get(id);
        let start = self.finder.start_hint(&self.vertex_tri);
        let located = locate_walk(
            &self.triangles,
            &self.points,
            start,
            target,
            self.config.merge_tolerance,
            self.locate_cap(),
        )?;

        match located {
            LocateResult::OnVertex(existing) => {
                let survivor = self.resolve(existing);
                self.alias[id.as_usize()] = survivor;
                Ok(survivor)
            }
            LocateResult::Inside(tid) => {
                self.split_triangle(tid, id)?;
                Ok(id)
            }
            LocateResult::OnEdge(tid, ei) => {
                self.split_edge(tid, ei, id)?;
                Ok(id)
            }
            LocateResult::Outside => Err(TriError::CorruptMesh {
                detail: "insertion point escaped the super triangle",
            }),
        }
    }

    /// 1 -> 3 split: `p` lies strictly inside triangle `tid`.
    fn split_triangle(&mut self, tid: TriangleId, p: PointId) -> Result<(), TriError> {
        let old = match self.triangles.remove(tid) {
            Some(t) => t,
            None => {
                return Err(TriError::CorruptMesh {
                    detail: "split target vanished",
                })
            }
        };
        let [a, b, c] = old.points;
        let [na, nb, nc] = old.neighbors;
        let [attr_a, attr_b, attr_c] = old.edge_attrs;

        let t0 = self.triangles.insert(InnerTriangle::new(a, b, p));
        let t1 = self.triangles.insert(InnerTriangle::new(b, c, p));
        let t2 = self.triangles.insert(InnerTriangle::new(c, a, p));

        {
            let t = self.triangles.get_mut_unchecked(t0);
            t.neighbors = [t1, t2, nc];
            t.edge_attrs[2] = attr_c;
        }
        {
            let t = self.triangles.get_mut_unchecked(t1);
            t.neighbors = [t2, t0, na];
            t.edge_attrs[2] = attr_a;
        }
        {
            let t = self.triangles.get_mut_unchecked(t2);
            t.neighbors = [t0, t1, nb];
            t.edge_attrs[2] = attr_b;
        }
        self.replace_neighbor(nc, tid, t0);
        self.replace_neighbor(na, tid, t1);
        self.replace_neighbor(nb, tid, t2);

        self.vertex_tri[a.as_usize()] = t0;
        self.vertex_tri[b.as_usize()] = t0;
        self.vertex_tri[c.as_usize()] = t1;
        self.vertex_tri[p.as_usize()] = t0;
        self.finder.vertex_inserted(p, self.points.get(p), t0);

        self.legalize(&[(t0, 2), (t1, 2), (t2, 2)])
    }

    /// 2 -> 4 split: `p` lies on the interior of edge `ei` of `tid`.
    fn split_edge(&mut self, tid: TriangleId, ei: usize, p: PointId) -> Result<(), TriError> {
        let old = *self.triangles.get_unchecked(tid);
        let c = old.points[ei];
        let u = old.points[(ei + 1) % 3];
        let v = old.points[(ei + 2) % 3];
        let attr_uv = old.edge_attrs[ei];
        let n_vc = old.neighbors[(ei + 1) % 3];
        let attr_vc = old.edge_attrs[(ei + 1) % 3];
        let n_cu = old.neighbors[(ei + 2) % 3];
        let attr_cu = old.edge_attrs[(ei + 2) % 3];

        let t2id = old.neighbors[ei];
        if t2id.invalid() {
            // every real point lies strictly inside the super triangle,
            // so the split edge always has two sides
            return Err(TriError::CorruptMesh {
                detail: "on-edge insertion at a hull edge",
            });
        }
        let other = *self.triangles.get_unchecked(t2id);
        let ej = match other.edge_index(u, v) {
            Some(i) => i,
            None => {
                return Err(TriError::CorruptMesh {
                    detail: "asymmetric adjacency at split edge",
                })
            }
        };
        let d = other.points[ej];
        let n_ud = other.neighbors[(ej + 1) % 3];
        let attr_ud = other.edge_attrs[(ej + 1) % 3];
        let n_dv = other.neighbors[(ej + 2) % 3];
        let attr_dv = other.edge_attrs[(ej + 2) % 3];

        self.triangles.remove(tid);
        self.triangles.remove(t2id);

        let ta = self.triangles.insert(InnerTriangle::new(c, u, p));
        let tb = self.triangles.insert(InnerTriangle::new(c, p, v));
        let tc = self.triangles.insert(InnerTriangle::new(d, v, p));
        let td = self.triangles.insert(InnerTriangle::new(d, p, u));

        {
            let t = self.triangles.get_mut_unchecked(ta);
            t.neighbors = [td, tb, n_cu];
            t.edge_attrs = [attr_uv, EdgeAttr::default(), attr_cu];
        }
        {
            let t = self.triangles.get_mut_unchecked(tb);
            t.neighbors = [tc, n_vc, ta];
            t.edge_attrs = [attr_uv, attr_vc, EdgeAttr::default()];
        }
        {
            let t = self.triangles.get_mut_unchecked(tc);
            t.neighbors = [tb, td, n_dv];
            t.edge_attrs = [attr_uv, EdgeAttr::default(), attr_dv];
        }
        {
            let t = self.triangles.get_mut_unchecked(td);
            t.neighbors = [ta, n_ud, tc];
            t.edge_attrs = [attr_uv, attr_ud, EdgeAttr::default()];
        }
        self.replace_neighbor(n_cu, tid, ta);
        self.replace_neighbor(n_vc, tid, tb);
        self.replace_neighbor(n_dv, t2id, tc);
        self.replace_neighbor(n_ud, t2id, td);

        // a constraint edge split in two stays constrained on both halves
        if attr_uv.is_constrained() {
            self.constrained.remove(&Edge::new(u, v));
            self.constrained.insert(Edge::new(u, p));
            self.constrained.insert(Edge::new(p, v));
        }

        self.vertex_tri[c.as_usize()] = ta;
        self.vertex_tri[u.as_usize()] = ta;
        self.vertex_tri[v.as_usize()] = tb;
        self.vertex_tri[d.as_usize()] = tc;
        self.vertex_tri[p.as_usize()] = ta;
        self.finder.vertex_inserted(p, self.points.get(p), ta);

        self.legalize(&[(ta, 2), (tb, 1), (tc, 2), (td, 1)])
    }

    /// Point a neighbor's back reference from `old` to `new`.
    pub(crate) fn replace_neighbor(&mut self, tid: TriangleId, old: TriangleId, new: TriangleId) {
        if tid.invalid() {
            return;
        }
        if let Some(t) = self.triangles.get_mut(tid) {
            if let Some(i) = t.neighbor_index(old) {
                t.neighbors[i] = new;
            }
        }
    }

    /// Restore the empty-circumcircle property around the seeded edges by
    /// flipping violating edges until none remain. Constrained edges are
    /// never flipped. The worklist formulation bounds stack depth and lets
    /// the iteration cap catch a corrupted mesh instead of hanging.
    pub(crate) fn legalize(&mut self, seeds: &[(TriangleId, usize)]) -> Result<(), TriError> {
        let cap = self.legalize_cap();
        let mut queue = std::mem::take(&mut self.legalize_queue);
        queue.clear();
        queue.extend_from_slice(seeds);

        let mut steps = 0usize;
        while let Some((tid, ei)) = queue.pop() {
            steps += 1;
            if steps > cap {
                self.legalize_queue = queue;
                return Err(TriError::IterationCapExceeded {
                    operation: "flip propagation",
                });
            }

            let tri = match self.triangles.get(tid) {
                Some(t) => *t,
                None => continue,
            };
            if tri.is_constrained(ei) {
                continue;
            }
            let nid = tri.neighbors[ei];
            if nid.invalid() {
                continue;
            }
            let other = match self.triangles.get(nid) {
                Some(t) => *t,
                None => continue,
            };
            let c = tri.points[ei];
            let (u, v) = tri.edge(ei);
            let ej = match other.edge_index(u, v) {
                Some(i) => i,
                None => continue,
            };
            let d = other.points[ej];

            if in_circle(
                c.get(&self.points),
                u.get(&self.points),
                v.get(&self.points),
                d.get(&self.points),
            ) {
                self.flip(tid, ei, nid, ej);
                // tid is now (c, u, d), nid is (c, d, v); recheck the four
                // outer edges of the quad
                queue.push((tid, 0));
                queue.push((tid, 2));
                queue.push((nid, 0));
                queue.push((nid, 1));
            }
        }

        self.legalize_queue = queue;
        Ok(())
    }

    /// Replace the shared edge of `tid`/`nid` with the opposite diagonal
    /// of their quad. `ei`/`ej` index the shared edge in each triangle.
    /// Both slots are rewritten in place, so the two ids stay live.
    pub(crate) fn flip(&mut self, tid: TriangleId, ei: usize, nid: TriangleId, ej: usize) {
        let tri = *self.triangles.get_unchecked(tid);
        let other = *self.triangles.get_unchecked(nid);

        let c = tri.points[ei];
        let (u, v) = tri.edge(ei);
        let d = other.points[ej];
        debug_assert_eq!(other.edge(ej), (v, u), "flip edge direction mismatch");

        let n_vc = tri.neighbors[(ei + 1) % 3];
        let attr_vc = tri.edge_attrs[(ei + 1) % 3];
        let n_cu = tri.neighbors[(ei + 2) % 3];
        let attr_cu = tri.edge_attrs[(ei + 2) % 3];
        let n_ud = other.neighbors[(ej + 1) % 3];
        let attr_ud = other.edge_attrs[(ej + 1) % 3];
        let n_dv = other.neighbors[(ej + 2) % 3];
        let attr_dv = other.edge_attrs[(ej + 2) % 3];

        {
            let t = self.triangles.get_mut_unchecked(tid);
            t.points = [c, u, d];
            t.neighbors = [n_ud, nid, n_cu];
            t.edge_attrs = [attr_ud, EdgeAttr::default(), attr_cu];
        }
        {
            let t = self.triangles.get_mut_unchecked(nid);
            t.points = [c, d, v];
            t.neighbors = [n_dv, n_vc, tid];
            t.edge_attrs = [attr_dv, attr_vc, EdgeAttr::default()];
        }
        self.replace_neighbor(n_ud, nid, tid);
        self.replace_neighbor(n_vc, tid, nid);

        self.vertex_tri[c.as_usize()] = tid;
        self.vertex_tri[u.as_usize()] = tid;
        self.vertex_tri[d.as_usize()] = tid;
        self.vertex_tri[v.as_usize()] = nid;
    }

    /// Flip the edge `{p, q}`. Rejected when the edge is constrained, is a
    /// hull edge, or flipping would invert one of the two triangles.
    pub fn flip_edge(&mut self, p: PointId, q: PointId) -> Result<(), TriError> {
        let p = self.resolve(p);
        let q = self.resolve(q);
        let edge = Edge::new(p, q);
        let (tid, ei) = self
            .find_edge_triangle(p, q)
            .ok_or(TriError::EdgeNotFound(edge))?;

        let tri = *self.triangles.get_unchecked(tid);
        if tri.is_constrained(ei) {
            return Err(TriError::FlipRejected(edge));
        }
        let nid = tri.neighbors[ei];
        if nid.invalid() {
            return Err(TriError::FlipRejected(edge));
        }
        let other = *self.triangles.get_unchecked(nid);
        let (u, v) = tri.edge(ei);
        let ej = match other.edge_index(u, v) {
            Some(i) => i,
            None => {
                return Err(TriError::CorruptMesh {
                    detail: "asymmetric adjacency at flip edge",
                })
            }
        };

        // the new diagonal has to keep both triangles counter-clockwise
        let c = tri.points[ei];
        let d = other.points[ej];
        let pc = c.get(&self.points);
        let pd = d.get(&self.points);
        if !orient_2d(pc, u.get(&self.points), pd).is_ccw()
            || !orient_2d(pc, pd, v.get(&self.points)).is_ccw()
        {
            return Err(TriError::FlipRejected(edge));
        }

        self.flip(tid, ei, nid, ej);
        Ok(())
    }

    /// Find a triangle carrying edge `{p, q}` by circling the fan around
    /// `p`. Returns the triangle and the local edge index.
    pub(crate) fn find_edge_triangle(&self, p: PointId, q: PointId) -> Option<(TriangleId, usize)> {
        let start = *self.vertex_tri.get(p.as_usize())?;
        if start.invalid() {
            return None;
        }
        let mut current = start;
        for _ in 0..=self.triangles.len() {
            let tri = self.triangles.get(current)?;
            if let Some(eidx) = tri.edge_index(p, q) {
                return Some((current, eidx));
            }
            let vi = tri.vertex_index(p)?;
            current = tri.neighbors[(vi + 1) % 3];
            if current.invalid() || current == start {
                return None;
            }
        }
        None
    }

    /// Adjacency/orientation sanity check used by tests and debug asserts.
    pub(crate) fn mesh_is_consistent(&self) -> bool {
        for (tid, tri) in self.triangles.iter() {
            let [a, b, c] = tri.points;
            if !orient_2d(
                a.get(&self.points),
                b.get(&self.points),
                c.get(&self.points),
            )
            .is_ccw()
            {
                return false;
            }
            for ei in 0..3 {
                let nid = tri.neighbors[ei];
                if nid.invalid() {
                    continue;
                }
                let Some(other) = self.triangles.get(nid) else {
                    return false;
                };
                let (u, v) = tri.edge(ei);
                let Some(ej) = other.edge_index(u, v) else {
                    return false;
                };
                if other.neighbors[ej] != tid {
                    return false;
                }
                if other.is_constrained(ej) != tri.is_constrained(ei) {
                    return false;
                }
            }
        }
        true
    }
}
