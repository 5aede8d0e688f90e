use std::collections::{HashMap, HashSet};

use crate::points::PointId;
use crate::predicates::{
    between_on_segment, in_circle, orient_2d, segments_cross_properly, Orientation,
};
use crate::shape::{Edge, EdgeAttr, InnerTriangle};
use crate::triangles::TriangleId;
use crate::triangulation::Triangulation;
use crate::TriError;

enum Enforce {
    Done,
    /// the segment passes exactly through this vertex; enforce both halves
    Split(PointId),
}

impl Triangulation {
    /// Force the edge `(a, b)` to appear in the mesh and mark it
    /// constrained. Both endpoints must have been inserted. A constraint
    /// whose endpoints merged into one vertex is skipped; a constraint
    /// crossing an already constrained edge is a hard error and leaves the
    /// mesh untouched.
    pub fn insert_constraint(&mut self, a: PointId, b: PointId) -> Result<(), TriError> {
        for id in [a, b] {
            if id.as_usize() >= self.points.real_len() {
                return Err(TriError::InvalidPointIndex(id.as_usize()));
            }
        }
        let a = self.resolve(a);
        let b = self.resolve(b);
        if a == b {
            return Ok(());
        }
        if self.vertex_tri[a.as_usize()].invalid() || self.vertex_tri[b.as_usize()].invalid() {
            return Err(TriError::InvalidPointIndex(
                if self.vertex_tri[a.as_usize()].invalid() {
                    a.as_usize()
                } else {
                    b.as_usize()
                },
            ));
        }

        // a segment passing exactly through intermediate vertices splits
        // into sub-constraints, each enforced on its own
        let mut pending = vec![(a, b)];
        let cap = 2 * self.points.len() + 16;
        let mut steps = 0usize;
        while let Some((p, q)) = pending.pop() {
            steps += 1;
            if steps > cap {
                return Err(TriError::IterationCapExceeded {
                    operation: "constraint splitting",
                });
            }
            match self.enforce_segment(p, q)? {
                Enforce::Done => {}
                Enforce::Split(w) => {
                    pending.push((w, q));
                    pending.push((p, w));
                }
            }
        }
        Ok(())
    }

    /// surviving constraint edges, in resolved vertex ids
    pub fn constraint_edges(&self) -> &HashSet<Edge> {
        &self.constrained
    }

    fn enforce_segment(&mut self, a: PointId, b: PointId) -> Result<Enforce, TriError> {
        let pa = a.get(&self.points);
        let pb = b.get(&self.points);

        // Circle the fan around `a`. Either the edge already exists, the
        // segment passes exactly through a fan vertex, or it leaves
        // through the edge opposite `a` of one fan triangle.
        let start = self.vertex_tri[a.as_usize()];
        let mut current = start;
        let mut first_crossed = None;
        for _ in 0..=self.triangles.len() {
            let tri = match self.triangles.get(current) {
                Some(t) => *t,
                None => {
                    return Err(TriError::CorruptMesh {
                        detail: "dangling triangle in vertex fan",
                    })
                }
            };
            let vi = match tri.vertex_index(a) {
                Some(i) => i,
                None => {
                    return Err(TriError::CorruptMesh {
                        detail: "vertex fan lost its vertex",
                    })
                }
            };
            let u = tri.points[(vi + 1) % 3];
            let v = tri.points[(vi + 2) % 3];

            if tri.contains(b) {
                let ei = match tri.edge_index(a, b) {
                    Some(i) => i,
                    None => {
                        return Err(TriError::CorruptMesh {
                            detail: "fan triangle without its own edge",
                        })
                    }
                };
                self.mark_edge_constrained(current, ei);
                self.constrained.insert(Edge::new(a, b));
                return Ok(Enforce::Done);
            }

            let pu = u.get(&self.points);
            let pv = v.get(&self.points);
            if orient_2d(pa, pb, pu).is_collinear() && between_on_segment(pa, pb, pu) {
                return Ok(Enforce::Split(u));
            }
            if orient_2d(pa, pb, pv).is_collinear() && between_on_segment(pa, pb, pv) {
                return Ok(Enforce::Split(v));
            }

            if segments_cross_properly(pa, pb, pu, pv) {
                first_crossed = Some((current, u, v));
                break;
            }

            current = tri.neighbors[(vi + 1) % 3];
            if current.invalid() || current == start {
                break;
            }
        }
        let Some((tid, u, v)) = first_crossed else {
            return Err(TriError::CorruptMesh {
                detail: "no corridor found for constraint segment",
            });
        };

        // March the corridor of triangles the segment crosses, splitting
        // the corridor vertices into the chains left and right of a -> b.
        // Nothing is mutated until the march succeeded, so hard errors
        // leave the mesh intact.
        let mut crossed = vec![tid];
        let pu = u.get(&self.points);
        let (mut l, mut r) = if orient_2d(pa, pb, pu).is_ccw() {
            (u, v)
        } else {
            (v, u)
        };
        let mut upper = vec![l];
        let mut lower = vec![r];
        let mut current = tid;
        let corridor_cap = self.triangles.len();
        let mut corridor_steps = 0usize;
        loop {
            corridor_steps += 1;
            if corridor_steps > corridor_cap {
                return Err(TriError::IterationCapExceeded {
                    operation: "constraint corridor march",
                });
            }
            let tri = *self.triangles.get_unchecked(current);
            let ei = match tri.edge_index(l, r) {
                Some(i) => i,
                None => {
                    return Err(TriError::CorruptMesh {
                        detail: "corridor lost its crossed edge",
                    })
                }
            };
            if tri.is_constrained(ei) {
                return Err(TriError::ConstraintsCross {
                    constraint: Edge::new(a, b),
                    crossed: Edge::new(l, r),
                });
            }
            let nid = tri.neighbors[ei];
            if nid.invalid() {
                return Err(TriError::CorruptMesh {
                    detail: "corridor ran off the mesh",
                });
            }
            let next = *self.triangles.get_unchecked(nid);
            let nj = match next.edge_index(l, r) {
                Some(i) => i,
                None => {
                    return Err(TriError::CorruptMesh {
                        detail: "asymmetric adjacency in corridor",
                    })
                }
            };
            let w = next.points[nj];
            crossed.push(nid);
            if w == b {
                break;
            }
            let pw = w.get(&self.points);
            match orient_2d(pa, pb, pw) {
                Orientation::Collinear => {
                    if between_on_segment(pa, pb, pw) {
                        return Ok(Enforce::Split(w));
                    }
                    return Err(TriError::CorruptMesh {
                        detail: "collinear corridor vertex outside the segment",
                    });
                }
                Orientation::CCW => {
                    upper.push(w);
                    l = w;
                }
                Orientation::CW => {
                    lower.push(w);
                    r = w;
                }
            }
            current = nid;
        }

        // Record the cavity boundary (outer neighbor + flags per edge)
        // before the corridor is deleted.
        let crossed_set: HashSet<TriangleId> = crossed.iter().copied().collect();
        let mut boundary: HashMap<Edge, (TriangleId, EdgeAttr)> = HashMap::new();
        for &ct in &crossed {
            let tri = *self.triangles.get_unchecked(ct);
            for i in 0..3 {
                let nb = tri.neighbors[i];
                if !nb.invalid() && crossed_set.contains(&nb) {
                    continue;
                }
                let (eu, ev) = tri.edge(i);
                boundary.insert(Edge::new(eu, ev), (nb, tri.edge_attrs[i]));
            }
        }
        for &ct in &crossed {
            self.triangles.remove(ct);
        }

        // Re-triangulate both pseudo-polygon cavities. The lower chain is
        // ordered along a -> b, the base of its cavity runs b -> a.
        let mut created = Vec::with_capacity(upper.len() + lower.len());
        self.fill_cavity(a, b, &upper, &mut created);
        lower.reverse();
        self.fill_cavity(b, a, &lower, &mut created);

        // Wire the new triangles: among themselves through the directed
        // half-edge map, and onto the recorded cavity boundary.
        let mut half: HashMap<(PointId, PointId), (TriangleId, usize)> = HashMap::new();
        for &ct in created.iter() {
            let tri = *self.triangles.get_unchecked(ct);
            for i in 0..3 {
                half.insert(tri.edge(i), (ct, i));
            }
        }
        for &ct in created.iter() {
            let tri = *self.triangles.get_unchecked(ct);
            for i in 0..3 {
                let (eu, ev) = tri.edge(i);
                if let Some(&(mate, _)) = half.get(&(ev, eu)) {
                    self.triangles.get_mut_unchecked(ct).neighbors[i] = mate;
                } else if let Some(&(outer, attr)) = boundary.get(&Edge::new(eu, ev)) {
                    {
                        let t = self.triangles.get_mut_unchecked(ct);
                        t.neighbors[i] = outer;
                        t.edge_attrs[i] = attr;
                    }
                    self.bond_outer(outer, eu, ev, ct);
                } else {
                    return Err(TriError::CorruptMesh {
                        detail: "cavity boundary mismatch",
                    });
                }
            }
        }

        let (up, lo) = (half.get(&(a, b)).copied(), half.get(&(b, a)).copied());
        let (Some((t_up, i_up)), Some((t_lo, i_lo))) = (up, lo) else {
            return Err(TriError::CorruptMesh {
                detail: "constraint edge missing after cavity fill",
            });
        };
        self.triangles.get_mut_unchecked(t_up).set_constrained(i_up, true);
        self.triangles.get_mut_unchecked(t_lo).set_constrained(i_lo, true);
        self.constrained.insert(Edge::new(a, b));

        for &ct in created.iter() {
            let tri = *self.triangles.get_unchecked(ct);
            for k in 0..3 {
                self.vertex_tri[tri.points[k].as_usize()] = ct;
            }
        }

        // Apex selection already yields Delaunay cavity interiors; this
        // pass settles the remaining ties and never crosses constraints.
        let mut seeds = Vec::with_capacity(created.len() * 3);
        for &ct in created.iter() {
            for i in 0..3 {
                seeds.push((ct, i));
            }
        }
        self.legalize(&seeds)?;

        Ok(Enforce::Done)
    }

    /// Triangulate the cavity left of the base edge p -> q. `chain` holds
    /// the cavity boundary vertices ordered from p to q. Apexes are picked
    /// by the in-circle criterion, recursing into the sub-cavities on an
    /// explicit stack.
    fn fill_cavity(
        &mut self,
        p: PointId,
        q: PointId,
        chain: &[PointId],
        created: &mut Vec<TriangleId>,
    ) {
        let mut stack = vec![(p, q, 0usize, chain.len())];
        while let Some((p, q, s, e)) = stack.pop() {
            if s == e {
                continue;
            }
            let mut ci = s;
            for i in (s + 1)..e {
                if in_circle(
                    p.get(&self.points),
                    q.get(&self.points),
                    chain[ci].get(&self.points),
                    chain[i].get(&self.points),
                ) {
                    ci = i;
                }
            }
            let c = chain[ci];
            let tid = self.triangles.insert(InnerTriangle::new(p, q, c));
            created.push(tid);
            stack.push((p, c, s, ci));
            stack.push((c, q, ci + 1, e));
        }
    }

    fn bond_outer(&mut self, outer: TriangleId, u: PointId, v: PointId, tid: TriangleId) {
        if outer.invalid() {
            return;
        }
        if let Some(o) = self.triangles.get_mut(outer) {
            if let Some(i) = o.edge_index(u, v) {
                o.neighbors[i] = tid;
            }
        }
    }

    /// Flag an existing edge (and its mirror in the neighbor) constrained.
    fn mark_edge_constrained(&mut self, tid: TriangleId, ei: usize) {
        let (nid, u, v) = {
            let t = self.triangles.get_mut_unchecked(tid);
            t.set_constrained(ei, true);
            let (u, v) = t.edge(ei);
            (t.neighbors[ei], u, v)
        };
        if nid.invalid() {
            return;
        }
        if let Some(o) = self.triangles.get_mut(nid) {
            if let Some(j) = o.edge_index(u, v) {
                o.set_constrained(j, true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Point;
    use crate::triangulation::TriangulationConfig;

    fn pid(i: usize) -> PointId {
        PointId::from_index(i)
    }

    fn build(points: Vec<Point>) -> Triangulation {
        let mut tri = Triangulation::new(points, TriangulationConfig::default()).unwrap();
        for i in 0..tri.points.real_len() {
            tri.insert_vertex(pid(i)).unwrap();
        }
        tri
    }

    #[test]
    fn test_existing_edge_is_flagged() {
        let mut tri = build(vec![
            Point::new(0., 0.),
            Point::new(5., 0.),
            Point::new(5., 4.),
            Point::new(0., 4.),
        ]);
        // the bottom edge is already a Delaunay edge
        tri.insert_constraint(pid(0), pid(1)).unwrap();
        assert!(tri.constraint_edges().contains(&Edge::new(pid(0), pid(1))));

        let (tid, ei) = tri.find_edge_triangle(pid(0), pid(1)).unwrap();
        assert!(tri.triangles.get_unchecked(tid).is_constrained(ei));
        assert!(tri.mesh_is_consistent());
    }

    #[test]
    fn test_missing_edge_is_cut_in() {
        // two triangles glued along 0-2; constraining 1-3 re-cuts the quad
        let mut tri = build(vec![
            Point::new(0., 0.),
            Point::new(4., 0.),
            Point::new(4., 5.),
            Point::new(0., 5.),
        ]);
        let before = tri.triangle_count();
        let has_02 = tri.find_edge_triangle(pid(0), pid(2)).is_some();
        let (p, q) = if has_02 { (pid(1), pid(3)) } else { (pid(0), pid(2)) };
        assert!(tri.find_edge_triangle(p, q).is_none());

        tri.insert_constraint(p, q).unwrap();
        assert!(tri.find_edge_triangle(p, q).is_some());
        assert!(tri.constraint_edges().contains(&Edge::new(p, q)));
        assert_eq!(tri.triangle_count(), before);
        assert!(tri.mesh_is_consistent());
    }

    #[test]
    fn test_crossing_constraints_rejected() {
        let mut tri = build(vec![
            Point::new(0., 0.),
            Point::new(4., 0.),
            Point::new(4., 5.),
            Point::new(0., 5.),
        ]);
        tri.insert_constraint(pid(0), pid(2)).unwrap();
        let result = tri.insert_constraint(pid(1), pid(3));
        assert!(matches!(result, Err(TriError::ConstraintsCross { .. })));
        // the first constraint survived, the mesh is still sound
        assert!(tri.constraint_edges().contains(&Edge::new(pid(0), pid(2))));
        assert!(tri.mesh_is_consistent());
    }

    #[test]
    fn test_collinear_vertex_splits_constraint() {
        // vertex 4 sits exactly on the segment 0-1
        let mut tri = build(vec![
            Point::new(0., 0.),
            Point::new(4., 0.),
            Point::new(4., 2.),
            Point::new(0., 2.),
            Point::new(2., 0.),
        ]);
        tri.insert_constraint(pid(0), pid(1)).unwrap();

        assert!(tri.constraint_edges().contains(&Edge::new(pid(0), pid(4))));
        assert!(tri.constraint_edges().contains(&Edge::new(pid(4), pid(1))));
        assert!(!tri.constraint_edges().contains(&Edge::new(pid(0), pid(1))));
        assert!(tri.mesh_is_consistent());
    }

    #[test]
    fn test_constraint_through_many_triangles() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(11);
        let mut points = vec![Point::new(0., 50.), Point::new(100., 50.)];
        for _ in 0..80 {
            points.push(Point::new(
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.0..100.0),
            ));
        }
        let mut tri = build(points);
        tri.insert_constraint(pid(0), pid(1)).unwrap();

        // the edge must exist afterwards, flagged on both sides
        let (tid, ei) = tri.find_edge_triangle(pid(0), pid(1)).unwrap();
        assert!(tri.triangles.get_unchecked(tid).is_constrained(ei));
        assert!(tri.mesh_is_consistent());
    }

    #[test]
    fn test_degenerate_constraint_skipped() {
        let mut points = vec![
            Point::new(0., 0.),
            Point::new(4., 0.),
            Point::new(4., 5.),
            Point::new(0., 5.),
        ];
        points.push(Point::new(0., 0.)); // duplicate of vertex 0
        let mut tri = build(points);
        // resolves to (0, 0): nothing to do, nothing recorded
        tri.insert_constraint(pid(0), pid(4)).unwrap();
        assert!(tri.constraint_edges().is_empty());
    }
}
