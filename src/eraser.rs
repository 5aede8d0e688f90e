use crate::locate::{locate_by_scan, LocateResult};
use crate::shape::Point;
use crate::triangles::TriangleId;
use crate::triangulation::Triangulation;
use crate::TriError;

impl Triangulation {
    /// Remove everything that is not polygon interior: flood-fill the
    /// triangle adjacency graph without ever crossing a constrained edge,
    /// seeded from the super-triangle fan (everything outside the outer
    /// boundary) and from one located triangle per hole seed. All reached
    /// triangles are deleted; the survivors are the final mesh. Returns
    /// the number of erased triangles.
    pub fn erase_exterior(&mut self, hole_seeds: &[Point]) -> Result<usize, TriError> {
        let mut marked = vec![false; self.triangles.slot_count()];
        let mut queue: Vec<TriangleId> = Vec::new();

        // (a) any triangle touching a synthetic vertex lies outside the
        // outer boundary
        for (tid, tri) in self.triangles.iter() {
            if tri.points.iter().any(|&p| self.points.is_synthetic(p)) {
                marked[tid.as_usize()] = true;
                queue.push(tid);
            }
        }
        self.flood(&mut marked, &mut queue);

        // (b) one flood per hole seed. The mesh is still complete here, so
        // seeds can be located. A seed landing in an already erased region
        // is a no-op: that region is exterior anyway.
        for seed in hole_seeds {
            match locate_by_scan(&self.triangles, &self.points, *seed) {
                LocateResult::Inside(tid) => {
                    if !marked[tid.as_usize()] {
                        marked[tid.as_usize()] = true;
                        queue.push(tid);
                        self.flood(&mut marked, &mut queue);
                    }
                }
                // a seed on an unconstrained edge is unambiguous: both
                // sides belong to the same region
                LocateResult::OnEdge(tid, ei) => {
                    if self.triangles.get_unchecked(tid).is_constrained(ei) {
                        return Err(TriError::HoleSeedDegenerate {
                            x: seed.x,
                            y: seed.y,
                        });
                    }
                    if !marked[tid.as_usize()] {
                        marked[tid.as_usize()] = true;
                        queue.push(tid);
                        self.flood(&mut marked, &mut queue);
                    }
                }
                LocateResult::OnVertex(_) => {
                    return Err(TriError::HoleSeedDegenerate {
                        x: seed.x,
                        y: seed.y,
                    });
                }
                LocateResult::Outside => {
                    return Err(TriError::HoleSeedOutside {
                        x: seed.x,
                        y: seed.y,
                    });
                }
            }
        }

        // delete the marked triangles and detach surviving neighbors
        let doomed: Vec<TriangleId> = self
            .triangles
            .iter()
            .filter(|(tid, _)| marked[tid.as_usize()])
            .map(|(tid, _)| tid)
            .collect();
        for &tid in &doomed {
            if let Some(tri) = self.triangles.remove(tid) {
                for i in 0..3 {
                    let nb = tri.neighbors[i];
                    if nb.invalid() || marked[nb.as_usize()] {
                        continue;
                    }
                    if let Some(other) = self.triangles.get_mut(nb) {
                        if let Some(j) = other.neighbor_index(tid) {
                            other.neighbors[j] = TriangleId::INVALID;
                        }
                    }
                }
            }
        }

        // rebuild the per-vertex triangle hints from the survivors
        for hint in self.vertex_tri.iter_mut() {
            *hint = TriangleId::INVALID;
        }
        let mut last = TriangleId::INVALID;
        for (tid, tri) in self.triangles.iter() {
            for k in 0..3 {
                self.vertex_tri[tri.points[k].as_usize()] = tid;
            }
            last = tid;
        }
        self.finder.last_triangle = last;

        Ok(doomed.len())
    }

    /// Expand the marking across all edges that are not constrained.
    fn flood(&self, marked: &mut [bool], queue: &mut Vec<TriangleId>) {
        while let Some(tid) = queue.pop() {
            let tri = self.triangles.get_unchecked(tid);
            for i in 0..3 {
                if tri.is_constrained(i) {
                    continue;
                }
                let nb = tri.neighbors[i];
                if nb.invalid() || marked[nb.as_usize()] {
                    continue;
                }
                marked[nb.as_usize()] = true;
                queue.push(nb);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::points::PointId;
    use crate::shape::Point;
    use crate::triangulation::{Triangulation, TriangulationConfig};
    use crate::TriError;

    fn pid(i: usize) -> PointId {
        PointId::from_index(i)
    }

    fn square_with_boundary() -> Triangulation {
        let mut tri = Triangulation::new(
            vec![
                Point::new(0., 0.),
                Point::new(5., 0.),
                Point::new(5., 4.),
                Point::new(0., 4.),
            ],
            TriangulationConfig::default(),
        )
        .unwrap();
        for i in 0..4 {
            tri.insert_vertex(pid(i)).unwrap();
        }
        for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
            tri.insert_constraint(pid(a), pid(b)).unwrap();
        }
        tri
    }

    #[test]
    fn test_erase_leaves_square_interior() {
        let mut tri = square_with_boundary();
        let before = tri.triangle_count();
        let erased = tri.erase_exterior(&[]).unwrap();
        assert_eq!(tri.triangle_count(), 2);
        assert_eq!(erased, before - 2);
        assert!(tri.mesh_is_consistent());

        // no survivor references a synthetic vertex
        for (_, t) in tri.triangles.iter() {
            assert!(t.points.iter().all(|&p| !tri.points.is_synthetic(p)));
        }
    }

    #[test]
    fn test_hole_seed_on_vertex_is_rejected() {
        let mut tri = square_with_boundary();
        let result = tri.erase_exterior(&[Point::new(0., 0.)]);
        assert!(matches!(result, Err(TriError::HoleSeedDegenerate { .. })));
    }

    #[test]
    fn test_hole_seed_outside_mesh_is_rejected() {
        let mut tri = square_with_boundary();
        let result = tri.erase_exterior(&[Point::new(1e4, 1e4)]);
        assert!(matches!(result, Err(TriError::HoleSeedOutside { .. })));
    }

    #[test]
    fn test_hole_seed_in_exterior_is_noop() {
        let mut tri = square_with_boundary();
        // just outside the boundary polygon but still inside the super
        // triangle: the region is exterior already
        tri.erase_exterior(&[Point::new(6., 4.5)]).unwrap();
        assert_eq!(tri.triangle_count(), 2);
    }
}
