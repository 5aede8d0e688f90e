use crate::shape::InnerTriangle;

#[derive(Debug, Hash, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TriangleId(usize);

impl TriangleId {
    pub const INVALID: TriangleId = TriangleId(usize::MAX);

    /// whether id is invalid
    pub fn invalid(&self) -> bool {
        self.0 == Self::INVALID.0
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }

    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn get<'b>(&self, triangles: &'b TriangleStore) -> &'b InnerTriangle {
        triangles.get_unchecked(*self)
    }

    pub fn try_get<'b>(&self, triangles: &'b TriangleStore) -> Option<&'b InnerTriangle> {
        triangles.get(*self)
    }
}

/// Triangle store: an arena of triangle slots addressed by stable ids.
/// Removing a triangle leaves a tombstone on a free list, so ids of live
/// triangles never move; flips and erasure rely on that. Slots are only
/// compacted away when the final result is extracted.
#[derive(Debug)]
pub struct TriangleStore {
    slots: Vec<Option<InnerTriangle>>,
    free: Vec<usize>,
    live: usize,
}

impl TriangleStore {
    pub fn new() -> Self {
        Self {
            slots: vec![],
            free: vec![],
            live: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: vec![],
            live: 0,
        }
    }

    /// number of live triangles
    pub fn len(&self) -> usize {
        self.live
    }

    /// number of slots ever allocated, tombstones included
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// insert a new triangle, reusing a tombstone slot when one exists
    pub fn insert(&mut self, triangle: InnerTriangle) -> TriangleId {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(triangle);
                TriangleId(index)
            }
            None => {
                self.slots.push(Some(triangle));
                TriangleId(self.slots.len() - 1)
            }
        }
    }

    /// remove a triangle, invalidating its id
    pub fn remove(&mut self, id: TriangleId) -> Option<InnerTriangle> {
        let triangle = self.slots.get_mut(id.as_usize())?.take()?;
        self.free.push(id.as_usize());
        self.live -= 1;
        Some(triangle)
    }

    pub fn get(&self, id: TriangleId) -> Option<&InnerTriangle> {
        if id.invalid() {
            return None;
        }
        self.slots.get(id.as_usize())?.as_ref()
    }

    pub fn get_mut(&mut self, id: TriangleId) -> Option<&mut InnerTriangle> {
        if id.invalid() {
            return None;
        }
        self.slots.get_mut(id.as_usize())?.as_mut()
    }

    pub fn get_unchecked(&self, id: TriangleId) -> &InnerTriangle {
        match self.get(id) {
            Some(t) => t,
            None => panic!("stale triangle id {:?}", id),
        }
    }

    pub fn get_mut_unchecked(&mut self, id: TriangleId) -> &mut InnerTriangle {
        match self.get_mut(id) {
            Some(t) => t,
            None => panic!("stale triangle id {:?}", id),
        }
    }

    /// iter live triangles in slot order
    pub fn iter(&self) -> impl Iterator<Item = (TriangleId, &InnerTriangle)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|t| (TriangleId(idx), t)))
    }

    /// Mark two triangles as neighbors across their common edge. The
    /// constrained flag of the edge is the union of what either side
    /// already carries.
    pub fn mark_neighbor(&mut self, left: TriangleId, right: TriangleId) {
        let lt = *self.get_unchecked(left);
        let rt = *self.get_unchecked(right);
        let Some((le, re)) = Self::common_edge(&lt, &rt) else {
            debug_assert!(false, "they are not neighbors");
            return;
        };

        let constrained = lt.is_constrained(le) || rt.is_constrained(re);

        let l = self.get_mut_unchecked(left);
        l.neighbors[le] = right;
        l.set_constrained(le, constrained);

        let r = self.get_mut_unchecked(right);
        r.neighbors[re] = left;
        r.set_constrained(re, constrained);
    }

    fn common_edge(l: &InnerTriangle, r: &InnerTriangle) -> Option<(usize, usize)> {
        for i in 0..3 {
            let (u, v) = l.edge(i);
            if let Some(j) = r.edge_index(v, u) {
                return Some((i, j));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::PointId;

    fn pid(i: usize) -> PointId {
        PointId::from_index(i)
    }

    #[test]
    fn test_insert_remove_reuse() {
        let mut triangles = TriangleStore::new();

        let t0 = triangles.insert(InnerTriangle::new(pid(0), pid(1), pid(2)));
        let t1 = triangles.insert(InnerTriangle::new(pid(2), pid(1), pid(3)));
        assert_eq!(triangles.len(), 2);
        assert_eq!(triangles.slot_count(), 2);

        assert!(triangles.remove(t0).is_some());
        assert_eq!(triangles.len(), 1);
        assert!(triangles.get(t0).is_none());
        // the other id survives removal
        assert!(triangles.get(t1).is_some());

        // tombstone slot is reused, no growth
        let t2 = triangles.insert(InnerTriangle::new(pid(0), pid(3), pid(4)));
        assert_eq!(t2, t0);
        assert_eq!(triangles.slot_count(), 2);
        assert_eq!(triangles.len(), 2);
    }

    #[test]
    fn test_mark_neighbor() {
        let mut triangles = TriangleStore::new();

        // (0,1,2) and (2,1,3) share edge {1,2}
        let t1 = triangles.insert(InnerTriangle::new(pid(0), pid(1), pid(2)));
        let t2 = triangles.insert(InnerTriangle::new(pid(2), pid(1), pid(3)));

        triangles.mark_neighbor(t1, t2);
        let lt = triangles.get(t1).unwrap();
        assert_eq!(lt.neighbors[0], t2);
        let rt = triangles.get(t2).unwrap();
        assert_eq!(rt.neighbors[2], t1);
    }

    #[test]
    fn test_iter_skips_tombstones() {
        let mut triangles = TriangleStore::new();
        let t0 = triangles.insert(InnerTriangle::new(pid(0), pid(1), pid(2)));
        let t1 = triangles.insert(InnerTriangle::new(pid(1), pid(3), pid(2)));
        triangles.remove(t0);

        let live: Vec<_> = triangles.iter().map(|(id, _)| id).collect();
        assert_eq!(live, vec![t1]);
    }
}
