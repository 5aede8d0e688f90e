mod constraint;
mod eraser;
mod error;
pub mod loader;
mod locate;
mod mesher;
pub mod network;
mod points;
mod predicates;
mod shape;
mod triangles;
mod triangulation;

pub use error::TriError;
pub use locate::{LocateResult, StartStrategy};
pub use mesher::{Mesh, Mesher, MesherBuilder, Observer};
pub use points::PointId;
pub use shape::{Edge, Point};
pub use triangles::TriangleId;
pub use triangulation::{Triangulation, TriangulationConfig};

/// Coordinate type used throughout the crate.
#[cfg(not(feature = "f32"))]
pub type Float = f64;

/// Coordinate type used throughout the crate.
#[cfg(feature = "f32")]
pub type Float = f32;

/// A finished output triangle: corner coordinates plus the indices of the
/// corners in the caller's input point sequence, so results can be mapped
/// back onto per-polygon data (zone ids, materials etc).
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub points: [Point; 3],
    pub indices: [PointId; 3],
}
