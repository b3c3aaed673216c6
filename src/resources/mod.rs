//! CPU-side resource data: geometric primitives and mesh components.

pub mod geometry;
pub mod mesh;

pub use geometry::{BoundingBox, Plane, Ray};
pub use mesh::{Mesh, Primitive};
