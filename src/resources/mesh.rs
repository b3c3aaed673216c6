use glam::{Affine3A, Vec3};

use crate::resources::geometry::BoundingBox;

/// One drawable part of a mesh: CPU-side positions and optional indices.
///
/// `positions` may be empty when the source accessor could not be expanded
/// (sparse storage); `bounds` then comes from the accessor's declared
/// `min`/`max`.
#[derive(Debug, Clone, Default)]
pub struct Primitive {
    pub positions: Vec<Vec3>,
    pub indices: Option<Vec<u32>>,
    pub bounds: BoundingBox,
}

impl Primitive {
    #[must_use]
    pub fn new(positions: Vec<Vec3>, indices: Option<Vec<u32>>) -> Self {
        let bounds = BoundingBox::from_points(positions.iter().copied());
        Self {
            positions,
            indices,
            bounds,
        }
    }

    #[must_use]
    pub fn from_bounds(bounds: BoundingBox) -> Self {
        Self {
            positions: Vec::new(),
            indices: None,
            bounds,
        }
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Exact bounds of every vertex under `matrix`; falls back to the
    /// transformed box corners when no vertex data is available.
    #[must_use]
    pub fn world_bounds(&self, matrix: &Affine3A) -> BoundingBox {
        if self.positions.is_empty() {
            self.bounds.transform(matrix)
        } else {
            BoundingBox::from_points(self.positions.iter().map(|&p| matrix.transform_point3(p)))
        }
    }
}

/// Mesh component attached to a scene node.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

impl Mesh {
    #[must_use]
    pub fn new(name: Option<String>, primitives: Vec<Primitive>) -> Self {
        Self { name, primitives }
    }

    /// Local-space bounds of all primitives.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        self.primitives
            .iter()
            .fold(BoundingBox::empty(), |acc, p| acc.union(&p.bounds))
    }

    #[must_use]
    pub fn world_bounds(&self, matrix: &Affine3A) -> BoundingBox {
        self.primitives
            .iter()
            .fold(BoundingBox::empty(), |acc, p| acc.union(&p.world_bounds(matrix)))
    }
}
