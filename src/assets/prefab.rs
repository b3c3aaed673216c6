
use glam::Affine3A;

use crate::resources::geometry::BoundingBox;
use crate::resources::mesh::Mesh;
use crate::scene::transform::Transform;

/// Prefab node: plain data, children referenced by index.
#[derive(Debug, Clone)]
pub struct PrefabNode {
    pub name: Option<String>,
    pub transform: Transform,
    /// Indices into `Prefab::nodes`.
    pub children_indices: Vec<usize>,
    pub mesh: Option<Mesh>,
    pub visible: bool,
}

impl PrefabNode {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            transform: Transform::new(),
            children_indices: Vec::new(),
            mesh: None,
            visible: true,
        }
    }

    #[must_use]
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new()
        }
    }
}

impl Default for PrefabNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Intermediate scene graph produced by the loader.
///
/// A `Prefab` holds no scene handles, so it can be built on a worker thread
/// and handed to the frame loop in one piece; `Scene::instantiate` turns it
/// into live nodes.
#[derive(Debug, Clone, Default)]
pub struct Prefab {
    /// Flattened node storage.
    pub nodes: Vec<PrefabNode>,
    /// Indices of the top-level nodes.
    pub root_indices: Vec<usize>,
}

impl Prefab {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a node and returns its index.
    pub fn push(&mut self, node: PrefabNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Depth-first walk from the roots yielding each reachable node with its
    /// world matrix. A node reachable twice (malformed input) is visited once.
    pub fn walk(&self, mut visit: impl FnMut(usize, &PrefabNode, &Affine3A)) {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<(usize, Affine3A)> = self
            .root_indices
            .iter()
            .rev()
            .map(|&i| (i, Affine3A::IDENTITY))
            .collect();

        while let Some((index, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            if std::mem::replace(&mut visited[index], true) {
                continue;
            }

            let t = &node.transform;
            let world = parent_world
                * Affine3A::from_scale_rotation_translation(t.scale, t.rotation, t.position);
            visit(index, node, &world);

            for &child in node.children_indices.iter().rev() {
                stack.push((child, world));
            }
        }
    }

    /// World-space bounds of every vertex reachable from the roots.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        self.walk(|_, node, world| {
            if let Some(mesh) = &node.mesh {
                bbox = bbox.union(&mesh.world_bounds(world));
            }
        });
        bbox
    }
}
