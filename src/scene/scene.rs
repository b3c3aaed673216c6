use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::assets::prefab::Prefab;
use crate::resources::geometry::BoundingBox;
use crate::resources::mesh::Mesh;
use crate::scene::node::Node;
use crate::scene::transform::Transform;
use crate::scene::transform_system;
use crate::scene::{MeshKey, NodeHandle};

/// Scene graph container.
///
/// Pure data: nodes, their hierarchy and mesh components. Rendering is the
/// host's job; the engine only keeps the graph and its world matrices current.
#[derive(Debug, Default)]
pub struct Scene {
    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,
    pub meshes: SlotMap<MeshKey, Mesh>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Node management
    // ========================================================================

    pub fn create_node_with_name(&mut self, name: &str) -> NodeHandle {
        self.add_node(Node::with_name(name))
    }

    /// Adds a node at the root level.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    pub fn add_to_parent(&mut self, mut child: Node, parent: NodeHandle) -> NodeHandle {
        if !self.nodes.contains_key(parent) {
            log::warn!("Parent node not found, adding child at the root level");
            return self.add_node(child);
        }

        child.parent = Some(parent);
        let handle = self.nodes.insert(child);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(handle);
        }
        handle
    }

    /// Re-parents `child` under `parent`.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return;
        }
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            log::error!("Node not found during attach!");
            return;
        }

        self.detach_from_parent(child);

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.transform.mark_dirty();
        }
    }

    /// Removes a node and its whole subtree, including mesh components.
    /// Unknown handles are ignored.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        if !self.nodes.contains_key(handle) {
            return;
        }

        self.detach_from_parent(handle);

        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.remove(current) else {
                continue;
            };
            if let Some(mesh_key) = node.mesh {
                self.meshes.remove(mesh_key);
            }
            stack.extend(node.children);
        }
    }

    fn detach_from_parent(&mut self, handle: NodeHandle) {
        let parent = self.nodes.get(handle).and_then(|n| n.parent);

        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(parent)
                && let Some(i) = p.children.iter().position(|&x| x == handle)
            {
                p.children.remove(i);
            }
        } else if let Some(i) = self.root_nodes.iter().position(|&x| x == handle) {
            self.root_nodes.remove(i);
        }

        if let Some(node) = self.nodes.get_mut(handle) {
            node.parent = None;
            node.transform.mark_dirty();
        }
    }

    #[inline]
    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[inline]
    pub fn transform_mut(&mut self, handle: NodeHandle) -> Option<&mut Transform> {
        self.nodes.get_mut(handle).map(|n| &mut n.transform)
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `handle` and all of its ancestors are visible.
    #[must_use]
    pub fn is_visible_in_hierarchy(&self, handle: NodeHandle) -> bool {
        let mut current = Some(handle);
        while let Some(h) = current {
            let Some(node) = self.nodes.get(h) else {
                return false;
            };
            if !node.visible {
                return false;
            }
            current = node.parent;
        }
        true
    }

    // ========================================================================
    // Prefab instantiation
    // ========================================================================

    /// Instantiates a prefab under the scene root in one step.
    ///
    /// A prefab with a single root returns that root's handle; otherwise the
    /// roots are grouped under a new unnamed node.
    pub fn instantiate(&mut self, prefab: &Prefab) -> NodeHandle {
        let group = match prefab.root_indices.as_slice() {
            [_] => None,
            _ => Some(self.create_node_with_name("prefab_root")),
        };

        let mut mapping: FxHashMap<usize, NodeHandle> = FxHashMap::default();
        let mut first_root = None;

        // (prefab index, parent handle)
        let mut stack: Vec<(usize, Option<NodeHandle>)> = prefab
            .root_indices
            .iter()
            .rev()
            .map(|&i| (i, group))
            .collect();

        while let Some((index, parent)) = stack.pop() {
            let Some(source) = prefab.nodes.get(index) else {
                continue;
            };
            if mapping.contains_key(&index) {
                continue;
            }

            let mut node = Node::new();
            node.name.clone_from(&source.name);
            node.transform = Transform::from_trs(
                source.transform.position,
                source.transform.rotation,
                source.transform.scale,
            );
            node.visible = source.visible;
            node.mesh = source.mesh.clone().map(|m| self.meshes.insert(m));

            let handle = match parent {
                Some(p) => self.add_to_parent(node, p),
                None => self.add_node(node),
            };
            mapping.insert(index, handle);
            first_root.get_or_insert(handle);

            for &child in source.children_indices.iter().rev() {
                stack.push((child, Some(handle)));
            }
        }

        match (group, first_root) {
            (Some(g), _) => g,
            (None, Some(root)) => root,
            (None, None) => self.create_node_with_name("prefab_root"),
        }
    }

    // ========================================================================
    // Matrix update & queries
    // ========================================================================

    /// Updates world matrices of the whole scene. Call once per frame before
    /// rendering.
    pub fn update_matrix_world(&mut self) {
        transform_system::update_hierarchy_iterative(&mut self.nodes, &self.root_nodes);
    }

    pub fn update_subtree(&mut self, root: NodeHandle) {
        transform_system::update_subtree(&mut self.nodes, root);
    }

    /// World-space bounds of every vertex in the subtree rooted at `root`.
    ///
    /// Uses the cached world matrices; call [`update_matrix_world`](Self::update_matrix_world) first.
    #[must_use]
    pub fn world_bounding_box(&self, root: NodeHandle) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        let mut stack = vec![root];

        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else {
                continue;
            };
            if let Some(mesh) = node.mesh.and_then(|k| self.meshes.get(k)) {
                bbox = bbox.union(&mesh.world_bounds(node.world_matrix()));
            }
            stack.extend(node.children.iter().copied());
        }

        bbox
    }
}
