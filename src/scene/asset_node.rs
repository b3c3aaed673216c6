use glam::Vec3;

use crate::assets::prefab::Prefab;
use crate::scene::transform::Transform;
use crate::scene::{NodeHandle, Scene};
use crate::xr::Pose;

/// The placed asset.
///
/// `root` is the wrapper node the engine moves around; `content` is the
/// normalized glTF graph underneath it. Created hidden, owned by the engine
/// for one AR session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetNode {
    root: NodeHandle,
    content: Option<NodeHandle>,
}

impl AssetNode {
    /// Instantiates a normalized prefab into `scene`.
    ///
    /// The prefab's single root becomes the wrapper; it is forced hidden.
    pub fn instantiate(scene: &mut Scene, prefab: &Prefab) -> Self {
        let root = scene.instantiate(prefab);
        let content = scene
            .get_node(root)
            .and_then(|n| n.children().first().copied());

        if let Some(node) = scene.get_node_mut(root) {
            node.visible = false;
        }

        log::debug!("Asset instantiated ({} scene nodes)", scene.node_count());
        Self { root, content }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn content(&self) -> Option<NodeHandle> {
        self.content
    }

    #[must_use]
    pub fn transform<'a>(&self, scene: &'a Scene) -> Option<&'a Transform> {
        scene.get_node(self.root).map(|n| &n.transform)
    }

    pub fn transform_mut<'a>(&self, scene: &'a mut Scene) -> Option<&'a mut Transform> {
        scene.transform_mut(self.root)
    }

    #[must_use]
    pub fn position(&self, scene: &Scene) -> Vec3 {
        self.transform(scene).map_or(Vec3::ZERO, |t| t.position)
    }

    #[must_use]
    pub fn scale(&self, scene: &Scene) -> Vec3 {
        self.transform(scene).map_or(Vec3::ONE, |t| t.scale)
    }

    #[must_use]
    pub fn rotation_y(&self, scene: &Scene) -> f32 {
        self.transform(scene).map_or(0.0, Transform::rotation_y)
    }

    #[must_use]
    pub fn is_visible(&self, scene: &Scene) -> bool {
        scene.get_node(self.root).is_some_and(|n| n.visible)
    }

    pub fn set_visible(&self, scene: &mut Scene, visible: bool) {
        if let Some(node) = scene.get_node_mut(self.root) {
            node.visible = visible;
        }
    }

    /// Writes a tracked pose. Scale is left alone.
    pub fn apply_pose(&self, scene: &mut Scene, pose: &Pose) {
        if let Some(t) = scene.transform_mut(self.root) {
            t.position = pose.position;
            t.rotation = pose.orientation;
        }
    }

    /// Removes the wrapper and everything under it from the scene.
    pub fn destroy(self, scene: &mut Scene) {
        scene.remove_node(self.root);
    }
}
