//! Scene Graph
//!
//! Node hierarchy and components:
//! - Node: scene node with parent/child links
//! - Transform: position, rotation and scale with dirty tracking
//! - Scene: slotmap-backed container
//! - Camera: perspective camera driven by the viewer pose
//! - AssetNode: the placed asset (wrapper + normalized content)
//! - TransformSystem: world matrix propagation

pub mod asset_node;
pub mod camera;
pub mod node;
pub mod scene;
pub mod transform;
pub mod transform_system;

pub use asset_node::AssetNode;
pub use camera::Camera;
pub use node::Node;
pub use scene::Scene;
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct MeshKey;
}
