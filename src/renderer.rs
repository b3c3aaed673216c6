//! Rendering surface supplied by the host.
//!
//! The engine owns no GPU state. It keeps the scene graph and the camera
//! current and hands both to the host once per frame.

use crate::scene::{Camera, Scene};

pub trait Renderer {
    /// Resizes the drawing surface, in physical pixels.
    fn set_size(&mut self, width: u32, height: u32);

    /// Starts or stops the platform's per-frame callback.
    fn set_animation_loop(&mut self, enabled: bool);

    /// Draws one frame. Hidden nodes are skipped together with their subtree.
    fn render(&mut self, scene: &Scene, camera: &Camera);

    /// Releases every GPU/platform resource. Called once.
    fn dispose(&mut self);
}
