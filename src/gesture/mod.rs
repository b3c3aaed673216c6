//! Gesture Recognizer
//!
//! Turns raw touch lists into transforms on the placed asset:
//!
//! - one finger drags the asset across the horizontal plane at its height
//! - two fingers scale (pinch distance) and yaw (twist angle) it
//!
//! Anchors are captured when the second finger lands; no smoothing is applied.

pub mod touch;

pub use touch::{TouchEvent, TouchPhase, TouchPoint, TouchTracker};

use glam::{Quat, Vec2, Vec3};
use rustc_hash::FxHashSet;

use crate::resources::geometry::Plane;
use crate::scene::camera::Camera;
use crate::scene::transform::Transform;
use crate::settings::{ScaleRange, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureMode {
    #[default]
    None,
    Drag,
    Pinch,
}

/// Values captured when a pinch begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchAnchor {
    pub distance: f32,
    pub scale: Vec3,
    pub angle: f32,
    pub rotation_y: f32,
    /// Non-yaw part of the rotation, reapplied under every new yaw.
    pub tilt: Quat,
}

#[derive(Debug, Clone, Default)]
pub struct GestureState {
    pub mode: GestureMode,
    pub active_touch_ids: FxHashSet<u64>,
    pub anchor: Option<PinchAnchor>,
}

#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    state: GestureState,
    scale_range: ScaleRange,
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(ScaleRange::default())
    }
}

impl GestureRecognizer {
    #[must_use]
    pub fn new(scale_range: ScaleRange) -> Self {
        Self {
            state: GestureState::default(),
            scale_range,
        }
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> GestureMode {
        self.state.mode
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Whether a drag or pinch is in progress; tracked poses must not fight it.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.mode != GestureMode::None
    }

    pub fn reset(&mut self) {
        self.state = GestureState::default();
    }

    /// Handles one touch event. `target` is the asset transform, `None` when
    /// no asset is loaded.
    pub fn handle(
        &mut self,
        event: &TouchEvent,
        target: Option<&mut Transform>,
        camera: &Camera,
        viewport: Viewport,
    ) {
        match event.phase {
            TouchPhase::Start => {
                if let Some(target) = target {
                    self.on_start(event, target);
                }
            }
            TouchPhase::Move => {
                if let Some(target) = target {
                    self.on_move(event, target, camera, viewport);
                }
            }
            TouchPhase::End | TouchPhase::Cancel => self.on_end(event),
        }
    }

    fn on_start(&mut self, event: &TouchEvent, target: &Transform) {
        self.track_ids(event);

        match event.touches.as_slice() {
            [_] => {
                self.state.mode = GestureMode::Drag;
                self.state.anchor = None;
            }
            [a, b] => {
                let (distance, angle) = span(a.position, b.position);
                self.state.mode = GestureMode::Pinch;
                self.state.anchor = Some(PinchAnchor {
                    distance,
                    scale: target.scale,
                    angle,
                    rotation_y: target.rotation_y(),
                    tilt: target.tilt(),
                });
            }
            _ => {}
        }
    }

    fn on_move(
        &mut self,
        event: &TouchEvent,
        target: &mut Transform,
        camera: &Camera,
        viewport: Viewport,
    ) {
        match (self.state.mode, event.touches.as_slice()) {
            (GestureMode::Drag, [touch]) => {
                let Some(ndc) = to_ndc(touch.position, viewport) else {
                    return;
                };
                let ray = camera.ray_from_ndc(ndc);
                let plane = Plane::horizontal(target.position.y);
                if let Some(point) = ray.intersect_plane(&plane) {
                    target.position = point;
                }
            }
            (GestureMode::Pinch, [a, b, ..]) => {
                let Some(anchor) = self.state.anchor else {
                    return;
                };
                let (distance, angle) = span(a.position, b.position);

                if anchor.distance > 0.0 {
                    let factor = distance / anchor.distance;
                    let range = self.scale_range;
                    target.scale = (anchor.scale * factor).map(|s| range.clamp(s));
                }
                let yaw = anchor.rotation_y - (angle - anchor.angle);
                target.rotation = Quat::from_rotation_y(yaw) * anchor.tilt;
            }
            _ => {}
        }
    }

    fn on_end(&mut self, event: &TouchEvent) {
        self.track_ids(event);

        match event.touch_count() {
            0 => self.reset(),
            1 => {
                self.state.mode = GestureMode::Drag;
                self.state.anchor = None;
            }
            _ => {}
        }
    }

    fn track_ids(&mut self, event: &TouchEvent) {
        self.state.active_touch_ids.clear();
        self.state
            .active_touch_ids
            .extend(event.touches.iter().map(|t| t.id));
    }
}

/// Distance and `atan2(dy, dx)` angle between two touch points.
fn span(a: Vec2, b: Vec2) -> (f32, f32) {
    let d = b - a;
    (d.length(), d.y.atan2(d.x))
}

/// Pixel position to normalized device coordinates (y up).
#[must_use]
pub fn to_ndc(position: Vec2, viewport: Viewport) -> Option<Vec2> {
    if viewport.width == 0 || viewport.height == 0 {
        return None;
    }
    Some(Vec2::new(
        position.x / viewport.width as f32 * 2.0 - 1.0,
        -(position.y / viewport.height as f32) * 2.0 + 1.0,
    ))
}
