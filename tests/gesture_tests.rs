//! Gesture Tests
//!
//! Tests for:
//! - Mode transitions (start / end / cancel, finger count changes)
//! - One-finger drag on the horizontal plane
//! - Two-finger pinch scale (with clamping) and twist yaw, including
//!   continuous twists past a quarter turn
//! - Touch aggregation and NDC conversion

mod common;

use std::f32::consts::FRAC_PI_6;

use glam::{Quat, Vec2, Vec3};

use anchorage::gesture::{TouchTracker, to_ndc};
use anchorage::scene::{Camera, Transform};
use anchorage::settings::{ScaleRange, Viewport};
use anchorage::{GestureMode, GestureRecognizer, TouchEvent, TouchPhase, TouchPoint};

use common::{EPSILON, approx, approx_angle, approx_vec3};

const VIEWPORT: Viewport = Viewport::new(1280, 720);

fn event(phase: TouchPhase, points: &[(u64, f32, f32)]) -> TouchEvent {
    TouchEvent::new(
        phase,
        points
            .iter()
            .map(|&(id, x, y)| TouchPoint::new(id, Vec2::new(x, y))),
    )
}

struct Rig {
    recognizer: GestureRecognizer,
    target: Transform,
    camera: Camera,
}

impl Rig {
    fn new() -> Self {
        let mut target = Transform::new();
        target.position = Vec3::new(0.0, -1.0, -2.0);
        Self {
            recognizer: GestureRecognizer::new(ScaleRange::default()),
            target,
            camera: Camera::new_perspective(70.0, VIEWPORT.aspect(), 0.01, 20.0),
        }
    }

    fn send(&mut self, phase: TouchPhase, points: &[(u64, f32, f32)]) {
        self.recognizer.handle(
            &event(phase, points),
            Some(&mut self.target),
            &self.camera,
            VIEWPORT,
        );
    }

    /// Starts a pinch with two fingers 100 px apart on a horizontal line.
    fn start_pinch(&mut self) {
        self.send(TouchPhase::Start, &[(1, 600.0, 400.0)]);
        self.send(TouchPhase::Start, &[(1, 600.0, 400.0), (2, 700.0, 400.0)]);
    }
}

// ============================================================================
// Mode transitions
// ============================================================================

#[test]
fn one_finger_starts_drag() {
    let mut rig = Rig::new();
    rig.send(TouchPhase::Start, &[(1, 640.0, 500.0)]);
    assert_eq!(rig.recognizer.mode(), GestureMode::Drag);
    assert!(rig.recognizer.is_active());
    assert!(rig.recognizer.state().anchor.is_none());
}

#[test]
fn second_finger_switches_to_pinch_with_anchors() {
    let mut rig = Rig::new();
    rig.target.scale = Vec3::splat(1.5);
    rig.start_pinch();

    assert_eq!(rig.recognizer.mode(), GestureMode::Pinch);
    let anchor = rig.recognizer.state().anchor.unwrap();
    assert!(approx(anchor.distance, 100.0));
    assert!(approx(anchor.angle, 0.0));
    assert_eq!(anchor.scale, Vec3::splat(1.5));
    assert_eq!(rig.recognizer.state().active_touch_ids.len(), 2);
}

#[test]
fn third_finger_keeps_current_mode() {
    let mut rig = Rig::new();
    rig.start_pinch();
    let anchor = rig.recognizer.state().anchor;

    rig.send(
        TouchPhase::Start,
        &[(1, 600.0, 400.0), (2, 700.0, 400.0), (3, 100.0, 100.0)],
    );
    assert_eq!(rig.recognizer.mode(), GestureMode::Pinch);
    assert_eq!(rig.recognizer.state().anchor, anchor);
}

#[test]
fn lifting_one_of_two_fingers_falls_back_to_drag() {
    let mut rig = Rig::new();
    rig.start_pinch();

    rig.send(TouchPhase::End, &[(2, 700.0, 400.0)]);
    assert_eq!(rig.recognizer.mode(), GestureMode::Drag);
    assert!(rig.recognizer.state().anchor.is_none());

    rig.send(TouchPhase::End, &[]);
    assert_eq!(rig.recognizer.mode(), GestureMode::None);
    assert!(rig.recognizer.state().active_touch_ids.is_empty());
}

#[test]
fn cancel_with_no_fingers_resets() {
    let mut rig = Rig::new();
    rig.start_pinch();
    rig.send(TouchPhase::Cancel, &[]);
    assert_eq!(rig.recognizer.mode(), GestureMode::None);
    assert!(!rig.recognizer.is_active());
}

#[test]
fn start_and_move_without_target_do_nothing() {
    let mut recognizer = GestureRecognizer::default();
    let camera = Camera::default();

    recognizer.handle(&event(TouchPhase::Start, &[(1, 10.0, 10.0)]), None, &camera, VIEWPORT);
    assert_eq!(recognizer.mode(), GestureMode::None);

    recognizer.handle(&event(TouchPhase::Move, &[(1, 20.0, 10.0)]), None, &camera, VIEWPORT);
    assert_eq!(recognizer.mode(), GestureMode::None);
}

#[test]
fn end_is_processed_without_target() {
    let mut rig = Rig::new();
    rig.send(TouchPhase::Start, &[(1, 640.0, 500.0)]);

    rig.recognizer
        .handle(&event(TouchPhase::End, &[]), None, &rig.camera, VIEWPORT);
    assert_eq!(rig.recognizer.mode(), GestureMode::None);
}

// ============================================================================
// Drag
// ============================================================================

#[test]
fn drag_follows_the_ray_on_the_asset_plane() {
    let mut rig = Rig::new();
    let touch = Vec2::new(900.0, 600.0);
    rig.send(TouchPhase::Start, &[(1, 640.0, 360.0)]);
    rig.send(TouchPhase::Move, &[(1, touch.x, touch.y)]);

    let ndc = to_ndc(touch, VIEWPORT).unwrap();
    let ray = rig.camera.ray_from_ndc(ndc);
    let expected = ray
        .intersect_plane(&anchorage::Plane::horizontal(-1.0))
        .unwrap();

    assert!(approx_vec3(rig.target.position, expected));
    assert!(approx(rig.target.position.y, -1.0), "height is preserved");
    assert!(rig.target.position.x > 0.0, "right of centre moves right");
}

#[test]
fn drag_above_the_horizon_leaves_asset_alone() {
    let mut rig = Rig::new();
    rig.send(TouchPhase::Start, &[(1, 640.0, 360.0)]);
    // Upper half of the screen: the ray never reaches a plane below the camera.
    rig.send(TouchPhase::Move, &[(1, 640.0, 100.0)]);
    assert_eq!(rig.target.position, Vec3::new(0.0, -1.0, -2.0));
}

#[test]
fn two_finger_move_does_not_drag() {
    let mut rig = Rig::new();
    rig.send(TouchPhase::Start, &[(1, 640.0, 500.0)]);
    // Mode is still Drag, but the event carries two touches.
    rig.send(TouchPhase::Move, &[(1, 900.0, 600.0), (2, 100.0, 600.0)]);
    assert_eq!(rig.target.position, Vec3::new(0.0, -1.0, -2.0));
}

// ============================================================================
// Pinch
// ============================================================================

#[test]
fn spreading_fingers_doubles_scale() {
    let mut rig = Rig::new();
    rig.start_pinch();
    rig.send(TouchPhase::Move, &[(1, 550.0, 400.0), (2, 750.0, 400.0)]);
    assert!(approx_vec3(rig.target.scale, Vec3::splat(2.0)));
}

#[test]
fn scale_is_relative_to_the_anchor() {
    let mut rig = Rig::new();
    rig.target.scale = Vec3::new(0.5, 1.0, 2.0);
    rig.start_pinch();
    rig.send(TouchPhase::Move, &[(1, 600.0, 400.0), (2, 750.0, 400.0)]);
    assert!(approx_vec3(rig.target.scale, Vec3::new(0.75, 1.5, 3.0)));
}

#[test]
fn scale_is_clamped_per_axis() {
    let mut rig = Rig::new();
    rig.start_pinch();

    rig.send(TouchPhase::Move, &[(1, 0.0, 400.0), (2, 1000.0, 400.0)]);
    assert!(approx_vec3(rig.target.scale, Vec3::splat(5.0)));

    rig.send(TouchPhase::Move, &[(1, 600.0, 400.0), (2, 601.0, 400.0)]);
    assert!(approx_vec3(rig.target.scale, Vec3::splat(0.05)));
}

#[test]
fn twisting_fingers_rotates_about_y() {
    let mut rig = Rig::new();
    rig.start_pinch();

    // Rotate the second finger 30 degrees around the first.
    let (sin, cos) = FRAC_PI_6.sin_cos();
    rig.send(
        TouchPhase::Move,
        &[(1, 600.0, 400.0), (2, 600.0 + 100.0 * cos, 400.0 + 100.0 * sin)],
    );

    assert!(approx(rig.target.rotation_y(), -FRAC_PI_6));
    assert!(approx_vec3(rig.target.scale, Vec3::ONE));
}

/// Positions the second finger at `angle` around the first, 100 px away.
fn twisted(angle: f32) -> [(u64, f32, f32); 2] {
    let (sin, cos) = angle.sin_cos();
    [(1, 600.0, 400.0), (2, 600.0 + 100.0 * cos, 400.0 + 100.0 * sin)]
}

#[test]
fn continuous_twist_tracks_yaw_past_a_quarter_turn() {
    let mut rig = Rig::new();
    rig.start_pinch();

    // Counter-clockwise on screen, so yaw climbs from 0 through 90 degrees.
    for step in 1..=8 {
        let angle = -0.35 * step as f32;
        rig.send(TouchPhase::Move, &twisted(angle));

        let expected = -angle;
        assert!(
            approx_angle(rig.target.rotation_y(), expected),
            "step {step}: yaw {} != {expected}",
            rig.target.rotation_y()
        );
        assert!(approx_vec3(
            rig.target.rotation * Vec3::X,
            Quat::from_rotation_y(expected) * Vec3::X
        ));
    }
}

#[test]
fn twist_anchored_past_a_quarter_turn_keeps_tilt() {
    let tilt = Quat::from_rotation_x(0.3);
    let mut rig = Rig::new();
    rig.target.rotation = Quat::from_rotation_y(2.5) * tilt;
    rig.start_pinch();

    let anchor = rig.recognizer.state().anchor.unwrap();
    assert!(approx(anchor.rotation_y, 2.5));

    for (angle, expected) in [(0.4, 2.1), (-0.3, 2.8), (-0.9, 3.4)] {
        rig.send(TouchPhase::Move, &twisted(angle));
        assert!(approx_angle(rig.target.rotation_y(), expected), "angle {angle}");
        assert!(rig.target.tilt().dot(tilt).abs() > 1.0 - EPSILON);
    }
}

#[test]
fn coincident_fingers_do_not_scale() {
    let mut rig = Rig::new();
    rig.send(TouchPhase::Start, &[(1, 600.0, 400.0)]);
    rig.send(TouchPhase::Start, &[(1, 600.0, 400.0), (2, 600.0, 400.0)]);
    rig.send(TouchPhase::Move, &[(1, 500.0, 400.0), (2, 700.0, 400.0)]);
    assert_eq!(rig.target.scale, Vec3::ONE);
}

// ============================================================================
// Touch aggregation & NDC
// ============================================================================

#[test]
fn tracker_reports_remaining_touches() {
    let mut tracker = TouchTracker::new();

    let e = tracker.update(1, TouchPhase::Start, Vec2::new(1.0, 1.0));
    assert_eq!(e.touch_count(), 1);

    let e = tracker.update(2, TouchPhase::Start, Vec2::new(5.0, 5.0));
    assert_eq!(e.touch_count(), 2);

    let e = tracker.update(1, TouchPhase::Move, Vec2::new(2.0, 2.0));
    assert_eq!(e.touches[0].position, Vec2::new(2.0, 2.0));

    let e = tracker.update(1, TouchPhase::End, Vec2::new(2.0, 2.0));
    assert_eq!(e.phase, TouchPhase::End);
    assert_eq!(e.touch_count(), 1);
    assert_eq!(e.touches[0].id, 2);

    tracker.clear();
    assert!(tracker.active().is_empty());
}

#[test]
fn ndc_maps_corners_and_centre() {
    assert_eq!(to_ndc(Vec2::new(640.0, 360.0), VIEWPORT), Some(Vec2::ZERO));
    assert_eq!(to_ndc(Vec2::new(0.0, 0.0), VIEWPORT), Some(Vec2::new(-1.0, 1.0)));
    assert_eq!(to_ndc(Vec2::new(1280.0, 720.0), VIEWPORT), Some(Vec2::new(1.0, -1.0)));
    assert_eq!(to_ndc(Vec2::ZERO, Viewport::new(0, 720)), None);
}
