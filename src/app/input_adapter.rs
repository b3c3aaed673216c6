//! Winit input adapter
//!
//! Translates winit touch events into the engine's platform-agnostic
//! [`TouchEvent`]s.

use glam::Vec2;
use winit::event::{Touch, TouchPhase as WinitTouchPhase, WindowEvent};

use crate::gesture::{TouchEvent, TouchPhase, TouchTracker};

#[must_use]
pub fn translate_touch_phase(phase: WinitTouchPhase) -> TouchPhase {
    match phase {
        WinitTouchPhase::Started => TouchPhase::Start,
        WinitTouchPhase::Moved => TouchPhase::Move,
        WinitTouchPhase::Ended => TouchPhase::End,
        WinitTouchPhase::Cancelled => TouchPhase::Cancel,
    }
}

/// Feeds one winit touch into `tracker`, returning the event with the full
/// list of touches still down.
pub fn translate_touch(tracker: &mut TouchTracker, touch: &Touch) -> TouchEvent {
    let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
    tracker.update(touch.id, translate_touch_phase(touch.phase), position)
}

/// Returns a [`TouchEvent`] for `WindowEvent::Touch`, `None` for anything else.
pub fn process_window_event(tracker: &mut TouchTracker, event: &WindowEvent) -> Option<TouchEvent> {
    match event {
        WindowEvent::Touch(touch) => Some(translate_touch(tracker, touch)),
        _ => None,
    }
}
