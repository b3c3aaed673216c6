//! Platform-agnostic touch input.

use glam::Vec2;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// One finger on the screen, position in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: u64,
    pub position: Vec2,
}

impl TouchPoint {
    #[must_use]
    pub const fn new(id: u64, position: Vec2) -> Self {
        Self { id, position }
    }
}

/// A touch event carrying every touch still on the screen after it, the way
/// browsers report `TouchEvent.touches`.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub touches: SmallVec<[TouchPoint; 4]>,
}

impl TouchEvent {
    pub fn new(phase: TouchPhase, touches: impl IntoIterator<Item = TouchPoint>) -> Self {
        Self {
            phase,
            touches: touches.into_iter().collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn touch_count(&self) -> usize {
        self.touches.len()
    }
}

/// Folds per-finger updates (what most windowing systems deliver) into
/// [`TouchEvent`]s with the full active list.
#[derive(Debug, Clone, Default)]
pub struct TouchTracker {
    active: SmallVec<[TouchPoint; 4]>,
}

impl TouchTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, id: u64, phase: TouchPhase, position: Vec2) -> TouchEvent {
        let existing = self.active.iter().position(|t| t.id == id);

        match (phase, existing) {
            (TouchPhase::Start | TouchPhase::Move, Some(i)) => self.active[i].position = position,
            (TouchPhase::Start | TouchPhase::Move, None) => {
                self.active.push(TouchPoint::new(id, position));
            }
            (TouchPhase::End | TouchPhase::Cancel, Some(i)) => {
                self.active.remove(i);
            }
            (TouchPhase::End | TouchPhase::Cancel, None) => {}
        }

        TouchEvent {
            phase,
            touches: self.active.clone(),
        }
    }

    #[must_use]
    pub fn active(&self) -> &[TouchPoint] {
        &self.active
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}
