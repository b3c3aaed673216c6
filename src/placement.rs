//! Placement State Machine
//!
//! ```text
//! Searching ──hit──▶ Previewing ──place()──▶ Placed
//!     ▲                  │
//!     └──────miss────────┘
//! ```
//!
//! `Placed` is terminal for the session; only [`PlacementMachine::reset`]
//! (session start/end) leaves it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlacementState {
    #[default]
    Searching,
    Previewing,
    Placed,
}

#[derive(Debug, Clone, Default)]
pub struct PlacementMachine {
    state: PlacementState,
}

impl PlacementMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> PlacementState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_placed(&self) -> bool {
        self.state == PlacementState::Placed
    }

    /// Whether the "place" affordance should be offered.
    #[inline]
    #[must_use]
    pub fn affordance_visible(&self) -> bool {
        self.state == PlacementState::Previewing
    }

    /// Feeds this frame's tracking outcome. Ignored once placed.
    /// Returns whether the state changed.
    pub fn on_tracking(&mut self, has_pose: bool) -> bool {
        let next = match (self.state, has_pose) {
            (PlacementState::Placed, _) => return false,
            (_, true) => PlacementState::Previewing,
            (_, false) => PlacementState::Searching,
        };
        let changed = next != self.state;
        self.state = next;
        changed
    }

    /// Commits the preview. Only succeeds from `Previewing` with an asset
    /// present; every other call is a no-op returning `false`.
    pub fn place(&mut self, asset_present: bool) -> bool {
        if !asset_present || self.state != PlacementState::Previewing {
            return false;
        }
        self.state = PlacementState::Placed;
        true
    }

    pub fn reset(&mut self) {
        self.state = PlacementState::Searching;
    }
}
