//! The press/move/release model behind interactive resizes.
//!
//! A separator is not a widget here: it is the boundary between two
//! visible neighbours of a container, addressed by `(container,
//! boundary index)`. This module owns only the lifecycle state machine;
//! the engine maps committed deltas onto the tree's growth routines.
//!
//! ```text
//! Idle -> Pressing -> Dragging -> Idle
//!    \--------> Idle (release before the drag threshold)
//! ```

use serde::{Deserialize, Serialize};

/// Pointer travel (along the drag axis) required before a press becomes
/// a drag.
pub const START_DRAG_DISTANCE: i32 = 4;

/// How move events are turned into layout changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// Every pointer move resizes the layout immediately.
    #[default]
    Eager,
    /// A rubber band follows the pointer; the layout changes once on
    /// release.
    Lazy,
}

/// Lifecycle state of one separator interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    Idle,
    /// Button down, threshold not yet crossed.
    Pressing { origin: i32, current: i32 },
    /// Threshold crossed; moves drive (or preview) the resize.
    Dragging { origin: i32, current: i32 },
}

/// What the caller should do after feeding an event to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEffect {
    /// Nothing to apply.
    None,
    /// Eager mode: apply this signed delta now.
    Resize { delta: i32 },
    /// Lazy mode: move the rubber band to this position.
    RubberBand { position: i32 },
    /// Apply the final position (lazy) or stop resizing (eager).
    Commit { position: i32 },
    /// Drop the pending delta and return to rest.
    Cancel,
}

/// State machine for one separator drag.
///
/// Positions are scalar coordinates along the container's orientation,
/// pre-clamped by the caller to the slack the neighbours can donate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeparatorDrag {
    state: DragState,
    mode: ResizeMode,
    start_drag_distance: i32,
}

impl SeparatorDrag {
    /// Start a machine at rest.
    #[must_use]
    pub fn new(mode: ResizeMode) -> Self {
        Self {
            state: DragState::Idle,
            mode,
            start_drag_distance: START_DRAG_DISTANCE,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> DragState {
        self.state
    }

    /// True while a drag is past the threshold.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Button pressed on the separator at `position`.
    pub fn press(&mut self, position: i32) -> DragEffect {
        match self.state {
            DragState::Idle => {
                self.state = DragState::Pressing {
                    origin: position,
                    current: position,
                };
                DragEffect::None
            }
            // A second press mid-interaction is pointer noise.
            DragState::Pressing { .. } | DragState::Dragging { .. } => DragEffect::None,
        }
    }

    /// Pointer moved to `position`.
    ///
    /// `button_down` is the platform's current button state. In lazy
    /// mode a move reporting the button up while dragging means the
    /// release event was lost; the machine commits the last known
    /// position rather than resize forever.
    pub fn moved(&mut self, position: i32, button_down: bool) -> DragEffect {
        match self.state {
            DragState::Idle => DragEffect::None,
            DragState::Pressing { origin, .. } => {
                if (position - origin).abs() < self.start_drag_distance {
                    self.state = DragState::Pressing {
                        origin,
                        current: position,
                    };
                    return DragEffect::None;
                }
                self.state = DragState::Dragging {
                    origin,
                    current: position,
                };
                match self.mode {
                    ResizeMode::Eager => DragEffect::Resize {
                        delta: position - origin,
                    },
                    ResizeMode::Lazy => DragEffect::RubberBand { position },
                }
            }
            DragState::Dragging { origin, current } => {
                if self.mode == ResizeMode::Lazy && !button_down {
                    self.state = DragState::Idle;
                    return DragEffect::Commit { position: current };
                }
                self.state = DragState::Dragging {
                    origin,
                    current: position,
                };
                match self.mode {
                    ResizeMode::Eager => DragEffect::Resize {
                        delta: position - current,
                    },
                    ResizeMode::Lazy => DragEffect::RubberBand { position },
                }
            }
        }
    }

    /// Button released at `position`.
    pub fn release(&mut self, position: i32) -> DragEffect {
        match self.state {
            DragState::Idle => DragEffect::None,
            DragState::Pressing { .. } => {
                self.state = DragState::Idle;
                DragEffect::None
            }
            DragState::Dragging { .. } => {
                self.state = DragState::Idle;
                DragEffect::Commit { position }
            }
        }
    }

    /// External cancellation (application quit, Escape): the pending
    /// delta is dropped.
    pub fn cancel(&mut self) -> DragEffect {
        let was_active = !matches!(self.state, DragState::Idle);
        self.state = DragState::Idle;
        if was_active {
            DragEffect::Cancel
        } else {
            DragEffect::None
        }
    }
}
