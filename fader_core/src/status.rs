//! Controller state and the events published to the owner.

/// Lifecycle of the seek controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No goal; positions are relayed as manual moves.
    Idle,
    /// Motor is driving toward the goal.
    Seeking,
    /// Arrived or cancelled; quiet until the cooldown elapses.
    Settling,
    /// Stall watchdog fired; quiet until the cooldown elapses.
    SafetyStopped,
}

/// Element of the outgoing event stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaderEvent {
    /// Idle position update (manual move or drift past the noise filter).
    Position(f32),
    /// Settled within the arrival threshold; goal cleared.
    Arrived { goal: f32, position: f32 },
    /// Knob stopped moving while driven; motor braked and goal cleared.
    SafetyStop { goal: f32, position: f32 },
    /// Goal withdrawn by the owner while seeking.
    Cancelled { position: f32 },
}

impl FaderEvent {
    pub fn position(&self) -> f32 {
        match *self {
            Self::Position(p)
            | Self::Arrived { position: p, .. }
            | Self::SafetyStop { position: p, .. }
            | Self::Cancelled { position: p } => p,
        }
    }
}
