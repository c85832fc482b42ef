//! Visibility / power state machine
//!
//! The face is either hidden, visible and interactive, or visible and
//! ambient. Which redraw timer runs is a function of the state alone.

/// Power states of the watch face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Screen off, nothing is drawn
    Hidden,
    /// Full detail, redrawn every second
    VisibleInteractive,
    /// Reduced detail, redrawn on the minute tick
    VisibleAmbient,
}

/// Redraw timer selected by the power state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerMode {
    /// No periodic redraw
    Stopped,
    /// Periodic redraw every `interactive_update_ms`
    Interactive,
    /// Periodic redraw on the minute tick
    MinuteTick,
}

impl PowerState {
    /// Derive the state from the visibility and ambient flags
    pub fn from_flags(visible: bool, ambient: bool) -> Self {
        match (visible, ambient) {
            (false, _) => PowerState::Hidden,
            (true, false) => PowerState::VisibleInteractive,
            (true, true) => PowerState::VisibleAmbient,
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, PowerState::Hidden)
    }

    /// Timer that should be running in this state
    pub fn timer(&self) -> TimerMode {
        match self {
            PowerState::Hidden => TimerMode::Stopped,
            PowerState::VisibleInteractive => TimerMode::Interactive,
            PowerState::VisibleAmbient => TimerMode::MinuteTick,
        }
    }
}

/// Delay until the next multiple of `period_ms`
///
/// Keeps redraws aligned to wall-clock second and minute boundaries. For a
/// non-zero period the result is in `1..=period_ms`.
pub fn next_tick_delay_ms(now_ms: u64, period_ms: u64) -> u64 {
    if period_ms == 0 {
        return 0;
    }
    period_ms - (now_ms % period_ms)
}
