//! Exposure decision state machine
//!
//! # States
//!
//! - `Idle`: auto-exposure is off
//! - `Sampling`: normal iterative remapping
//! - `Widening`: both ends of the scale saturated, searching a wider window
//! - `Converged`: stable; frames are ignored until something re-arms the loop
//!
//! # Step
//!
//! For each analysed frame while searching:
//!
//! 1. The trend is falling when `observed_max - last_max_intensity < 0` (an
//!    unset last max never counts), or when the previous step lowered `u_max`
//!    relative to the step before it.
//! 2. Saturated (`min == 0 && max == 255`) with a falling trend: converge and
//!    leave the mapping alone. Saturated otherwise: double `spread` and push the
//!    extrema outward by it.
//! 3. Map the (possibly widened) extrema back to elevations through the
//!    current mapping, clamp to physical bounds, and pad a collapsed range.
//!
//! `last_max_intensity` stores the effective maximum of the step, so a widened
//! value (e.g. 257) followed by another saturated frame reads as a falling
//! trend. The `u_max` trend covers terrain that fits the window: a frame that
//! saturates right after the window was tightened around it is well exposed.

use crate::config::ElevationLimits;
use crate::exposure::histogram::ObservedExtrema;
use crate::exposure::mapping::ElevationMapping;
use tracing::debug;

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExposurePhase {
    /// Auto-exposure off
    #[default]
    Idle,
    /// Iterative remapping
    Sampling,
    /// Expanding the elevation window after saturation
    Widening,
    /// Stable exposure reached
    Converged,
}

impl ExposurePhase {
    /// True while frames drive the mapping
    pub fn is_searching(self) -> bool {
        matches!(self, Self::Sampling | Self::Widening)
    }
}

impl std::fmt::Display for ExposurePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Sampling => "sampling",
            Self::Widening => "widening",
            Self::Converged => "converged",
        };
        f.write_str(name)
    }
}

/// Controller state carried across frames
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureState {
    pub(crate) phase: ExposurePhase,
    pub(crate) spread: u32,
    pub(crate) last_max_intensity: Option<i64>,
    /// `u_max` written by the previous step of this search
    pub(crate) last_u_max: Option<f64>,
    /// Change the previous step made to `u_max`; unset until two steps ran
    pub(crate) u_max_delta: Option<f64>,
    pub(crate) include_negative_elevations: bool,
    pub(crate) falling_streak: u32,
}

impl ExposureState {
    /// Spread a convergence leaves behind for the next activation
    pub const RESTART_SPREAD: u32 = 2;

    /// Fresh idle state
    pub fn new(include_negative_elevations: bool) -> Self {
        Self {
            phase: ExposurePhase::Idle,
            spread: 1,
            last_max_intensity: None,
            last_u_max: None,
            u_max_delta: None,
            include_negative_elevations,
            falling_streak: 0,
        }
    }

    /// Current phase
    pub fn phase(&self) -> ExposurePhase {
        self.phase
    }

    /// Current widening multiplier
    pub fn spread(&self) -> u32 {
        self.spread
    }

    /// Effective maximum intensity of the previous step, if any
    pub fn last_max_intensity(&self) -> Option<i64> {
        self.last_max_intensity
    }

    /// Change the previous step made to `u_max`, once two steps have run
    pub fn u_max_delta(&self) -> Option<f64> {
        self.u_max_delta
    }

    /// True when the previous step tightened the window from above
    fn u_max_falling(&self) -> bool {
        self.u_max_delta.is_some_and(|delta| delta < 0.0)
    }

    fn clear_trend(&mut self) {
        self.last_max_intensity = None;
        self.last_u_max = None;
        self.u_max_delta = None;
        self.falling_streak = 0;
    }

    /// Whether mapped minimums may go below sea level
    pub fn include_negative_elevations(&self) -> bool {
        self.include_negative_elevations
    }

    /// Start a brand new search (auto-exposure switched on)
    pub(crate) fn arm(&mut self) {
        self.phase = ExposurePhase::Sampling;
        self.spread = 1;
        self.clear_trend();
    }

    /// Restart the search after a perturbation, keeping the current spread
    pub(crate) fn rearm(&mut self) {
        self.phase = ExposurePhase::Sampling;
        self.clear_trend();
    }

    /// Switch auto-exposure off
    pub(crate) fn halt(&mut self) {
        self.phase = ExposurePhase::Idle;
        self.falling_streak = 0;
    }
}

/// Result of one policy step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicyOutcome {
    /// Apply this mapping and redraw
    Remap {
        /// New elevation window
        mapping: ElevationMapping,
        /// Elevation range over view width, from the mapping in effect before the step
        scale_factor: Option<f64>,
    },
    /// Exposure is stable; nothing to apply
    Converged,
    /// The controller is not searching; the frame was ignored
    Halted,
}

/// Decides the next mapping from observed extrema
#[derive(Debug, Clone)]
pub struct ExposurePolicy {
    limits: ElevationLimits,
    convergence_frames: u32,
}

impl Default for ExposurePolicy {
    fn default() -> Self {
        Self::new(ElevationLimits::default(), 1)
    }
}

impl ExposurePolicy {
    /// Create a policy with physical clamps and the number of consecutive
    /// falling-trend saturated frames required to converge (0 is treated as 1)
    pub fn new(limits: ElevationLimits, convergence_frames: u32) -> Self {
        Self {
            limits,
            convergence_frames: convergence_frames.max(1),
        }
    }

    /// Physical clamps in use
    pub fn limits(&self) -> &ElevationLimits {
        &self.limits
    }

    /// Run one step of the state machine
    pub fn step(
        &self,
        state: &mut ExposureState,
        observed: &ObservedExtrema,
        current: ElevationMapping,
        view_width_meters: f64,
    ) -> PolicyOutcome {
        if !state.phase.is_searching() {
            return PolicyOutcome::Halted;
        }

        let mut min = i64::from(observed.min);
        let mut max = i64::from(observed.max);
        let falling = state.last_max_intensity.is_some_and(|last| max - last < 0)
            || state.u_max_falling();

        if observed.is_saturated() {
            state.falling_streak = if falling { state.falling_streak + 1 } else { 0 };

            if state.falling_streak >= self.convergence_frames {
                debug!(
                    "Saturated with falling trend (last max {:?}, u_max delta {:?}), converged",
                    state.last_max_intensity, state.u_max_delta
                );
                state.phase = ExposurePhase::Converged;
                state.spread = ExposureState::RESTART_SPREAD;
                state.last_max_intensity = Some(max);
                state.falling_streak = 0;
                return PolicyOutcome::Converged;
            }

            state.phase = ExposurePhase::Widening;
            state.spread = state.spread.saturating_mul(2);
            let spread = i64::from(state.spread);
            max += spread;
            min -= spread;
            debug!("Saturated, widening by {} to [{}, {}]", spread, min, max);
        } else {
            state.phase = ExposurePhase::Sampling;
            state.falling_streak = 0;
        }

        state.last_max_intensity = Some(max);

        let mapping = self.remap(min, max, current, state.include_negative_elevations);
        state.u_max_delta = state.last_u_max.map(|previous| mapping.u_max - previous);
        state.last_u_max = Some(mapping.u_max);

        PolicyOutcome::Remap {
            mapping,
            scale_factor: scale_factor(current, view_width_meters),
        }
    }

    /// Map an intensity window back to elevations through `current`
    ///
    /// The result is clamped to the physical limits (and to sea level unless
    /// negative elevations are included); a collapsed or inverted window gets
    /// `u_max = u_min + padding`.
    pub fn remap(
        &self,
        min_intensity: i64,
        max_intensity: i64,
        current: ElevationMapping,
        include_negative_elevations: bool,
    ) -> ElevationMapping {
        let mut u_min = current
            .elevation_at(min_intensity as f64)
            .max(self.limits.min_elevation);
        let mut u_max = current
            .elevation_at(max_intensity as f64)
            .min(self.limits.max_elevation);

        if !include_negative_elevations {
            u_min = u_min.max(0.0);
        }

        if u_max <= u_min {
            u_max = u_min + self.limits.degenerate_padding;
        }

        ElevationMapping { u_min, u_max }
    }
}

/// Vertical exaggeration of the rendered relief: elevation range per meter of view width
pub fn scale_factor(mapping: ElevationMapping, view_width_meters: f64) -> Option<f64> {
    (view_width_meters.is_finite() && view_width_meters > 0.0)
        .then(|| mapping.range() / view_width_meters)
}
