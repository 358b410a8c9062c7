//! Lifecycle management for builder transitions.
//!
//! A lifecycle drives one contribution through up to three phases:
//! over (transition toward the target), hold (sustain it), revert (unwind
//! back out). Transitions are strictly forward; phases with no duration are
//! skipped, and a single advance can cross several instantaneous phases.
//! The machine is driven entirely by a per-frame `Instant` — it never reads
//! the clock itself.

use std::time::Instant;

use core_model::{BuilderConfig, Easing, Phase};

pub mod animate;

/// Progress snapshot returned by [`Lifecycle::advance`].
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    /// Phase after advancing; `None` once the lifecycle has completed.
    pub phase: Option<Phase>,
    /// Eased progress within the current phase, in `[0, 1]`. Hold reports 1.
    pub progress: f64,
    /// Phases left during this advance, oldest first. Callback dispatch keys
    /// off this so a late tick that crosses over *and* hold fires both.
    pub crossed: Vec<Phase>,
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    over_ms: Option<f64>,
    over_easing: Easing,
    hold_ms: Option<f64>,
    revert_ms: Option<f64>,
    revert_easing: Easing,
    phase: Option<Phase>,
    phase_start: Option<Instant>,
    started: bool,
}

impl Lifecycle {
    pub fn from_config(config: &BuilderConfig) -> Self {
        Self {
            over_ms: config.over_ms,
            over_easing: config.over_easing,
            hold_ms: config.hold_ms,
            revert_ms: config.revert_ms,
            revert_easing: config.revert_easing,
            phase: None,
            phase_start: None,
            started: false,
        }
    }

    /// Begin at the first phase with a non-zero duration. A lifecycle with
    /// no durations at all still enters `over` so that the first advance
    /// walks it to completion and reports the crossings.
    fn start(&mut self, now: Instant) {
        self.started = true;
        self.phase_start = Some(now);
        self.phase = if positive(self.over_ms) {
            Some(Phase::Over)
        } else if positive(self.hold_ms) {
            Some(Phase::Hold)
        } else if positive(self.revert_ms) {
            Some(Phase::Revert)
        } else {
            Some(Phase::Over)
        };
    }

    /// Advance to `now`, crossing as many phase boundaries as the elapsed
    /// time covers.
    pub fn advance(&mut self, now: Instant) -> Advance {
        if !self.started {
            self.start(now);
        }
        let mut crossed = Vec::new();
        loop {
            let Some(phase) = self.phase else {
                return Advance { phase: None, progress: 1.0, crossed };
            };
            let start = self.phase_start.unwrap_or(now);
            let elapsed_ms = now.saturating_duration_since(start).as_secs_f64() * 1000.0;
            let phase_ms = self.duration_of(phase).unwrap_or(0.0);

            if elapsed_ms >= phase_ms {
                crossed.push(phase);
                self.step_forward(now);
                continue;
            }

            let progress = match phase {
                Phase::Hold => 1.0,
                Phase::Over => self.over_easing.apply(elapsed_ms / phase_ms),
                Phase::Revert => self.revert_easing.apply(elapsed_ms / phase_ms),
            };
            return Advance { phase: Some(phase), progress, crossed };
        }
    }

    /// Peek at the current phase/progress without mutating (used by reads
    /// between ticks). Equivalent to `advance` on a clone.
    pub fn probe(&self, now: Instant) -> (Option<Phase>, f64) {
        let mut copy = self.clone();
        let adv = copy.advance(now);
        (adv.phase, adv.progress)
    }

    fn step_forward(&mut self, now: Instant) {
        self.phase_start = Some(now);
        self.phase = match self.phase {
            Some(Phase::Over) => {
                if positive(self.hold_ms) {
                    Some(Phase::Hold)
                } else if positive(self.revert_ms) {
                    Some(Phase::Revert)
                } else {
                    None
                }
            }
            Some(Phase::Hold) => {
                if positive(self.revert_ms) {
                    Some(Phase::Revert)
                } else {
                    None
                }
            }
            Some(Phase::Revert) | None => None,
        };
    }

    /// Force the revert phase to begin at `now`, regardless of current
    /// phase. Used by group-level revert and by `stop` handoffs. A completed
    /// lifecycle restarts into revert.
    pub fn trigger_revert(&mut self, now: Instant, revert_ms: Option<f64>, easing: Easing) {
        if let Some(ms) = revert_ms {
            self.revert_ms = Some(ms);
        } else if self.revert_ms.is_none() {
            self.revert_ms = Some(0.0);
        }
        self.revert_easing = easing;
        self.started = true;
        self.phase = Some(Phase::Revert);
        self.phase_start = Some(now);
        tracing::trace!(target: "rig.lifecycle", revert_ms = ?self.revert_ms, "revert_triggered");
    }

    /// Lengthen the hold phase. Used by the `extend` admission behavior to
    /// stretch an in-flight builder instead of admitting a duplicate.
    pub fn extend_hold(&mut self, add_ms: f64) {
        self.hold_ms = Some(self.hold_ms.unwrap_or(0.0) + add_ms.max(0.0));
    }

    fn duration_of(&self, phase: Phase) -> Option<f64> {
        match phase {
            Phase::Over => self.over_ms,
            Phase::Hold => self.hold_ms,
            Phase::Revert => self.revert_ms,
        }
    }

    pub fn has_any_phase(&self) -> bool {
        positive(self.over_ms) || positive(self.hold_ms) || self.revert_ms.is_some()
    }

    pub fn is_complete(&self) -> bool {
        if !self.has_any_phase() {
            return true;
        }
        self.started && self.phase.is_none()
    }

    /// True iff the lifecycle completed through an explicitly configured
    /// revert phase (a zero-duration revert counts). This is the signal that
    /// completion must not bake.
    pub fn has_reverted(&self) -> bool {
        self.started && self.phase.is_none() && self.revert_ms.is_some()
    }

    pub fn is_reverting(&self) -> bool {
        self.phase == Some(Phase::Revert)
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.phase, Some(Phase::Over | Phase::Revert))
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Removal policy once complete: anonymous builders go as soon as they
    /// finish; named builders persist unless they reverted.
    pub fn should_be_removed(&self, is_user_layer: bool) -> bool {
        if !self.is_complete() {
            return false;
        }
        if self.has_reverted() {
            return true;
        }
        !is_user_layer
    }

    /// Milliseconds until the lifecycle completes, from `now`. Completed
    /// lifecycles report zero.
    pub fn time_left_ms(&self, now: Instant) -> f64 {
        let Some(phase) = self.phase else {
            return 0.0;
        };
        let start = self.phase_start.unwrap_or(now);
        let elapsed_ms = now.saturating_duration_since(start).as_secs_f64() * 1000.0;
        let mut remaining = (self.duration_of(phase).unwrap_or(0.0) - elapsed_ms).max(0.0);
        let later: &[Phase] = match phase {
            Phase::Over => &[Phase::Hold, Phase::Revert],
            Phase::Hold => &[Phase::Revert],
            Phase::Revert => &[],
        };
        for p in later {
            remaining += self.duration_of(*p).unwrap_or(0.0);
        }
        remaining
    }
}

fn positive(ms: Option<f64>) -> bool {
    ms.is_some_and(|v| v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::{Operator, Property, Value};
    use std::time::Duration;

    fn config(over: Option<f64>, hold: Option<f64>, revert: Option<f64>) -> BuilderConfig {
        let mut c = BuilderConfig::new(Property::Speed, Operator::To, Value::Scalar(1.0));
        c.over_ms = over;
        c.hold_ms = hold;
        c.revert_ms = revert;
        c
    }

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn walks_over_hold_revert_in_order() {
        let t0 = Instant::now();
        let mut lc = Lifecycle::from_config(&config(Some(100.0), Some(100.0), Some(100.0)));

        let adv = lc.advance(t0);
        assert_eq!(adv.phase, Some(Phase::Over));
        assert_eq!(adv.progress, 0.0);

        let adv = lc.advance(at(t0, 50));
        assert_eq!(adv.phase, Some(Phase::Over));
        assert!((adv.progress - 0.5).abs() < 1e-9);

        let adv = lc.advance(at(t0, 120));
        assert_eq!(adv.phase, Some(Phase::Hold));
        assert_eq!(adv.crossed, vec![Phase::Over]);

        let adv = lc.advance(at(t0, 250));
        assert_eq!(adv.phase, Some(Phase::Revert));
        assert_eq!(adv.crossed, vec![Phase::Hold]);

        let adv = lc.advance(at(t0, 400));
        assert_eq!(adv.phase, None);
        assert_eq!(adv.crossed, vec![Phase::Revert]);
        assert!(lc.is_complete());
        assert!(lc.has_reverted());
    }

    #[test]
    fn zero_phases_are_skipped() {
        let t0 = Instant::now();
        let mut lc = Lifecycle::from_config(&config(None, None, Some(100.0)));
        let adv = lc.advance(t0);
        assert_eq!(adv.phase, Some(Phase::Revert));

        let mut lc = Lifecycle::from_config(&config(Some(0.0), Some(0.0), None));
        let adv = lc.advance(t0);
        assert_eq!(adv.phase, None);
        assert!(lc.is_complete());
        assert!(!lc.has_reverted());
    }

    #[test]
    fn one_late_tick_crosses_several_phases() {
        let t0 = Instant::now();
        let mut lc = Lifecycle::from_config(&config(Some(10.0), Some(10.0), Some(10.0)));
        lc.advance(t0);
        let adv = lc.advance(at(t0, 500));
        assert_eq!(adv.phase, None);
        assert_eq!(adv.crossed, vec![Phase::Over, Phase::Hold, Phase::Revert]);
    }

    #[test]
    fn over_only_completes_without_revert_flag() {
        let t0 = Instant::now();
        let mut lc = Lifecycle::from_config(&config(Some(50.0), None, None));
        lc.advance(t0);
        lc.advance(at(t0, 60));
        assert!(lc.is_complete());
        assert!(!lc.has_reverted(), "no revert configured, must bake");
    }

    #[test]
    fn explicit_zero_revert_counts_as_reverted() {
        let t0 = Instant::now();
        let mut lc = Lifecycle::from_config(&config(Some(10.0), None, Some(0.0)));
        lc.advance(t0);
        lc.advance(at(t0, 20));
        assert!(lc.is_complete());
        assert!(lc.has_reverted());
    }

    #[test]
    fn easing_shapes_over_progress() {
        let t0 = Instant::now();
        let mut cfg = config(Some(100.0), None, None);
        cfg.over_easing = Easing::In(2);
        let mut lc = Lifecycle::from_config(&cfg);
        lc.advance(t0);
        let adv = lc.advance(at(t0, 50));
        assert!((adv.progress - 0.25).abs() < 1e-9);
    }

    #[test]
    fn trigger_revert_restarts_a_completed_lifecycle() {
        let t0 = Instant::now();
        let mut lc = Lifecycle::from_config(&config(Some(10.0), None, None));
        lc.advance(t0);
        lc.advance(at(t0, 20));
        assert!(lc.is_complete());

        lc.trigger_revert(at(t0, 30), Some(100.0), Easing::Linear);
        let adv = lc.advance(at(t0, 80));
        assert_eq!(adv.phase, Some(Phase::Revert));
        assert!((adv.progress - 0.5).abs() < 1e-9);
        lc.advance(at(t0, 200));
        assert!(lc.has_reverted());
    }

    #[test]
    fn removal_policy() {
        let t0 = Instant::now();
        // Anonymous, complete, no revert: removed.
        let mut lc = Lifecycle::from_config(&config(Some(10.0), None, None));
        lc.advance(t0);
        lc.advance(at(t0, 20));
        assert!(lc.should_be_removed(false));
        // Named, complete, no revert: persists.
        assert!(!lc.should_be_removed(true));
        // Named, reverted: removed.
        let mut lc = Lifecycle::from_config(&config(Some(10.0), None, Some(10.0)));
        lc.advance(t0);
        lc.advance(at(t0, 50));
        assert!(lc.should_be_removed(true));
        // Incomplete: kept.
        let mut lc = Lifecycle::from_config(&config(Some(1000.0), None, None));
        lc.advance(t0);
        assert!(!lc.should_be_removed(false));
    }

    #[test]
    fn time_left_sums_remaining_phases() {
        let t0 = Instant::now();
        let mut lc = Lifecycle::from_config(&config(Some(100.0), Some(50.0), Some(25.0)));
        lc.advance(t0);
        let left = lc.time_left_ms(at(t0, 40));
        assert!((left - 135.0).abs() < 1e-6);
    }
}
