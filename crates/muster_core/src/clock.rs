//! Fixed-timestep simulation clock.

use crate::ecs::TickContext;
use crate::math::Fixed;

/// Tracks simulated time and converts frame time into whole fixed steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimClock {
    tick: u64,
    now: Fixed,
    step: Fixed,
    accumulator: Fixed,
}

impl SimClock {
    /// Clock at time zero stepping by `step` seconds.
    #[must_use]
    pub const fn new(step: Fixed) -> Self {
        Self {
            tick: 0,
            now: Fixed::ZERO,
            step,
            accumulator: Fixed::ZERO,
        }
    }

    /// Fixed steps completed so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds elapsed.
    #[must_use]
    pub const fn now(&self) -> Fixed {
        self.now
    }

    /// Fixed step length.
    #[must_use]
    pub const fn step(&self) -> Fixed {
        self.step
    }

    /// Bank frame time. Negative deltas are ignored.
    pub fn accumulate(&mut self, frame_dt: Fixed) {
        if frame_dt > Fixed::ZERO {
            self.accumulator = self.accumulator.saturating_add(frame_dt);
        }
    }

    /// Withdraw one fixed step from the bank, if enough time is banked.
    pub fn take_step(&mut self) -> bool {
        if self.accumulator < self.step {
            return false;
        }
        self.accumulator -= self.step;
        true
    }

    /// Mark one fixed step as done.
    pub fn advance(&mut self) {
        self.tick += 1;
        self.now += self.step;
    }

    /// Context for the next fixed step.
    #[must_use]
    pub const fn fixed_context(&self) -> TickContext {
        TickContext {
            tick: self.tick,
            now: self.now,
            dt: self.step,
        }
    }

    /// Context for the frame phases.
    #[must_use]
    pub const fn frame_context(&self, frame_dt: Fixed) -> TickContext {
        TickContext {
            tick: self.tick,
            now: self.now,
            dt: frame_dt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_yields_whole_steps() {
        let mut clock = SimClock::new(Fixed::from_num(0.25));
        clock.accumulate(Fixed::from_num(0.6));

        let mut steps = 0;
        while clock.take_step() {
            clock.advance();
            steps += 1;
        }
        assert_eq!(steps, 2);
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.now(), Fixed::from_num(0.5));

        clock.accumulate(Fixed::from_num(0.15));
        assert!(clock.take_step());
        assert!(!clock.take_step());
    }

    #[test]
    fn test_negative_frame_time_is_ignored() {
        let mut clock = SimClock::new(Fixed::ONE);
        clock.accumulate(Fixed::from_num(-3));
        assert!(!clock.take_step());
    }

    #[test]
    fn test_contexts_carry_time() {
        let mut clock = SimClock::new(Fixed::from_num(0.5));
        clock.advance();
        let fixed = clock.fixed_context();
        assert_eq!(fixed.tick, 1);
        assert_eq!(fixed.now, Fixed::from_num(0.5));
        assert_eq!(fixed.dt, Fixed::from_num(0.5));
        assert_eq!(clock.frame_context(Fixed::from_num(0.016)).dt, Fixed::from_num(0.016));
    }
}
