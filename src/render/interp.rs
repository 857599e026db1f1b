//! Eased display multiplier
//!
//! Runs on the render clock, independent of the simulation tick. Each frame
//! closes a fixed fraction of the gap to the target, scaled for frames that
//! are longer or shorter than nominal, and snaps once the gap is tiny.

use crate::consts::{MAX_FRAME_DELTA_MS, SNAP_EPSILON, START_MULTIPLIER};

/// What the drawing collaborator reads each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayState {
    pub displayed_multiplier: f64,
}

/// Eases a displayed value toward the live multiplier
#[derive(Debug, Clone)]
pub struct RenderInterpolator {
    displayed: f64,
    target: f64,
    /// Fraction of the gap closed in one nominal frame
    factor: f64,
    /// Nominal frame length (ms)
    frame_ms: f64,
    running: bool,
}

impl RenderInterpolator {
    pub fn new(factor: f64, frame_ms: f64) -> Self {
        Self {
            displayed: START_MULTIPLIER,
            target: START_MULTIPLIER,
            factor: factor.clamp(f64::EPSILON, 1.0),
            frame_ms: frame_ms.max(1.0),
            running: false,
        }
    }

    /// Start easing (render clock armed)
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Halt; further ticks leave the display untouched
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Jump straight to `value` (new round)
    pub fn reset(&mut self, value: f64) {
        let value = value.max(0.0);
        self.displayed = value;
        self.target = value;
    }

    /// Point the display at a new value
    pub fn set_target(&mut self, target: f64) {
        if target.is_finite() {
            self.target = target.max(0.0);
        }
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn displayed(&self) -> f64 {
        self.displayed
    }

    pub fn state(&self) -> DisplayState {
        DisplayState {
            displayed_multiplier: self.displayed,
        }
    }

    /// Advance one frame of `delta_ms`; returns the displayed value
    pub fn tick(&mut self, delta_ms: f64) -> f64 {
        if !self.running || !delta_ms.is_finite() || delta_ms <= 0.0 {
            return self.displayed;
        }

        let frames = delta_ms.min(MAX_FRAME_DELTA_MS) / self.frame_ms;
        let alpha = 1.0 - (1.0 - self.factor).powf(frames);

        let gap = self.target - self.displayed;
        if gap.abs() < SNAP_EPSILON {
            self.displayed = self.target;
        } else {
            self.displayed += gap * alpha;
            if (self.target - self.displayed).abs() < SNAP_EPSILON {
                self.displayed = self.target;
            }
        }
        self.displayed = self.displayed.max(0.0);
        self.displayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(factor: f64) -> RenderInterpolator {
        let mut interp = RenderInterpolator::new(factor, 16.0);
        interp.start();
        interp
    }

    #[test]
    fn test_single_frame_moves_by_factor() {
        let mut interp = running(0.15);
        interp.reset(1.0);
        interp.set_target(2.0);
        let v = interp.tick(16.0);
        assert!((v - 1.15).abs() < 1e-12, "{v}");
    }

    #[test]
    fn test_converges_then_snaps() {
        let mut interp = running(0.15);
        interp.reset(1.0);
        interp.set_target(2.0);

        let mut frames = 0;
        while interp.displayed() != 2.0 {
            let before = interp.displayed();
            interp.tick(16.0);
            assert!(interp.displayed() >= before);
            frames += 1;
            assert!(frames < 200, "did not converge");
        }
        assert_eq!(interp.displayed(), 2.0);
        // Stays put once snapped
        assert_eq!(interp.tick(16.0), 2.0);
    }

    #[test]
    fn test_longer_frame_closes_more() {
        let mut a = running(0.15);
        a.set_target(2.0);
        let mut b = running(0.15);
        b.set_target(2.0);

        a.tick(16.0);
        a.tick(16.0);
        b.tick(32.0);
        assert!((a.displayed() - b.displayed()).abs() < 1e-12);
    }

    #[test]
    fn test_never_negative() {
        let mut interp = running(1.0);
        interp.set_target(-5.0);
        assert_eq!(interp.target(), 0.0);
        interp.tick(16.0);
        assert!(interp.displayed() >= 0.0);

        interp.set_target(f64::NAN);
        assert_eq!(interp.target(), 0.0);
    }

    #[test]
    fn test_stopped_does_not_move() {
        let mut interp = RenderInterpolator::new(0.15, 16.0);
        interp.set_target(3.0);
        assert_eq!(interp.tick(16.0), START_MULTIPLIER);

        interp.start();
        interp.tick(16.0);
        interp.stop();
        let frozen = interp.displayed();
        assert_eq!(interp.tick(16.0), frozen);
    }
}
