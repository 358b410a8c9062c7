//! Fractional-movement accumulator.
//!
//! Back-ends only accept integer pixels; velocities are fractional. The
//! accumulator carries the fractional residual per axis and releases integer
//! pixels as they accrue. Invariant: the emitted integer total never differs
//! from the true floating total by a full pixel on either axis.

#[derive(Debug, Clone, Copy, Default)]
pub struct SubpixelAccumulator {
    rx: f64,
    ry: f64,
}

impl SubpixelAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fractional delta and take the whole pixels out of the residual.
    pub fn adjust(&mut self, dx: f64, dy: f64) -> (i32, i32) {
        self.rx += dx;
        self.ry += dy;
        let ix = self.rx.trunc();
        let iy = self.ry.trunc();
        self.rx -= ix;
        self.ry -= iy;
        (ix as i32, iy as i32)
    }

    /// Drop the residual. Called when the tick loop stops or the back-end is
    /// repositioned out from under us.
    pub fn reset(&mut self) {
        self.rx = 0.0;
        self.ry = 0.0;
    }

    pub fn residual(&self) -> (f64, f64) {
        (self.rx, self.ry)
    }
}
