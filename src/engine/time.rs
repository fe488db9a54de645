/// Fixed-step simulation clock for the headless driver.
pub struct FrameClock {
    pub dt: f32,
    pub frame: u64,
    /// Simulated seconds since start.
    pub elapsed: f32,
}

impl FrameClock {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            frame: 0,
            elapsed: 0.0,
        }
    }

    pub fn tick(&mut self) {
        self.frame += 1;
        self.elapsed = self.frame as f32 * self.dt;
    }

    /// `true` every `every` frames; never when `every` is 0.
    pub fn every(&self, every: u64) -> bool {
        every != 0 && self.frame % every == 0
    }
}
