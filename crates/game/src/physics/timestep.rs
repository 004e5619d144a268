pub struct FixedTimestep {
    dt: f32,
    accumulator: f32,
    max_substeps: u32,
}

impl FixedTimestep {
    const MAX_FRAME_DELTA: f32 = 0.25;

    pub fn new(dt: f32, max_substeps: u32) -> Self {
        Self {
            dt,
            accumulator: 0.0,
            max_substeps: max_substeps.max(1),
        }
    }

    pub fn accumulate(&mut self, delta: f32) {
        if !delta.is_finite() || delta <= 0.0 {
            return;
        }
        self.accumulator += delta.min(Self::MAX_FRAME_DELTA);
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }

    /// Consumes as many fixed ticks as the cap allows and discards the rest.
    pub fn drain(&mut self) -> u32 {
        let mut ticks = 0;
        while ticks < self.max_substeps && self.consume_tick() {
            ticks += 1;
        }
        if self.accumulator >= self.dt {
            log::trace!(
                "dropping {:.3}s of simulation time after {} substeps",
                self.accumulator,
                ticks
            );
            self.accumulator = 0.0;
        }
        ticks
    }
}
