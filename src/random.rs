//! Borland C style linear congruential generator
//!
//! Scene scripts depend on the exact sequence, so the arithmetic keeps the
//! original 16-bit truncations.

#[derive(Debug, Clone)]
pub struct RandomGenerator {
    seed: u32,
}

impl RandomGenerator {
    pub fn new(seed: u16) -> Self {
        Self { seed: seed as u32 }
    }

    pub fn from_clock() -> Self {
        Self::new(chrono::Utc::now().timestamp() as u16)
    }

    pub fn set_seed(&mut self, seed: u16) {
        self.seed = seed as u32;
    }

    /// Next number in `0..=0x7FFF`.
    pub fn next_number(&mut self) -> u16 {
        let lo = (self.seed & 0xFFFF) as u16;
        let hi = (self.seed >> 16) as u16;
        let mut rnd = 0x15Au16.wrapping_mul(lo);
        if hi != 0 {
            rnd = rnd.wrapping_add(0x4E35u16.wrapping_mul(hi));
        }
        self.seed = ((rnd as u32) << 16) | (0x4E35u32.wrapping_mul(lo as u32) & 0xFFFF);
        self.seed = self.seed.wrapping_add(1);
        (self.seed & 0x7FFF) as u16
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::from_clock()
    }
}
