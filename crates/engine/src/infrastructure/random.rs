//! Random implementation.

use rand::Rng;

use crate::infrastructure::ports::RandomPort;

/// System random - uses real randomness.
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        rand::thread_rng().gen_range(min..max)
    }
}
