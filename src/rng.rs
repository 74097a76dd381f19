//! Random sources for the simulation.
//!
//! Every draw goes through [`RandomSource`] so runs can be replayed by
//! injecting a deterministic implementation.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform integer in `[low, high]`.
    fn int_inclusive(&mut self, low: i32, high: i32) -> i32;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;

    /// Uniform draw in `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_unit()
    }
}

/// ChaCha8 stream seeded from a single `u64`.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    inner: ChaCha8Rng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::new(42)
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    fn int_inclusive(&mut self, low: i32, high: i32) -> i32 {
        self.inner.gen_range(low..=high)
    }

    fn index(&mut self, len: usize) -> usize {
        self.inner.gen_range(0..len)
    }
}

/// Replays a fixed list of unit draws, cycling when exhausted.
///
/// Integer and index draws are derived from the same list, so a script of
/// `[0.125]` gives angles of π/4 and lower-bound integers forever.
#[derive(Clone, Debug)]
pub struct ScriptedRandom {
    script: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(script: Vec<f64>) -> Self {
        let script = if script.is_empty() { vec![0.0] } else { script };
        Self { script, cursor: 0 }
    }

    /// Same value on every draw.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        let value = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        value.clamp(0.0, 1.0 - f64::EPSILON)
    }

    fn int_inclusive(&mut self, low: i32, high: i32) -> i32 {
        let span = (high as i64 - low as i64 + 1) as f64;
        let offset = (self.next_unit() * span).floor() as i64;
        (low as i64 + offset).min(high as i64) as i32
    }

    fn index(&mut self, len: usize) -> usize {
        let offset = (self.next_unit() * len as f64).floor() as usize;
        offset.min(len.saturating_sub(1))
    }
}
