//! Seeded randomness.
//!
//! Each simulation owns one [`RandomSource`]; nothing else draws from it, so a
//! seed fully determines a run. The process-wide seed source only hands out
//! seeds for new, otherwise independent, generators.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Deterministic random number generator owned by one simulation.
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
    rng: ChaCha8Rng,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        RandomSource {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed this source was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform value in `[0, max)`; `0` when `max` is zero.
    pub fn next_below(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        self.rng.gen_range(0..max)
    }

    /// Uniform value in `range`; `range.start` when the range is empty.
    pub fn gen_range_f64(&mut self, range: Range<f64>) -> f64 {
        if range.start >= range.end {
            return range.start;
        }
        self.rng.gen_range(range)
    }

    /// Raw 64-bit draw, used to derive seeds for child generators.
    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// `true` with probability `p`. Always consumes one draw.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

// ============================================================================
// Process-wide Seed Source
// ============================================================================

struct SeedSource {
    base: u64,
    counter: AtomicU64,
}

static SEED_SOURCE: OnceLock<SeedSource> = OnceLock::new();

/// Fix the process-wide seed source. Returns `false` if it was already set,
/// either by an earlier call or by a [`next_seed`] that initialized it from
/// OS entropy.
pub fn init_seed_source(base: u64) -> bool {
    let mut installed = false;
    SEED_SOURCE.get_or_init(|| {
        installed = true;
        SeedSource {
            base,
            counter: AtomicU64::new(0),
        }
    });
    installed
}

/// Hand out a fresh seed for a new simulation instance.
///
/// Safe to call from many threads; each call returns a different seed.
pub fn next_seed() -> u64 {
    let source = SEED_SOURCE.get_or_init(|| SeedSource {
        base: rand::random::<u64>(),
        counter: AtomicU64::new(0),
    });
    let n = source.counter.fetch_add(1, Ordering::Relaxed);
    splitmix64(source.base.wrapping_add(n))
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
