//! Random number generation helpers.

use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Fast RNG threaded through every stochastic operation of a machine.
pub type FastRng = Xoshiro256PlusPlus;

/// # Overview
///
/// Creates a fast RNG seeded from a u64 value.
///
/// # Examples
///
/// ```
/// use graph_tsetlin_rs::utils::rng_from_seed;
///
/// let mut rng = rng_from_seed(42);
/// ```
#[inline]
pub fn rng_from_seed(seed: u64) -> FastRng {
    use rand::SeedableRng;
    Xoshiro256PlusPlus::seed_from_u64(seed)
}

/// # Overview
///
/// Draws a 32-bit mask where each bit is set independently when a fresh
/// `u32` draw falls below `threshold`.
///
/// Bit `b` corresponds to the `b`-th draw, so the consumption order is
/// fixed for a given seed.
#[inline]
pub fn random_mask<R: Rng>(rng: &mut R, threshold: u32) -> u32 {
    let mut mask = 0u32;
    for b in 0..32 {
        if rng.random::<u32>() < threshold {
            mask |= 1 << b;
        }
    }
    mask
}
