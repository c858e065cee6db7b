//! Random draws shared by piece generation and the commentary.

use rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Uniform integer in `[0, n)`. `n` must be non-zero.
pub fn rand_int<R: Rng + ?Sized>(rng: &mut R, n: usize) -> usize {
    rng.gen_range(0..n)
}

/// Uniform pick from a non-empty slice.
pub fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rand_int(rng, items.len())]
}

/// One in six.
pub fn unlikely<R: Rng + ?Sized>(rng: &mut R) -> bool {
    rand_int(rng, 6) == 0
}

/// One in twenty.
pub fn very_unlikely<R: Rng + ?Sized>(rng: &mut R) -> bool {
    rand_int(rng, 20) == 0
}

/// Seeded generator when a seed is given (replays), entropy otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}
