use rand::rngs::ThreadRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;

/// Chooses the initial centroids.
///
/// `sample` returns `amount` distinct indices into a sequence of length `len`.
/// The engine validates the returned indices before using them.
pub trait Sampler: fmt::Debug {
    fn sample(&mut self, len: usize, amount: usize) -> Vec<usize>;
}

/// Uniform sampling without replacement backed by a `rand` generator.
pub struct RandomSampler<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomSampler<ThreadRng> {
    pub fn thread() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl RandomSampler<ChaCha8Rng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> fmt::Debug for RandomSampler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomSampler").finish_non_exhaustive()
    }
}

impl<R: Rng> Sampler for RandomSampler<R> {
    fn sample(&mut self, len: usize, amount: usize) -> Vec<usize> {
        rand::seq::index::sample(&mut self.rng, len, amount.min(len)).into_vec()
    }
}

/// Returns a preset list of indices, ignoring `len`.
#[derive(Clone, Debug)]
pub struct FixedSampler {
    indices: Vec<usize>,
}

impl FixedSampler {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }
}

impl Sampler for FixedSampler {
    fn sample(&mut self, _len: usize, amount: usize) -> Vec<usize> {
        self.indices.iter().copied().take(amount).collect()
    }
}
