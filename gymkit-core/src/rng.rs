//! Explicit random number stream for environments and spaces.
//!
//! Sampling in this library never touches a global RNG. Every consumer holds
//! an [`EnvRng`] and derives a child stream with [`EnvRng::fork`] before each
//! independent use, so two runs given the same seed reproduce identical
//! sequences regardless of unrelated draws elsewhere in the program.
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// A seedable random stream with explicit splitting.
#[derive(Debug, Clone)]
pub struct EnvRng(StdRng);

impl EnvRng {
    /// Creates a stream from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Creates a stream from operating system entropy.
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    /// Derives an independent child stream, advancing this one.
    ///
    /// Each sampling operation forks the caller's stream and consumes only
    /// the fork, so the slice of randomness it uses is never reused.
    pub fn fork(&mut self) -> Self {
        Self(StdRng::seed_from_u64(self.0.gen()))
    }
}

impl RngCore for EnvRng {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_seed_same_stream() {
        let mut a = EnvRng::from_seed(42);
        let mut b = EnvRng::from_seed(42);
        let xs: Vec<u64> = (0..16).map(|_| a.gen()).collect();
        let ys: Vec<u64> = (0..16).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn forks_are_independent_of_later_draws() {
        let mut a = EnvRng::from_seed(7);
        let mut b = EnvRng::from_seed(7);

        let mut fa = a.fork();
        let mut fb = b.fork();

        // Consuming the parent afterwards must not change what the fork yields.
        let _: u64 = b.gen();
        assert_eq!(fa.gen::<u64>(), fb.gen::<u64>());
    }

    #[test]
    fn fork_advances_parent() {
        let mut a = EnvRng::from_seed(3);
        let mut b = EnvRng::from_seed(3);
        let _ = a.fork();
        let _ = a.fork();
        let _ = b.fork();
        assert_ne!(a.gen::<u64>(), b.gen::<u64>());
    }
}
