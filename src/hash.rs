//! Bucket hash functions.
//!
//! The table feeds the raw key bytes to [`Hasher::write`] and reduces
//! [`Hasher::finish`] modulo its live bucket count, so any
//! [`BuildHasher`] works. The two provided here are deterministic and
//! unseeded: the same key always lands in the same bucket for a given
//! bucket count.

use core::hash::{BuildHasher, Hasher};

/// Additive byte hash: the sum of `byte + 13` over every byte of the key.
///
/// Wraps on overflow. Cheap and stable, though keys that are
/// permutations of each other always collide.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdditiveHasher {
    sum: u64,
}

impl AdditiveHasher {
    const BIAS: u64 = 13;

    pub const fn new() -> Self {
        Self { sum: 0 }
    }
}

impl Hasher for AdditiveHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.sum
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.sum = self.sum.wrapping_add(u64::from(b) + Self::BIAS);
        }
    }
}

/// Builder for [`AdditiveHasher`]; the default bucket hash of `ChainedHashMap`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildAdditiveHasher;

impl BuildHasher for BuildAdditiveHasher {
    type Hasher = AdditiveHasher;

    fn build_hasher(&self) -> Self::Hasher {
        AdditiveHasher::new()
    }
}

/// Bernstein's djb2: `h = h * 33 + byte`, seeded with 5381.
#[derive(Clone, Copy, Debug)]
pub struct Djb2Hasher {
    hash: u64,
}

impl Djb2Hasher {
    const SEED: u64 = 5381;

    pub const fn new() -> Self {
        Self { hash: Self::SEED }
    }
}

impl Default for Djb2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Djb2Hasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.hash = (self.hash << 5)
                .wrapping_add(self.hash)
                .wrapping_add(u64::from(b));
        }
    }
}

/// Builder for [`Djb2Hasher`].
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildDjb2Hasher;

impl BuildHasher for BuildDjb2Hasher {
    type Hasher = Djb2Hasher;

    fn build_hasher(&self) -> Self::Hasher {
        Djb2Hasher::new()
    }
}
