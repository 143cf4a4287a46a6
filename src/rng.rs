//! Seed derivation and the small RNG surface operators are allowed to consume.
//!
//! Reproducibility is a public contract: the same `(seed_base, testcase_id)`
//! pair must always derive the same stream, and operators must consume that
//! stream in a fixed order per strength. See `derive_rng`.

use rand_core::RngCore;
use rand_mt::Mt19937GenRand32;
use sha2::{Digest, Sha256};

/// A per-child RNG stream, derived once and then consumed by exactly one
/// selector choice plus at most one operator invocation per `k` step.
pub struct MtRng {
    inner: Mt19937GenRand32,
}

impl MtRng {
    fn from_seed(seed: u32) -> Self {
        Self {
            inner: Mt19937GenRand32::new(seed),
        }
    }

    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    /// Uniform integer in `[0, n)`. Returns 0 for `n == 0`.
    pub fn below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        (self.next_u32() as usize) % n
    }

    /// Uniform integer in `[lo, hi)`.
    pub fn randrange(&mut self, lo: usize, hi: usize) -> usize {
        debug_assert!(hi > lo, "randrange requires hi > lo");
        lo + self.below(hi - lo)
    }

    /// Uniform `f64` in `[0, 1)`.
    pub fn real01(&mut self) -> f64 {
        (self.next_u32() as f64) / (u32::MAX as f64 + 1.0)
    }

    /// `true` with probability `p` (p clamped to `[0,1]`).
    pub fn chance(&mut self, p: f64) -> bool {
        self.real01() < p.clamp(0.0, 1.0)
    }

    pub fn choice<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let idx = self.below(items.len());
        &items[idx]
    }

    /// Fisher-Yates, in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        let len = items.len();
        for i in (1..len).rev() {
            let j = self.below(i + 1);
            items.swap(i, j);
        }
    }

    /// `k` distinct elements of `items`, order determined by the shuffle draw.
    /// `k` is clamped to `items.len()`.
    pub fn sample<T: Clone>(&mut self, items: &[T], k: usize) -> Vec<T> {
        let mut pool: Vec<T> = items.to_vec();
        self.shuffle(&mut pool);
        pool.truncate(k.min(pool.len()));
        pool
    }
}

/// Derive a reproducible RNG from a run-level seed and a stable per-child id.
///
/// `"{seed_base}:{testcase_id}"` is hashed with SHA-256; the first 8 hex
/// characters of the digest (32 bits) seed the generator. This exact
/// derivation is normative — snapshots depend on it.
pub fn derive_rng(seed_base: u64, testcase_id: &str) -> MtRng {
    let message = format!("{seed_base}:{testcase_id}");
    let digest = Sha256::digest(message.as_bytes());
    let digest_hex = hex::encode(digest);
    let seed = u32::from_str_radix(&digest_hex[0..8], 16).expect("sha256 hex prefix is always valid hex");
    MtRng::from_seed(seed)
}
