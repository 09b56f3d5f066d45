//! Probabilistic seen-set over URL strings
//!
//! The dedup filter is a fixed-size Bloom filter: membership tests never
//! produce a false negative, so "absent" is authoritative; "present" is only
//! probabilistic confidence that the URL was already seen. The bit array is a
//! vector of atomic words, so concurrent `might_contain`/`mark_seen` calls
//! from the crawl loop and any number of pipeline invocations are safe without
//! an external lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of bits in the filter (1 MiB of words).
pub const DEFAULT_FILTER_BITS: usize = 1 << 23;

const HASH_SEEDS: [u64; 3] = [
    0x517c_c1b7_2722_0a95,
    0x6d0f_27bd_ceb7_b067,
    0x9e37_79b1_85eb_ca87,
];

/// Lock-free Bloom filter keyed by URL strings.
pub struct DedupFilter {
    words: Vec<AtomicU64>,
}

impl DedupFilter {
    /// Creates a filter with the given number of bits (rounded up to a whole
    /// number of 64-bit words; at least one word).
    pub fn new(bits: usize) -> Self {
        let word_count = (bits.max(64) + 63) / 64;
        let mut words = Vec::with_capacity(word_count);
        words.resize_with(word_count, || AtomicU64::new(0));
        Self { words }
    }

    /// Tests whether `key` was possibly seen before.
    ///
    /// Returns `false` only if the key was definitely never marked; a `true`
    /// result may be a collision.
    pub fn might_contain(&self, key: &str) -> bool {
        let bit_count = self.words.len() * 64;
        HASH_SEEDS.iter().all(|&seed| {
            let idx = (mix_hash(key.as_bytes(), seed) as usize) % bit_count;
            let mask = 1u64 << (idx % 64);
            self.words[idx / 64].load(Ordering::Relaxed) & mask != 0
        })
    }

    /// Marks `key` as seen. Idempotent; safe to call concurrently.
    pub fn mark_seen(&self, key: &str) {
        let bit_count = self.words.len() * 64;
        for &seed in HASH_SEEDS.iter() {
            let idx = (mix_hash(key.as_bytes(), seed) as usize) % bit_count;
            let mask = 1u64 << (idx % 64);
            self.words[idx / 64].fetch_or(mask, Ordering::Relaxed);
        }
    }
}

impl Default for DedupFilter {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_BITS)
    }
}

fn mix_hash(data: &[u8], seed: u64) -> u64 {
    let mut hash = seed ^ data.len() as u64;
    for &byte in data {
        hash ^= (byte as u64).wrapping_mul(0x1000_0000_01b3);
        hash = hash.rotate_left(13).wrapping_mul(0xff51_afd7_ed55_8ccd);
    }
    hash ^ (hash >> 33)
}
