//! Seeded ordering keys for the unfiltered catalog listing.
//!
//! The engine never sorts; it hands out a comparison key per `(seed, index)`
//! pair. Sorting and paging happen in the query layer.

/// Randomization state for unfiltered listings.
///
/// Replaced wholesale on reshuffle; never mutated in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShuffleEpoch {
    pub seed: f64,
    /// Number of reshuffles since startup.
    pub generation: u64,
}

impl ShuffleEpoch {
    /// Initial epoch with a freshly drawn seed.
    pub fn initial() -> Self {
        Self {
            seed: new_seed(),
            generation: 0,
        }
    }

    /// The epoch that replaces `self` on a reshuffle.
    pub fn next(&self) -> Self {
        Self {
            seed: new_seed(),
            generation: self.generation.wrapping_add(1),
        }
    }
}

/// Draw a uniform seed in `[0, 1)`.
pub fn new_seed() -> f64 {
    rand::random::<f64>()
}

/// Deterministic pseudo-random key in `[0, 1)` for entry `index` under `seed`.
pub fn rank(seed: f64, index: usize) -> f64 {
    let mixed = splitmix64(seed.to_bits() ^ splitmix64(index as u64));
    // 53 high bits fill an f64 mantissa exactly.
    (mixed >> 11) as f64 / (1u64 << 53) as f64
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Stable permutation of `0..len` ordered by ascending rank.
pub fn shuffled_indices(seed: f64, len: usize) -> Vec<usize> {
    let mut keyed = (0..len).map(|i| (rank(seed, i), i)).collect::<Vec<_>>();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, i)| i).collect()
}
