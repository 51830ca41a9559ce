//! Deterministic seed derivation for per-arm-set RNGs.
//!
//! Not cryptographic. The only goal is that every arm set in a tree gets its
//! own reproducible stream, stable across platforms and runs.

/// Hash `keys` (in order) together with `seed` and an ordinal.
///
/// Implementation:
/// - FNV-1a over each key's bytes, with a separator byte between keys
/// - SplitMix64 finalizer over `seed ^ ordinal-mix ^ hash`
#[must_use]
pub fn arm_set_seed(seed: u64, ordinal: u64, keys: &[String]) -> u64 {
    let mut h: u64 = 14695981039346656037u64;
    for key in keys {
        for b in key.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(1099511628211u64);
        }
        h ^= 0x1f;
        h = h.wrapping_mul(1099511628211u64);
    }
    splitmix64(seed ^ splitmix64(ordinal) ^ h)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
