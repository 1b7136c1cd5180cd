use std::collections::HashSet;
use std::hash::Hash;

#[inline(always)]
pub fn square_f64(n: f64) -> f64 {
    n * n
}

const SEED_XOR: u128 = 0b10101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010;

pub fn stable_hash_seed(s: &str) -> [u8; 16] {
    let mut val = 17u128;
    for byte in s.as_bytes() {
        val = 31u128.wrapping_mul(val).wrapping_add(*byte as u128);
        val ^= SEED_XOR;
    }
    val.to_le_bytes()
}

pub fn first_duplicate<'a, T, I>(iter: T) -> Option<&'a I> where T: Iterator<Item=&'a I>, I: Eq + Hash + 'a {
    let mut set = HashSet::<&'a I>::new();
    for item in iter {
        if !set.insert(item) {
            return Some(item);
        }
    }
    None
}

/// Index of the first entry holding the largest value.
///
/// Later entries only win when strictly greater, so ties go to the lowest
/// index. NaN entries never win.
pub fn max_value_index(values: &[f64]) -> usize {
    let mut max_value = f64::MIN;
    let mut index = 0;
    for (i, &value) in values.iter().enumerate() {
        if value > max_value {
            max_value = value;
            index = i;
        }
    }
    index
}

/// Truncates to three decimal places, used for human-facing progress values.
#[inline]
pub fn limit_display_precision(value: f64) -> f64 {
    (value * 1000.0).trunc() / 1000.0
}
