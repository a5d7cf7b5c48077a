use std::cmp::Ordering;

use alloy_primitives::U256;

use crate::SwarmAddress;

/// Returns the XOR distance between address `x` and address `y` as a
/// big-endian integer.
#[inline]
pub fn distance(x: &SwarmAddress, y: &SwarmAddress) -> U256 {
    let mut result = *x.as_bytes();
    for (r, b) in result.iter_mut().zip(y.as_bytes()) {
        *r ^= b;
    }

    U256::from_be_bytes(result)
}

/// Compares `x` and `y` by their XOR distance to `a`.
///
/// It returns:
///   - `Ordering::Greater` if `x` is closer to `a` than `y`
///   - `Ordering::Equal` if `x` and `y` are equidistant from `a` (this means
///     that `x` and `y` are the same address)
///   - `Ordering::Less` if `x` is farther from `a` than `y`
#[inline]
pub fn distance_cmp(a: &SwarmAddress, x: &SwarmAddress, y: &SwarmAddress) -> Ordering {
    let bytes = a.as_bytes().iter().zip(x.as_bytes()).zip(y.as_bytes());
    for ((ab, xb), yb) in bytes {
        let dx = xb ^ ab;
        let dy = yb ^ ab;

        if dx != dy {
            return dy.cmp(&dx);
        }
    }

    Ordering::Equal
}
