use crate::{ADDRESS_SIZE, SwarmAddress};

/// Maximum proximity order: the PO of an address with itself (N * 8).
pub const MAX_PO: u16 = (ADDRESS_SIZE * 8) as u16;

pub trait Proximity {
    /// Proximity order between `self` and `other`.
    fn proximity(&self, other: &Self) -> u16;
}

impl Proximity for SwarmAddress {
    #[inline]
    fn proximity(&self, other: &Self) -> u16 {
        proximity(self, other)
    }
}

// Proximity returns the proximity order of the MSB distance between x and y.
//
// The distance metric MSB(x, y) of two equal length bit sequences x and y is
// the value of the binary integer cast of x^y, most significant bit first.
// Proximity(x, y) counts the common leading zeros of x^y, so it is a discrete
// logarithmic scaling of that distance.
//
// (0 farthest, 255 closest, 256 self)
#[inline]
pub fn proximity(one: &SwarmAddress, other: &SwarmAddress) -> u16 {
    for (i, (x, y)) in one.as_bytes().iter().zip(other.as_bytes()).enumerate() {
        let oxo = x ^ y;
        if oxo != 0 {
            return (i * 8) as u16 + oxo.leading_zeros() as u16;
        }
    }
    MAX_PO
}

/// Build an address sharing exactly the first `po` bits with `base`.
///
/// Bit `po` is forced to the opposite of `base`'s bit and every bit after it
/// comes from `random_byte`. With `po == MAX_PO` there is no differing bit and
/// `base` itself is returned.
///
/// Intended for tests and simulations that need peers at a controlled
/// distance; routing never calls it.
///
/// # Panics
///
/// If `po > MAX_PO`.
pub fn address_with_proximity(
    base: &SwarmAddress,
    po: u16,
    mut random_byte: impl FnMut() -> u8,
) -> SwarmAddress {
    assert!(po <= MAX_PO, "proximity order {po} exceeds {MAX_PO}");
    if po == MAX_PO {
        return *base;
    }

    let po = usize::from(po);
    let (pivot, bit) = (po / 8, po % 8);
    let mut bytes = *base.as_bytes();

    for (i, byte) in bytes.iter_mut().enumerate().skip(pivot) {
        let rnd = random_byte();
        if i == pivot {
            let keep = !(0xffu8 >> bit);
            let flip = 0x80u8 >> bit;
            let rest = (0xffu8 >> bit) >> 1;
            *byte = (*byte & keep) | (!*byte & flip) | (rnd & rest);
        } else {
            *byte = rnd;
        }
    }

    SwarmAddress::new(bytes)
}

/// Build an address that falls into the same region as `b` when seen from `a`,
/// at most `p` bits deep.
///
/// The leading bits of `b` are kept up to and including the first bit where
/// `a` and `b` differ, capped at `p` bits. Every bit after that comes from
/// `random_byte`. So for `p > PO(a, b)` the result sits at the same proximity
/// order from `a` as `b` does; otherwise it only shares the first `p` bits with
/// both.
pub fn common_bits_address(
    a: &SwarmAddress,
    b: &SwarmAddress,
    mut random_byte: impl FnMut() -> u8,
    p: u16,
) -> SwarmAddress {
    let keep = p.min(proximity(a, b).saturating_add(1)).min(MAX_PO);
    let keep = usize::from(keep);
    let (pivot, bit) = (keep / 8, keep % 8);
    let mut bytes = *b.as_bytes();

    for (i, byte) in bytes.iter_mut().enumerate().skip(pivot) {
        let rnd = random_byte();
        if i == pivot {
            let fill = 0xffu8 >> bit;
            *byte = (*byte & !fill) | (rnd & fill);
        } else {
            *byte = rnd;
        }
    }

    SwarmAddress::new(bytes)
}

/// Random address at proximity order `po` from `base`.
#[cfg(feature = "rand")]
pub fn random_address_at(base: &SwarmAddress, po: u16) -> SwarmAddress {
    address_with_proximity(base, po, rand::random)
}
