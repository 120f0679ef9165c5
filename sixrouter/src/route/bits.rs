//! Bit helpers over 128-bit addresses. Bit 0 is the most significant bit.

pub const ADDR_BITS: u8 = 128;

#[inline]
pub fn bit(addr: u128, index: u8) -> u8 {
    assert!(index < ADDR_BITS, "bit index {} out of range", index);
    ((addr >> (ADDR_BITS - 1 - index)) & 1) as u8
}

/// Zero every bit at or beyond `prefix_len`.
#[inline]
pub fn clear_host_bits(addr: u128, prefix_len: u8) -> u128 {
    match prefix_len {
        0 => 0,
        len if len >= ADDR_BITS => addr,
        len => addr & (u128::MAX << (ADDR_BITS - len)),
    }
}

/// Number of leading bits `a` and `b` share, looking no further than `end`.
#[inline]
pub fn common_prefix_len(a: u128, b: u128, end: u8) -> u8 {
    ((a ^ b).leading_zeros() as u8).min(end)
}
