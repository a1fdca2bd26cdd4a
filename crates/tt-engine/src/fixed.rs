//! Fixed-point helpers.
//!
//! `scale_by_nibble` has two implementations that must agree bit for bit:
//! a plain multiply, and a shift-add sequence for cores without a hardware
//! multiplier. The `shift-add-mul` feature selects the latter.

/// `input * scale / 16` for `scale` in `0..=16`. Larger scales saturate to 16.
#[inline]
pub fn scale_by_nibble(input: i16, scale: u8) -> i16 {
    #[cfg(feature = "shift-add-mul")]
    {
        scale_by_nibble_shift_add(input, scale)
    }
    #[cfg(not(feature = "shift-add-mul"))]
    {
        scale_by_nibble_mul(input, scale)
    }
}

#[inline]
pub fn scale_by_nibble_mul(input: i16, scale: u8) -> i16 {
    let scale = scale.min(16) as i32;
    ((input as i32 * scale) >> 4) as i16
}

/// Walks the five scale bits from the top, doubling the accumulator between
/// bits and adding `input` where a bit is set.
#[inline]
pub fn scale_by_nibble_shift_add(input: i16, scale: u8) -> i16 {
    let scale = scale.min(16);
    let mut acc: i32 = 0;
    for bit in (0..5).rev() {
        acc <<= 1;
        if scale & (1 << bit) != 0 {
            acc += input as i32;
        }
    }
    (acc >> 4) as i16
}
