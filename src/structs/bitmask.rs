//! # **Bitmask Module** - *Bit-packed validity helpers*
//!
//! Operations on Arrow bit-packed buffers (validity maps and boolean data).
//!
//! ## Behaviour
//! - LSB of byte 0 corresponds to the first logical element.
//! - 1 = set/valid, 0 = cleared/null.
//! - Offsets are bit offsets and need not be byte aligned.

/// Bytes needed to hold `n_bits` bits.
#[inline(always)]
pub const fn bytes_for_bits(n_bits: usize) -> usize {
    n_bits.div_ceil(8)
}

#[inline(always)]
pub fn get_bit(bytes: &[u8], idx: usize) -> bool {
    (bytes[idx >> 3] >> (idx & 7)) & 1 != 0
}

#[inline(always)]
pub fn set_bit(bytes: &mut [u8], idx: usize, value: bool) {
    let mask = 1u8 << (idx & 7);
    if value {
        bytes[idx >> 3] |= mask;
    } else {
        bytes[idx >> 3] &= !mask;
    }
}

/// Copies `n` bits from `src[src_offset..]` into `dst[dst_offset..]`.
///
/// Bits of `dst` outside `[dst_offset, dst_offset + n)` are left unchanged,
/// including the unused bits of the first and last touched bytes.
///
/// # Panics
/// When either range exceeds its slice. Callers check bounds first.
pub fn copy_bits(dst: &mut [u8], dst_offset: usize, src: &[u8], src_offset: usize, n: usize) {
    if n == 0 {
        return;
    }
    // Both sides byte aligned: bulk copy whole bytes, then the tail.
    if dst_offset & 7 == 0 && src_offset & 7 == 0 {
        let whole = n >> 3;
        let d = dst_offset >> 3;
        let s = src_offset >> 3;
        dst[d..d + whole].copy_from_slice(&src[s..s + whole]);
        for i in (whole << 3)..n {
            set_bit(dst, dst_offset + i, get_bit(src, src_offset + i));
        }
        return;
    }
    for i in 0..n {
        set_bit(dst, dst_offset + i, get_bit(src, src_offset + i));
    }
}

/// Sets `n` bits starting at `offset`.
pub fn set_bits(dst: &mut [u8], offset: usize, n: usize) {
    for i in offset..offset + n {
        set_bit(dst, i, true);
    }
}

/// Counts the cleared bits in `[offset, offset + n)`.
pub fn count_unset(bytes: &[u8], offset: usize, n: usize) -> usize {
    (offset..offset + n).filter(|&i| !get_bit(bytes, i)).count()
}
