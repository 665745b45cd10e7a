//! # **Copy Kernels** - *Role-aware buffer copies*
//!
//! Copies a run of elements of one buffer role from a bound source vector into
//! a destination under construction. Element offsets are absolute indices on
//! both sides: for the source they already include its array offset.
//!
//! | Role | Element | Elements copied |
//! |---|---|---|
//! | validity | 1 bit | `n` |
//! | offsets / large offsets | 4 / 8 bytes | `n + 1`, or `n` for dense unions |
//! | union type ids | 1 byte | `n` |
//! | data | layout width, 1 bit for booleans | `n`, or the byte range the offsets delimit |
//!
//! Offsets are copied verbatim and never rebased. Children and dictionaries are
//! not buffers; they are copied by recursion in [`deep_copy`](crate::kernels::deep_copy).

use crate::enums::buffer_role::{BufferRole, BufferSet};
use crate::enums::error::{ArrowVecError, Result};
use crate::ffi::layout::ElementSize;
use crate::structs::array::{ArrayParts, ROLES};
use crate::structs::bitmask::{copy_bits, set_bits};
use crate::structs::vector::ArrowVector;

/// Copies `n_elements` of the `role` buffer from `src[src_offset..]` into
/// `dst[dst_offset..]`.
///
/// The destination buffer must already be allocated. A missing source validity
/// bitmap marks the destination bits valid.
pub fn copy_buffer(
    role: BufferRole,
    dst: &mut ArrayParts,
    dst_offset: usize,
    src: &ArrowVector<'_>,
    src_offset: usize,
    n_elements: usize,
) -> Result<()> {
    match role {
        BufferRole::Validity => copy_validity(dst, dst_offset, src, src_offset, n_elements),
        BufferRole::Offset | BufferRole::LargeOffset => {
            let width = if role == BufferRole::Offset { 4 } else { 8 };
            let count = if src.layout().offsets_per_row() {
                n_elements
            } else {
                n_elements.checked_add(1).ok_or_else(|| {
                    ArrowVecError::invalid(format!("{n_elements} elements overflow the {role} count"))
                })?
            };
            copy_fixed(role, dst, dst_offset, src, src_offset, count, width)
        }
        BufferRole::UnionTypes => copy_fixed(role, dst, dst_offset, src, src_offset, n_elements, 1),
        BufferRole::Data => match src.layout().element_size {
            ElementSize::Fixed(w) => copy_fixed(role, dst, dst_offset, src, src_offset, n_elements, w),
            ElementSize::Bit => copy_bit_data(dst, dst_offset, src, src_offset, n_elements),
            ElementSize::Variable => copy_variable(dst, dst_offset, src, src_offset, n_elements),
            ElementSize::None => Err(ArrowVecError::invalid(format!(
                "'{}' has no data buffer",
                src.arrow_type()
            ))),
        },
        BufferRole::Child | BufferRole::Dictionary => Err(ArrowVecError::invalid(format!(
            "{role} arrays cannot be copied as buffers; use deep_copy"
        ))),
    }
}

/// Runs [`copy_buffer`] for every role in `which` the destination has, in
/// validity, offsets, union type ids, data order.
pub fn copy_buffers(
    which: BufferSet,
    dst: &mut ArrayParts,
    dst_offset: usize,
    src: &ArrowVector<'_>,
    src_offset: usize,
    n_elements: usize,
) -> Result<()> {
    for role in ROLES {
        if which.contains(role.set()) && dst.has_role(role) {
            copy_buffer(role, dst, dst_offset, src, src_offset, n_elements)?;
        }
    }
    Ok(())
}

fn dst_buffer(dst: &mut ArrayParts, role: BufferRole) -> Result<&mut [u8]> {
    dst.buffer_mut(role)
        .map(|b| b.as_mut_slice())
        .ok_or_else(|| ArrowVecError::invalid(format!("destination {role} buffer is not allocated")))
}

/// Byte range `[idx * width, (idx + count) * width)`, checked against `len`.
fn byte_range(
    idx: usize,
    count: usize,
    width: usize,
    len: usize,
    side: &str,
    role: BufferRole,
) -> Result<std::ops::Range<usize>> {
    let start = idx.checked_mul(width);
    let end = idx.checked_add(count).and_then(|e| e.checked_mul(width));
    match (start, end) {
        (Some(s), Some(e)) if e <= len => Ok(s..e),
        _ => Err(ArrowVecError::invalid(format!(
            "{side} {role} buffer of {len} bytes is too small for {count} elements at {idx}"
        ))),
    }
}

fn check_bits(offset: usize, n: usize, len_bytes: usize, side: &str, role: BufferRole) -> Result<()> {
    match offset.checked_add(n) {
        Some(end) if end <= len_bytes.saturating_mul(8) => Ok(()),
        _ => Err(ArrowVecError::invalid(format!(
            "{side} {role} bitmap of {len_bytes} bytes is too small for {n} bits at {offset}"
        ))),
    }
}

fn copy_fixed(
    role: BufferRole,
    dst: &mut ArrayParts,
    dst_offset: usize,
    src: &ArrowVector<'_>,
    src_offset: usize,
    count: usize,
    width: usize,
) -> Result<()> {
    if src.buffer_id(role).is_none() {
        return Err(ArrowVecError::invalid(format!(
            "'{}' has no {role} buffer",
            src.arrow_type()
        )));
    }
    let src_bytes = src.buffer(role)?;
    let s = byte_range(src_offset, count, width, src_bytes.len(), "source", role)?;
    let dst_bytes = dst_buffer(dst, role)?;
    let d = byte_range(dst_offset, count, width, dst_bytes.len(), "destination", role)?;
    dst_bytes[d].copy_from_slice(&src_bytes[s]);
    Ok(())
}

fn copy_validity(
    dst: &mut ArrayParts,
    dst_offset: usize,
    src: &ArrowVector<'_>,
    src_offset: usize,
    n: usize,
) -> Result<()> {
    let role = BufferRole::Validity;
    let src_bits = src.validity()?;
    // A null destination bitmap already means all valid.
    let Some(dst_bits) = dst.buffer_mut(role).map(|b| b.as_mut_slice()) else {
        return match src_bits {
            None => Ok(()),
            Some(_) => Err(ArrowVecError::invalid("destination validity buffer is not allocated")),
        };
    };
    check_bits(dst_offset, n, dst_bits.len(), "destination", role)?;
    match src_bits {
        Some(bits) => {
            check_bits(src_offset, n, bits.len(), "source", role)?;
            copy_bits(dst_bits, dst_offset, bits, src_offset, n);
        }
        None => set_bits(dst_bits, dst_offset, n),
    }
    Ok(())
}

fn copy_bit_data(
    dst: &mut ArrayParts,
    dst_offset: usize,
    src: &ArrowVector<'_>,
    src_offset: usize,
    n: usize,
) -> Result<()> {
    let role = BufferRole::Data;
    let src_bits = src.buffer(role)?;
    check_bits(src_offset, n, src_bits.len(), "source", role)?;
    let dst_bits = dst_buffer(dst, role)?;
    check_bits(dst_offset, n, dst_bits.len(), "destination", role)?;
    copy_bits(dst_bits, dst_offset, src_bits, src_offset, n);
    Ok(())
}

/// Copies the bytes delimited by `src` offsets `[src_offset, src_offset + n]`
/// to the position given by destination offset `dst_offset`.
fn copy_variable(
    dst: &mut ArrayParts,
    dst_offset: usize,
    src: &ArrowVector<'_>,
    src_offset: usize,
    n: usize,
) -> Result<()> {
    let role = BufferRole::Data;
    let src_end = src_offset.checked_add(n).ok_or_else(|| {
        ArrowVecError::invalid(format!("element range {src_offset} + {n} overflows"))
    })?;
    let start = src.offset_value(src_offset)?;
    let end = src.offset_value(src_end)?;
    if start < 0 || end < start {
        return Err(ArrowVecError::invalid(format!(
            "invalid offsets [{start}, {end}] for elements {src_offset}..{src_end}"
        )));
    }
    let (start, len) = (start as usize, (end - start) as usize);
    let dst_pos = dst.offset_value(dst_offset)?;
    let dst_pos = usize::try_from(dst_pos)
        .map_err(|_| ArrowVecError::invalid(format!("negative destination offset {dst_pos}")))?;

    let src_bytes = src.buffer(role)?;
    let s = byte_range(start, len, 1, src_bytes.len(), "source", role)?;
    let dst_bytes = dst_buffer(dst, role)?;
    let d = byte_range(dst_pos, len, 1, dst_bytes.len(), "destination", role)?;
    dst_bytes[d].copy_from_slice(&src_bytes[s]);
    Ok(())
}
