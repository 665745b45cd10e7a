//! # Layout Module - *Structural descriptor of a format string*
//!
//! Derives, for one logical type, how many buffers an `ArrowArray` must carry
//! and which buffer holds which role.
//!
//! ## Buffer ids
//! Ids index the *non-validity* buffers. Whether a validity bitmap occupies
//! slot 0 is only known once the layout is compared against a live array
//! (see [`ArrowVector::bind`](crate::ArrowVector::bind)), so the physical slot of
//! a role is `id + has_validity_buffer`.

use crate::enums::error::Result;
use crate::ffi::arrow_dtype::{ArrowType, UnionMode};

/// Width of one element of the primary data buffer.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ElementSize {
    /// No data buffer.
    None,
    /// Bit-packed, as in boolean arrays.
    Bit,
    /// Fixed number of bytes per element.
    Fixed(usize),
    /// Byte length is delimited by an offsets buffer.
    Variable,
}

/// # BufferLayout
///
/// Structural descriptor produced from a schema's format string.
///
/// ## Fields
/// - `arrow_type`: parsed logical type.
/// - `element_size`: width of the data buffer elements.
/// - `n_buffers`: declared buffer count, validity bitmap excluded.
/// - `*_buffer_id`: which non-validity buffer holds each role, if any.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct BufferLayout {
    pub arrow_type: ArrowType,
    pub element_size: ElementSize,
    pub n_buffers: usize,
    pub offset_buffer_id: Option<usize>,
    pub large_offset_buffer_id: Option<usize>,
    pub union_type_buffer_id: Option<usize>,
    pub data_buffer_id: Option<usize>,
}

/// Parses `format` into its [`BufferLayout`].
#[inline]
pub fn parse_format(format: &str) -> Result<BufferLayout> {
    BufferLayout::parse(format)
}

impl BufferLayout {
    /// Parses `format` and derives its buffer roles.
    pub fn parse(format: &str) -> Result<Self> {
        Ok(Self::for_type(ArrowType::parse(format)?))
    }

    /// Derives the buffer roles for an already parsed type.
    pub fn for_type(arrow_type: ArrowType) -> Self {
        let mut layout = BufferLayout {
            element_size: ElementSize::None,
            n_buffers: 0,
            offset_buffer_id: None,
            large_offset_buffer_id: None,
            union_type_buffer_id: None,
            data_buffer_id: None,
            arrow_type,
        };

        match &layout.arrow_type {
            ArrowType::Null | ArrowType::Struct | ArrowType::FixedSizeList(_) => {}
            ArrowType::Boolean => layout.data(ElementSize::Bit),
            ArrowType::Int8 | ArrowType::UInt8 => layout.data(ElementSize::Fixed(1)),
            ArrowType::Int16 | ArrowType::UInt16 | ArrowType::Float16 => {
                layout.data(ElementSize::Fixed(2))
            }
            ArrowType::Int32
            | ArrowType::UInt32
            | ArrowType::Float32
            | ArrowType::Date32
            | ArrowType::Time32(_) => layout.data(ElementSize::Fixed(4)),
            ArrowType::Int64
            | ArrowType::UInt64
            | ArrowType::Float64
            | ArrowType::Date64
            | ArrowType::Time64(_)
            | ArrowType::Timestamp(_, _)
            | ArrowType::Duration(_) => layout.data(ElementSize::Fixed(8)),
            ArrowType::Interval(unit) => layout.data(ElementSize::Fixed(unit.byte_width())),
            ArrowType::Decimal { bit_width, .. } => {
                layout.data(ElementSize::Fixed(*bit_width as usize / 8))
            }
            ArrowType::FixedSizeBinary(w) => layout.data(ElementSize::Fixed(*w)),
            ArrowType::Binary | ArrowType::Utf8 => {
                layout.n_buffers = 2;
                layout.offset_buffer_id = Some(0);
                layout.data_buffer_id = Some(1);
                layout.element_size = ElementSize::Variable;
            }
            ArrowType::LargeBinary | ArrowType::LargeUtf8 => {
                layout.n_buffers = 2;
                layout.large_offset_buffer_id = Some(0);
                layout.data_buffer_id = Some(1);
                layout.element_size = ElementSize::Variable;
            }
            ArrowType::List | ArrowType::Map => {
                layout.n_buffers = 1;
                layout.offset_buffer_id = Some(0);
            }
            ArrowType::LargeList => {
                layout.n_buffers = 1;
                layout.large_offset_buffer_id = Some(0);
            }
            ArrowType::Union { mode, .. } => {
                layout.union_type_buffer_id = Some(0);
                match mode {
                    UnionMode::Sparse => layout.n_buffers = 1,
                    UnionMode::Dense => {
                        layout.n_buffers = 2;
                        layout.offset_buffer_id = Some(1);
                    }
                }
            }
        }
        layout
    }

    #[inline]
    fn data(&mut self, size: ElementSize) {
        self.n_buffers = 1;
        self.data_buffer_id = Some(0);
        self.element_size = size;
    }

    /// Data element width in bytes, or `-1` when the payload is not fixed width.
    #[inline]
    pub fn element_size_bytes(&self) -> i64 {
        match self.element_size {
            ElementSize::Fixed(n) => n as i64,
            _ => -1,
        }
    }

    /// True when the offsets buffer holds one entry per row rather than `rows + 1`
    /// boundaries. Only dense unions do this.
    #[inline]
    pub fn offsets_per_row(&self) -> bool {
        matches!(
            self.arrow_type,
            ArrowType::Union {
                mode: UnionMode::Dense,
                ..
            }
        )
    }

    /// Id of the offsets buffer regardless of width, with `true` for 64-bit offsets.
    #[inline]
    pub fn any_offset_buffer(&self) -> Option<(usize, bool)> {
        match (self.offset_buffer_id, self.large_offset_buffer_id) {
            (Some(id), _) => Some((id, false)),
            (None, Some(id)) => Some((id, true)),
            (None, None) => None,
        }
    }

    /// `-1` sentinel form of an optional buffer id, as carried by the C structs.
    #[inline]
    pub fn raw_id(id: Option<usize>) -> i64 {
        id.map_or(-1, |i| i as i64)
    }
}
