//! # ArrowDType Module - *Arrow type tagging from C format strings*
//!
//! Closed representation of every logical type expressible in the
//! *Apache Arrow* C Data Interface format vocabulary.
//!
//! ## Overview
//! - [`ArrowType::parse`] is the hard validation boundary for format strings:
//!   every string either maps to exactly one variant or fails.
//! - [`ArrowType::format_string`] renders the canonical format string back.
//! - Dictionary encoding is not a variant: in the C interface it is signalled by
//!   the schema's `dictionary` child, with the format string naming the index type.
//!
//! ## Errors
//! - Empty strings, trailing characters, malformed parameters and missing `:`
//!   separators are `InvalidArgument`.
//! - Unknown leading tokens are `Unsupported`.
//!
//! ## Copyright Notice
//! - The term `Apache Arrow` is a trademark of the *Apache Software Foundation*.
//! - The term `Arrow` is used here under fair use to implement the public FFI compatibility standard,
//!   in accordance with the official guidance: <https://www.apache.org/foundation/marks/>.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::enums::error::{ArrowVecError, Result};
use crate::enums::time_units::{IntervalUnit, TimeUnit};

/// Sparse or dense union layout.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum UnionMode {
    Sparse,
    Dense,
}

/// # ArrowType
///
/// Logical type decoded from a C Data Interface format string.
///
/// ## Coverage
/// - **Primitives**: null, boolean, signed/unsigned integers, half/single/double floats,
///   decimals of 32 to 256 bits.
/// - **Variable width**: binary and utf8, plus their 64-bit offset "large" variants.
/// - **Fixed width binary** with an explicit byte width.
/// - **Temporal**: dates, times, timestamps with optional timezone, durations, intervals.
/// - **Nested**: list, large list, fixed-size list, struct, map, sparse and dense union.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub enum ArrowType {
    Null,
    Boolean,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float16,
    Float32,
    Float64,
    Decimal {
        precision: u32,
        scale: i32,
        bit_width: u32,
    },
    Binary,
    LargeBinary,
    Utf8,
    LargeUtf8,
    FixedSizeBinary(usize),
    Date32,
    Date64,
    Time32(TimeUnit),
    Time64(TimeUnit),
    Timestamp(TimeUnit, Option<String>),
    Duration(TimeUnit),
    Interval(IntervalUnit),
    List,
    LargeList,
    FixedSizeList(usize),
    Struct,
    Map,
    Union {
        mode: UnionMode,
        type_ids: Vec<i8>,
    },
}

impl ArrowType {
    /// Parses a C Data Interface format string.
    pub fn parse(format: &str) -> Result<ArrowType> {
        let bytes = format.as_bytes();
        let Some(&first) = bytes.first() else {
            return Err(ArrowVecError::invalid("format string is empty"));
        };

        let simple = match first {
            b'n' => Some(ArrowType::Null),
            b'b' => Some(ArrowType::Boolean),
            b'c' => Some(ArrowType::Int8),
            b'C' => Some(ArrowType::UInt8),
            b's' => Some(ArrowType::Int16),
            b'S' => Some(ArrowType::UInt16),
            b'i' => Some(ArrowType::Int32),
            b'I' => Some(ArrowType::UInt32),
            b'l' => Some(ArrowType::Int64),
            b'L' => Some(ArrowType::UInt64),
            b'e' => Some(ArrowType::Float16),
            b'f' => Some(ArrowType::Float32),
            b'g' => Some(ArrowType::Float64),
            b'z' => Some(ArrowType::Binary),
            b'Z' => Some(ArrowType::LargeBinary),
            b'u' => Some(ArrowType::Utf8),
            b'U' => Some(ArrowType::LargeUtf8),
            _ => None,
        };
        if let Some(dtype) = simple {
            if bytes.len() != 1 {
                return Err(trailing(format, 1));
            }
            return Ok(dtype);
        }

        match first {
            b'd' => parse_decimal(format),
            b'w' => {
                let width = parse_usize(param(format, 1)?, format)?;
                Ok(ArrowType::FixedSizeBinary(width))
            }
            b't' => parse_temporal(format),
            b'+' => parse_nested(format),
            _ => Err(ArrowVecError::Unsupported(format!(
                "unrecognised format string '{format}'"
            ))),
        }
    }

    /// Constructs the Arrow C format string for this type.
    pub fn format_string(&self) -> String {
        match self {
            ArrowType::Null => "n".into(),
            ArrowType::Boolean => "b".into(),
            ArrowType::Int8 => "c".into(),
            ArrowType::UInt8 => "C".into(),
            ArrowType::Int16 => "s".into(),
            ArrowType::UInt16 => "S".into(),
            ArrowType::Int32 => "i".into(),
            ArrowType::UInt32 => "I".into(),
            ArrowType::Int64 => "l".into(),
            ArrowType::UInt64 => "L".into(),
            ArrowType::Float16 => "e".into(),
            ArrowType::Float32 => "f".into(),
            ArrowType::Float64 => "g".into(),
            ArrowType::Decimal {
                precision,
                scale,
                bit_width,
            } => {
                if *bit_width == 128 {
                    format!("d:{precision},{scale}")
                } else {
                    format!("d:{precision},{scale},{bit_width}")
                }
            }
            ArrowType::Binary => "z".into(),
            ArrowType::LargeBinary => "Z".into(),
            ArrowType::Utf8 => "u".into(),
            ArrowType::LargeUtf8 => "U".into(),
            ArrowType::FixedSizeBinary(w) => format!("w:{w}"),
            ArrowType::Date32 => "tdD".into(),
            ArrowType::Date64 => "tdm".into(),
            ArrowType::Time32(u) | ArrowType::Time64(u) => format!("tt{}", u.code()),
            ArrowType::Timestamp(u, tz) => {
                format!("ts{}:{}", u.code(), tz.as_deref().unwrap_or(""))
            }
            ArrowType::Duration(u) => format!("tD{}", u.code()),
            ArrowType::Interval(u) => format!("ti{}", u.code()),
            ArrowType::List => "+l".into(),
            ArrowType::LargeList => "+L".into(),
            ArrowType::FixedSizeList(n) => format!("+w:{n}"),
            ArrowType::Struct => "+s".into(),
            ArrowType::Map => "+m".into(),
            ArrowType::Union { mode, type_ids } => {
                let ids = type_ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                match mode {
                    UnionMode::Sparse => format!("+us:{ids}"),
                    UnionMode::Dense => format!("+ud:{ids}"),
                }
            }
        }
    }

    /// True for the integer types allowed as dictionary indices.
    #[inline]
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ArrowType::Int8
                | ArrowType::UInt8
                | ArrowType::Int16
                | ArrowType::UInt16
                | ArrowType::Int32
                | ArrowType::UInt32
                | ArrowType::Int64
                | ArrowType::UInt64
        )
    }

    /// True for types that carry child arrays.
    #[inline]
    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            ArrowType::List
                | ArrowType::LargeList
                | ArrowType::FixedSizeList(_)
                | ArrowType::Struct
                | ArrowType::Map
                | ArrowType::Union { .. }
        )
    }
}

fn trailing(format: &str, at: usize) -> ArrowVecError {
    ArrowVecError::invalid(format!(
        "unexpected trailing characters '{}' in format string '{format}'",
        &format[at..]
    ))
}

/// Returns what follows the `:` expected at `at`.
fn param(format: &str, at: usize) -> Result<&str> {
    match format.as_bytes().get(at) {
        Some(b':') => Ok(&format[at + 1..]),
        _ => Err(ArrowVecError::invalid(format!(
            "expected ':' at position {at} in format string '{format}'"
        ))),
    }
}

fn parse_usize(s: &str, format: &str) -> Result<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ArrowVecError::invalid(format!(
            "expected a non-negative integer but found '{s}' in format string '{format}'"
        )));
    }
    s.parse::<usize>()
        .map_err(|_| ArrowVecError::invalid(format!("integer '{s}' out of range in '{format}'")))
}

fn parse_u32(s: &str, format: &str) -> Result<u32> {
    let v = parse_usize(s, format)?;
    u32::try_from(v)
        .map_err(|_| ArrowVecError::invalid(format!("integer '{s}' out of range in '{format}'")))
}

fn parse_decimal(format: &str) -> Result<ArrowType> {
    let parts: Vec<&str> = param(format, 1)?.split(',').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err(ArrowVecError::invalid(format!(
            "decimal format must be 'd:precision,scale[,bitwidth]' but found '{format}'"
        )));
    }
    let precision = parse_u32(parts[0], format)?;
    let scale = parts[1].parse::<i32>().map_err(|_| {
        ArrowVecError::invalid(format!("invalid decimal scale '{}' in '{format}'", parts[1]))
    })?;
    let bit_width = match parts.get(2) {
        Some(b) => parse_u32(b, format)?,
        None => 128,
    };
    if !matches!(bit_width, 32 | 64 | 128 | 256) {
        return Err(ArrowVecError::invalid(format!(
            "decimal bit width must be 32, 64, 128 or 256 but found {bit_width} in '{format}'"
        )));
    }
    Ok(ArrowType::Decimal {
        precision,
        scale,
        bit_width,
    })
}

fn parse_temporal(format: &str) -> Result<ArrowType> {
    let bytes = format.as_bytes();
    if bytes.len() < 3 {
        return Err(ArrowVecError::invalid(format!(
            "temporal format string '{format}' is truncated"
        )));
    }
    let unit_err = || {
        ArrowVecError::invalid(format!(
            "invalid unit '{}' in format string '{format}'",
            bytes[2] as char
        ))
    };
    let exact = |dtype: ArrowType| {
        if bytes.len() == 3 {
            Ok(dtype)
        } else {
            Err(trailing(format, 3))
        }
    };

    match bytes[1] {
        b'd' => match bytes[2] {
            b'D' => exact(ArrowType::Date32),
            b'm' => exact(ArrowType::Date64),
            _ => Err(unit_err()),
        },
        b't' => match TimeUnit::from_code(bytes[2]).ok_or_else(unit_err)? {
            u @ (TimeUnit::Seconds | TimeUnit::Milliseconds) => exact(ArrowType::Time32(u)),
            u => exact(ArrowType::Time64(u)),
        },
        b's' => {
            let unit = TimeUnit::from_code(bytes[2]).ok_or_else(unit_err)?;
            let tz = param(format, 3)?;
            let tz = if tz.is_empty() { None } else { Some(tz.to_string()) };
            Ok(ArrowType::Timestamp(unit, tz))
        }
        b'D' => {
            let unit = TimeUnit::from_code(bytes[2]).ok_or_else(unit_err)?;
            exact(ArrowType::Duration(unit))
        }
        b'i' => {
            let unit = IntervalUnit::from_code(bytes[2]).ok_or_else(unit_err)?;
            exact(ArrowType::Interval(unit))
        }
        _ => Err(ArrowVecError::Unsupported(format!(
            "unrecognised temporal format string '{format}'"
        ))),
    }
}

fn parse_nested(format: &str) -> Result<ArrowType> {
    let bytes = format.as_bytes();
    let Some(&kind) = bytes.get(1) else {
        return Err(ArrowVecError::invalid("nested format string '+' is truncated"));
    };
    let exact = |dtype: ArrowType| {
        if bytes.len() == 2 {
            Ok(dtype)
        } else {
            Err(trailing(format, 2))
        }
    };

    match kind {
        b'l' => exact(ArrowType::List),
        b'L' => exact(ArrowType::LargeList),
        b's' => exact(ArrowType::Struct),
        b'm' => exact(ArrowType::Map),
        b'w' => {
            let size = parse_usize(param(format, 2)?, format)?;
            Ok(ArrowType::FixedSizeList(size))
        }
        b'u' => {
            let mode = match bytes.get(2) {
                Some(b's') => UnionMode::Sparse,
                Some(b'd') => UnionMode::Dense,
                _ => {
                    return Err(ArrowVecError::invalid(format!(
                        "union format must start with '+us:' or '+ud:' but found '{format}'"
                    )));
                }
            };
            let ids = param(format, 3)?;
            let type_ids = if ids.is_empty() {
                Vec::new()
            } else {
                ids.split(',')
                    .map(|id| {
                        id.parse::<i8>().map_err(|_| {
                            ArrowVecError::invalid(format!(
                                "invalid union type id '{id}' in format string '{format}'"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            };
            Ok(ArrowType::Union { mode, type_ids })
        }
        _ => Err(ArrowVecError::Unsupported(format!(
            "unrecognised nested format string '{format}'"
        ))),
    }
}

impl Display for ArrowType {
    /// Render the ArrowType as its variant name, including parameters where applicable.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ArrowType::Null => f.write_str("Null"),
            ArrowType::Boolean => f.write_str("Boolean"),
            ArrowType::Int8 => f.write_str("Int8"),
            ArrowType::UInt8 => f.write_str("UInt8"),
            ArrowType::Int16 => f.write_str("Int16"),
            ArrowType::UInt16 => f.write_str("UInt16"),
            ArrowType::Int32 => f.write_str("Int32"),
            ArrowType::UInt32 => f.write_str("UInt32"),
            ArrowType::Int64 => f.write_str("Int64"),
            ArrowType::UInt64 => f.write_str("UInt64"),
            ArrowType::Float16 => f.write_str("Float16"),
            ArrowType::Float32 => f.write_str("Float32"),
            ArrowType::Float64 => f.write_str("Float64"),
            ArrowType::Decimal {
                precision,
                scale,
                bit_width,
            } => write!(f, "Decimal{bit_width}({precision}, {scale})"),
            ArrowType::Binary => f.write_str("Binary"),
            ArrowType::LargeBinary => f.write_str("LargeBinary"),
            ArrowType::Utf8 => f.write_str("Utf8"),
            ArrowType::LargeUtf8 => f.write_str("LargeUtf8"),
            ArrowType::FixedSizeBinary(w) => write!(f, "FixedSizeBinary({w})"),
            ArrowType::Date32 => f.write_str("Date32"),
            ArrowType::Date64 => f.write_str("Date64"),
            ArrowType::Time32(unit) => write!(f, "Time32({unit})"),
            ArrowType::Time64(unit) => write!(f, "Time64({unit})"),
            ArrowType::Timestamp(unit, None) => write!(f, "Timestamp({unit})"),
            ArrowType::Timestamp(unit, Some(tz)) => write!(f, "Timestamp({unit}, {tz})"),
            ArrowType::Duration(unit) => write!(f, "Duration({unit})"),
            ArrowType::Interval(unit) => write!(f, "Interval({unit})"),
            ArrowType::List => f.write_str("List"),
            ArrowType::LargeList => f.write_str("LargeList"),
            ArrowType::FixedSizeList(n) => write!(f, "FixedSizeList({n})"),
            ArrowType::Struct => f.write_str("Struct"),
            ArrowType::Map => f.write_str("Map"),
            ArrowType::Union { mode, type_ids } => write!(f, "Union({mode:?}, {type_ids:?})"),
        }
    }
}
