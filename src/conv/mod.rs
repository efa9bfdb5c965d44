//! Binary codec
//!
//! [`BinaryCodec`] converts [`Value`]s to and from a compact, big-endian,
//! tag-prefixed byte layout. Every value is written as a 4-byte type tag
//! (see [`TypeTag`]) followed by a payload:
//!
//! | value               | payload                                               |
//! |---------------------|-------------------------------------------------------|
//! | null                | none (tag `0`)                                        |
//! | scalars             | 1, 1, 2, 4, 8, 4 or 8 bytes (bool .. float64)         |
//! | string              | 4-byte length, UTF-8 bytes                            |
//! | byte-sequence       | 4-byte length, raw bytes                              |
//! | list                | 4-byte element count, each element in full            |
//! | record              | each schema field in order                            |
//!
//! Inside a record, primitive fields are written as a bare payload, since
//! their type is known from the schema. Every other field is written in full,
//! tag included, so that it can be null.
//!
//! The format carries no magic number or version: both ends must share the
//! same registration set.
//!
//! Decoding is exact: a value whose tag does not match the Rust type of its
//! destination field is rejected, never cast. Lists and records may nest at
//! most [`MAX_DEPTH`] levels deep.
//!
//! # Example
//!
//! ```
//! use plaindata::{BinaryCodec, Record, Registry};
//!
//! #[derive(Record, Debug, Default, Clone, PartialEq)]
//! #[record(name = "Point")]
//! struct Point {
//!     #[serial]
//!     x: i32,
//!     #[serial]
//!     y: i32,
//! }
//!
//! let mut registry = Registry::new();
//! registry.register::<Point>().unwrap();
//! let codec = BinaryCodec::new(&registry);
//!
//! let bytes = codec.encode_record(&Point { x: 3, y: -7 }).unwrap();
//! assert_eq!(bytes, [0, 0, 0, 10, 0, 0, 0, 3, 0xff, 0xff, 0xff, 0xf9]);
//! assert_eq!(codec.decode_record::<Point>(&bytes).unwrap(), Point { x: 3, y: -7 });
//! ```

pub mod target;

use std::io::{Read, Write};

use crate::error::{AccessError, MalformedInput, Result};
use crate::parse::{ByteParser, ParseResult, Parser, ReadParser};
use crate::registry::{RegisteredType, Registry, Tables, TypeRef, TypeTag};
use crate::schema::{FieldKind, Scalar};
use crate::value::{Object, Record, Value};

use self::target::{ByteCounter, Target};

/// Upper bound on the capacity reserved up front for a decoded list, whatever
/// its length prefix claims.
const LIST_PREALLOC: usize = 1024;

/// Deepest nesting of lists and records accepted by the decoder
pub const MAX_DEPTH: usize = 256;

/// Converts values to and from the binary wire format, against a registry
///
/// The registry is locked on first use.
#[derive(Debug, Clone, Copy)]
pub struct BinaryCodec<'r> {
    registry: &'r Registry,
}

impl<'r> BinaryCodec<'r> {
    #[inline]
    #[must_use]
    pub const fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Appends the encoding of `value` to `buf`, returning the number of
    /// bytes written.
    ///
    /// # Errors
    ///
    /// Fails with a [`RegistrationError`](crate::error::RegistrationError) if
    /// `value` holds a record of an unregistered type. When that record is the
    /// top-level value, nothing is written; bytes already written for
    /// enclosing values are not rolled back.
    pub fn encode<U: Target>(&self, value: &Value, buf: &mut U) -> Result<usize> {
        let tables = self.registry.tables()?;
        write_value(tables, value, buf)
    }

    /// Encodes `value` into a fresh buffer.
    pub fn to_bytes(&self, value: &Value) -> Result<Vec<u8>> {
        let mut buf = Vec::create();
        self.encode(value, &mut buf)?;
        Ok(buf)
    }

    /// Computes the encoded length of `value` without allocating.
    pub fn encoded_len(&self, value: &Value) -> Result<usize> {
        self.encode(value, &mut ByteCounter::create())
    }

    /// Encodes a record directly, without wrapping it in a [`Value`].
    pub fn encode_record<R: Record>(&self, record: &R) -> Result<Vec<u8>> {
        let tables = self.registry.tables()?;
        let mut buf = Vec::create();
        write_record(tables, record, &mut buf)?;
        Ok(buf)
    }

    /// Encodes `value` and writes it to `out` in one call.
    pub fn write_to<W: Write>(&self, value: &Value, mut out: W) -> Result<usize> {
        let buf = self.to_bytes(value)?;
        out.write_all(&buf)?;
        Ok(buf.len())
    }

    /// Reads one complete value from `p`.
    ///
    /// # Errors
    ///
    /// * [`UnknownType::Tag`](crate::error::UnknownType::Tag) for a tag that
    ///   is neither built-in nor assigned
    /// * [`MalformedInput::TruncatedStream`] if `p` runs out mid-value
    /// * [`MalformedInput::NestingTooDeep`] past [`MAX_DEPTH`] nested lists
    ///   and records
    /// * [`AccessError`] if a decoded field does not fit its record field
    pub fn decode<P: Parser>(&self, p: &mut P) -> Result<Value> {
        let tables = self.registry.tables()?;
        read_value(tables, p, 0)
    }

    /// Decodes a value from a byte buffer.
    ///
    /// With the `check_complete_parse` feature, any bytes left after the value
    /// are reported as [`MalformedInput::TrailingBytes`].
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<Value> {
        let mut p = ByteParser::new(bytes);
        let value = self.decode(&mut p)?;
        check_complete(&p)?;
        Ok(value)
    }

    /// Decodes a record of type `R` from a byte buffer.
    ///
    /// # Errors
    ///
    /// In addition to the errors of [`from_bytes`](Self::from_bytes), fails
    /// with [`AccessError`] if the buffer holds anything other than an `R`.
    pub fn decode_record<R: Record>(&self, bytes: &[u8]) -> Result<R> {
        Ok(self.from_bytes(bytes)?.into_record::<R>()?)
    }

    /// Reads one value from a byte stream, blocking as the stream blocks.
    ///
    /// The stream is left positioned after the value, so several values can
    /// be read back to back from the same source by passing `&mut reader`.
    pub fn read_from<R: Read>(&self, input: R) -> Result<Value> {
        self.decode(&mut ReadParser::new(input))
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "check_complete_parse")] {
        fn check_complete(p: &ByteParser<'_>) -> ParseResult<()> {
            match p.remainder() {
                0 => Ok(()),
                n => Err(MalformedInput::TrailingBytes(n)),
            }
        }
    } else {
        #[inline(always)]
        fn check_complete(_: &ByteParser<'_>) -> ParseResult<()> {
            Ok(())
        }
    }
}

#[inline]
fn write_tag<U: Target>(tag: TypeTag, buf: &mut U) -> usize {
    buf.push_many(tag.to_be_bytes())
}

fn write_len<U: Target>(len: usize, buf: &mut U) -> ParseResult<usize> {
    let len = u32::try_from(len).map_err(|_| MalformedInput::LengthOverflow(len))?;
    Ok(buf.push_many(len.to_be_bytes()))
}

/// Writes the bare payload of a scalar value, or returns `None` if `value` is
/// not a scalar.
fn write_scalar<U: Target>(value: &Value, buf: &mut U) -> Option<usize> {
    Some(match *value {
        Value::Bool(b) => buf.push_one(u8::from(b)),
        Value::Int8(x) => buf.push_many(x.to_be_bytes()),
        Value::Int16(x) => buf.push_many(x.to_be_bytes()),
        Value::Int32(x) => buf.push_many(x.to_be_bytes()),
        Value::Int64(x) => buf.push_many(x.to_be_bytes()),
        Value::Float32(x) => buf.push_many(x.to_be_bytes()),
        Value::Float64(x) => buf.push_many(x.to_be_bytes()),
        _ => return None,
    })
}

fn write_value<U: Target>(tables: &Tables, value: &Value, buf: &mut U) -> Result<usize> {
    match value {
        Value::Null => Ok(write_tag(TypeTag::NULL, buf)),
        Value::Str(s) => {
            buf.anticipate(8 + s.len());
            Ok(write_tag(TypeTag::STRING, buf) + write_len(s.len(), buf)? + buf.push_all(s.as_bytes()))
        }
        Value::Bytes(bytes) => {
            buf.anticipate(8 + bytes.len());
            Ok(write_tag(TypeTag::BYTES, buf) + write_len(bytes.len(), buf)? + buf.push_all(bytes))
        }
        Value::List(items) => {
            let mut n = write_tag(TypeTag::LIST, buf) + write_len(items.len(), buf)?;
            for item in items {
                n += write_value(tables, item, buf)?;
            }
            Ok(n)
        }
        Value::Record(obj) => write_record(tables, obj.as_ref(), buf),
        scalar => {
            let tag = Scalar::of(scalar).map_or(TypeTag::NULL, TypeTag::of_scalar);
            let n = write_tag(tag, buf);
            Ok(n + write_scalar(scalar, buf).unwrap_or_default())
        }
    }
}

fn write_record<U: Target>(tables: &Tables, obj: &dyn Object, buf: &mut U) -> Result<usize> {
    let ty: &RegisteredType = tables.of_object(obj)?;
    log::trace!("encoding `{}` as tag {}", ty.name(), ty.tag());

    let mut n = write_tag(ty.tag(), buf);
    for field in ty.schema() {
        let value = field.get(obj)?;
        n += match field.kind() {
            FieldKind::Primitive(scalar) if Scalar::of(&value) == Some(scalar) => {
                write_scalar(&value, buf).unwrap_or_default()
            }
            FieldKind::Primitive(scalar) => {
                return Err(AccessError::Mismatch {
                    expected: scalar.name(),
                    found: value.kind_name(),
                }
                .into())
            }
            _ => write_value(tables, &value, buf)?,
        };
    }
    Ok(n)
}

fn read_scalar<P: Parser>(scalar: Scalar, p: &mut P) -> ParseResult<Value> {
    Ok(match scalar {
        Scalar::Bool => Value::Bool(p.take_bool()?),
        Scalar::Int8 => Value::Int8(p.take_i8()?),
        Scalar::Int16 => Value::Int16(p.take_i16()?),
        Scalar::Int32 => Value::Int32(p.take_i32()?),
        Scalar::Int64 => Value::Int64(p.take_i64()?),
        Scalar::Float32 => Value::Float32(p.take_f32()?),
        Scalar::Float64 => Value::Float64(p.take_f64()?),
    })
}

fn read_value<P: Parser>(tables: &Tables, p: &mut P, depth: usize) -> Result<Value> {
    let tag = TypeTag::new(p.take_u32()?);
    match tables.resolve(tag)? {
        TypeRef::Null => Ok(Value::Null),
        TypeRef::Scalar(scalar) => Ok(read_scalar(scalar, p)?),
        TypeRef::Str => {
            let len = p.take_len()?;
            let buf = p.take_dynamic(len)?;
            let s = String::from_utf8(buf).map_err(|_| MalformedInput::InvalidUtf8)?;
            Ok(Value::Str(s))
        }
        TypeRef::Bytes => {
            let len = p.take_len()?;
            Ok(Value::Bytes(p.take_dynamic(len)?))
        }
        TypeRef::List => {
            let depth = descend(depth)?;
            let len = p.take_len()?;
            let mut items = Vec::with_capacity(len.min(LIST_PREALLOC));
            for _ in 0..len {
                items.push(read_value(tables, p, depth)?);
            }
            Ok(Value::List(items))
        }
        TypeRef::Record(ty) => read_record(tables, ty, p, descend(depth)?),
    }
}

#[inline]
fn descend(depth: usize) -> ParseResult<usize> {
    if depth < MAX_DEPTH {
        Ok(depth + 1)
    } else {
        Err(MalformedInput::NestingTooDeep(MAX_DEPTH))
    }
}

fn read_record<P: Parser>(
    tables: &Tables,
    ty: &RegisteredType,
    p: &mut P,
    depth: usize,
) -> Result<Value> {
    log::trace!("decoding `{}` at offset {}", ty.name(), p.offset());

    let mut obj = ty.instantiate();
    for field in ty.schema() {
        let value = match field.kind() {
            FieldKind::Primitive(scalar) => read_scalar(scalar, p)?,
            _ => read_value(tables, p, depth)?,
        };
        field.set(obj.as_mut(), value)?;
    }
    Ok(Value::Record(obj))
}
