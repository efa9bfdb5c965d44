//! Schema-driven binary and text serialization of plain-data records
//!
//! # Overview
//!
//! This library converts application-defined records (plain structs made of
//! scalars, strings, byte-sequences, lists, and other records) to and from two
//! interchangeable encodings, without any hand-written per-type marshalling:
//!
//!   * a compact, big-endian, tag-prefixed binary format ([`BinaryCodec`])
//!   * a JSON-like text format ([`TreeCodec`], by way of the generic [`Tree`])
//!
//! Both codecs are driven by the field schemas held in a [`Registry`]. A
//! record type supplies its schema through the [`Record`] trait, which is
//! normally derived: the derive macro lists every field carrying the
//! `#[serial]` marker, together with a type-erased accessor and mutator.
//!
//! # Lifecycle
//!
//! All record types are registered during an initialization phase. The
//! registry then *locks*, either explicitly or on first use by a codec, at
//! which point each type is assigned its numeric [`TypeTag`]: built-in types
//! occupy fixed tags `1..=9`, and registered records are numbered from `10` in
//! ascending order of qualified name. Two registries holding the same set of
//! types therefore agree on every tag, which is what makes the binary format
//! portable between processes.
//!
//! A locked registry is immutable, and codecs borrow it for their whole
//! lifetime, so it can be shared freely between threads.
//!
//! # Example
//!
//! ```
//! use plaindata::{BinaryCodec, Record, Registry, Style, TreeCodec};
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
//!
//! let point = Point { x: 3, y: -7 };
//!
//! let binary = BinaryCodec::new(&registry);
//! let bytes = binary.encode_record(&point).unwrap();
//! assert_eq!(binary.decode_record::<Point>(&bytes).unwrap(), point);
//!
//! let text = TreeCodec::new(&registry);
//! let json = text.to_json_record(&point, Style::Compact).unwrap();
//! assert_eq!(json, r#"{"className":"Point","x":3,"y":-7}"#);
//! assert_eq!(text.from_json_record::<Point>(&json).unwrap(), point);
//! ```
//!
//! # Limitations
//!
//! The binary format carries no magic number, version, or schema, and there is
//! no support for schema evolution. Values are encoded by recursion over the
//! value graph, so cyclic structures cannot be represented. The text path
//! widens every integer to 64 bits and narrows it back with a truncating cast,
//! and does not distinguish a null field from an absent one.

extern crate self as plaindata;

pub mod conv;
pub mod error;
pub mod parse;
pub mod prelude;
pub mod registry;
pub mod schema;
pub mod text;
pub mod tree;
pub mod value;

#[cfg(test)]
mod testing;

pub use crate::conv::{target::Target, BinaryCodec};
pub use crate::error::{Error, Result};
pub use crate::parse::{ByteParser, ParseResult, Parser, ReadParser};
pub use crate::registry::{RegisteredType, Registry, TypeRef, TypeTag};
pub use crate::schema::{Bytes, Field, FieldDescriptor, FieldKind, Scalar, Schema};
pub use crate::text::Style;
pub use crate::tree::{Map, Tree, TreeCodec};
pub use crate::value::{Object, Record, Value};

pub use ::lazy_static::lazy_static;
pub use ::record_derive::Record;
