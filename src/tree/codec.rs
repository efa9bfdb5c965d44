//! Conversion between typed values and [`Tree`]s
//!
//! Flattening maps every record to a [`Map`] whose first entry is
//! [`CLASS_NAME_KEY`], followed by one entry per non-null schema field in
//! schema order. Numeric leaves are widened to `i64`/`f64`; inflating narrows
//! them back to the width of the destination field with a truncating cast,
//! list elements included (see [`Field::from_widened`]).
//!
//! [`Field::from_widened`]: crate::schema::Field::from_widened
//!
//! Because null fields are omitted, a null field and an absent one are
//! indistinguishable after a round trip through the tree form.

use std::io::{Read, Write};

use crate::error::{AccessError, Result, UnknownType};
use crate::registry::{Registry, Tables};
use crate::schema::{FieldKind, Scalar};
use crate::text::{self, ReadSource, Style};
use crate::value::{Object, Record, Value};

use super::{Map, Tree};

/// Reserved map key holding the qualified name of a flattened record
pub const CLASS_NAME_KEY: &str = "className";

/// Converts values to and from trees (and hence text), against a registry
///
/// The registry is locked on first use.
#[derive(Debug, Clone, Copy)]
pub struct TreeCodec<'r> {
    registry: &'r Registry,
}

impl<'r> TreeCodec<'r> {
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

    /// Converts a value into its tree form.
    ///
    /// A record of an unregistered type cannot be represented faithfully. It
    /// is flattened into a string leaf holding its debug representation, and
    /// a warning is logged.
    pub fn flatten(&self, value: &Value) -> Result<Tree> {
        let tables = self.registry.tables()?;
        Ok(flatten_value(tables, value)?)
    }

    /// Rebuilds a value from its tree form.
    ///
    /// Maps are read as records; every other node maps onto the [`Value`] of
    /// the same shape, with integers as `Int64` and floats as `Float64`.
    ///
    /// # Errors
    ///
    /// * [`UnknownType::MissingClassName`] for a map without a string
    ///   `className` entry
    /// * [`UnknownType::ClassName`] if that entry names an unregistered type
    /// * [`AccessError`] if an entry does not fit its record field
    pub fn inflate(&self, tree: Tree) -> Result<Value> {
        let tables = self.registry.tables()?;
        inflate_any(tables, tree)
    }

    /// Writes `value` as text.
    pub fn to_json(&self, value: &Value, style: Style) -> Result<String> {
        Ok(text::to_string(&self.flatten(value)?, style))
    }

    /// Writes `value` as text into a byte sink.
    pub fn write_json<W: Write>(&self, value: &Value, mut out: W, style: Style) -> Result<()> {
        out.write_all(self.to_json(value, style)?.as_bytes())?;
        Ok(())
    }

    /// Writes a record as text, without wrapping it in a [`Value`].
    pub fn to_json_record<R: Record>(&self, record: &R, style: Style) -> Result<String> {
        let tables = self.registry.tables()?;
        let tree = flatten_object(tables, record)?;
        Ok(text::to_string(&tree, style))
    }

    /// Reads a value from text.
    pub fn from_json(&self, input: &str) -> Result<Value> {
        let tree = text::read(&mut input.chars())?;
        self.inflate(tree)
    }

    /// Reads a value from a UTF-8 byte source.
    pub fn read_json<R: Read>(&self, input: R) -> Result<Value> {
        let tree = text::read(&mut ReadSource::new(input))?;
        self.inflate(tree)
    }

    /// Reads a record of type `R` from text.
    ///
    /// # Errors
    ///
    /// In addition to the errors of [`from_json`](Self::from_json), fails
    /// with [`AccessError`] if the text holds anything other than an `R`.
    pub fn from_json_record<R: Record>(&self, input: &str) -> Result<R> {
        Ok(self.from_json(input)?.into_record::<R>()?)
    }
}

fn flatten_value(tables: &Tables, value: &Value) -> std::result::Result<Tree, AccessError> {
    Ok(match value {
        Value::Null => Tree::Null,
        Value::Bool(b) => Tree::Bool(*b),
        Value::Int8(x) => Tree::Int(i64::from(*x)),
        Value::Int16(x) => Tree::Int(i64::from(*x)),
        Value::Int32(x) => Tree::Int(i64::from(*x)),
        Value::Int64(x) => Tree::Int(*x),
        Value::Float32(x) => Tree::Float(f64::from(*x)),
        Value::Float64(x) => Tree::Float(*x),
        Value::Str(s) => Tree::Str(s.clone()),
        Value::Bytes(bytes) => Tree::Seq(bytes.iter().map(|&b| Tree::Int(i64::from(b))).collect()),
        Value::List(items) => Tree::Seq(
            items
                .iter()
                .map(|item| flatten_value(tables, item))
                .collect::<std::result::Result<_, _>>()?,
        ),
        Value::Record(obj) => flatten_object(tables, obj.as_ref())?,
    })
}

fn flatten_object(tables: &Tables, obj: &dyn Object) -> std::result::Result<Tree, AccessError> {
    let ty = match tables.of_object(obj) {
        Ok(ty) => ty,
        Err(err) => {
            log::warn!("{err}; flattening as its debug representation");
            return Ok(Tree::Str(format!("{obj:?}")));
        }
    };
    log::trace!("flattening `{}`", ty.name());

    let mut map = Map::with_capacity(ty.schema().len() + 1);
    map.insert(CLASS_NAME_KEY, Tree::Str(ty.name().to_owned()));
    for field in ty.schema() {
        let value = field.get(obj)?;
        if !value.is_null() {
            map.insert(field.name(), flatten_value(tables, &value)?);
        }
    }
    Ok(Tree::Map(map))
}

fn inflate_any(tables: &Tables, tree: Tree) -> Result<Value> {
    Ok(match tree {
        Tree::Null => Value::Null,
        Tree::Bool(b) => Value::Bool(b),
        Tree::Int(x) => Value::Int64(x),
        Tree::Float(x) => Value::Float64(x),
        Tree::Str(s) => Value::Str(s),
        Tree::Seq(items) => Value::List(
            items
                .into_iter()
                .map(|item| inflate_any(tables, item))
                .collect::<Result<_>>()?,
        ),
        Tree::Map(map) => inflate_record(tables, map)?,
    })
}

fn inflate_record(tables: &Tables, mut map: Map) -> Result<Value> {
    let name = match map.remove(CLASS_NAME_KEY) {
        Some(Tree::Str(name)) => name,
        _ => return Err(UnknownType::MissingClassName.into()),
    };
    let ty = tables
        .by_name(&name)
        .ok_or(UnknownType::ClassName(name))?;
    log::trace!("inflating `{}`", ty.name());

    let mut obj = ty.instantiate();
    for field in ty.schema() {
        match map.remove(field.name()) {
            None | Some(Tree::Null) => {}
            Some(entry) => {
                let value = inflate_field(tables, field.name(), field.kind(), entry)?;
                field.set_widened(obj.as_mut(), value)?;
            }
        }
    }
    if !map.is_empty() {
        log::trace!(
            "ignoring unknown entries of `{}`: {:?}",
            ty.name(),
            map.keys().collect::<Vec<_>>()
        );
    }
    Ok(Value::Record(obj))
}

/// Inflates a map entry into the shape its destination field expects.
fn inflate_field(tables: &Tables, name: &str, kind: FieldKind, entry: Tree) -> Result<Value> {
    match (kind, entry) {
        (FieldKind::Primitive(scalar) | FieldKind::Boxed(scalar), leaf) => {
            Ok(narrow(name, scalar, leaf)?)
        }
        (FieldKind::Bytes, Tree::Seq(items)) => Ok(Value::Bytes(
            items
                .into_iter()
                .map(|item| match item {
                    Tree::Int(x) => Ok(narrow_byte(name, x)),
                    other => Err(AccessError::Mismatch {
                        expected: "byte",
                        found: other.kind_name(),
                    }),
                })
                .collect::<std::result::Result<_, _>>()?,
        )),
        (_, entry) => inflate_any(tables, entry),
    }
}

fn narrow_byte(name: &str, x: i64) -> u8 {
    if u8::try_from(x).is_err() {
        log::warn!("byte {x} of field `{name}` truncated");
    }
    x as u8
}

fn narrow_int(scalar: Scalar, x: i64) -> (Value, bool) {
    match scalar {
        Scalar::Int8 => (Value::Int8(x as i8), i8::try_from(x).is_ok()),
        Scalar::Int16 => (Value::Int16(x as i16), i16::try_from(x).is_ok()),
        Scalar::Int32 => (Value::Int32(x as i32), i32::try_from(x).is_ok()),
        Scalar::Float32 => (Value::Float32(x as f32), x as f32 as i64 == x),
        Scalar::Float64 => (Value::Float64(x as f64), x as f64 as i64 == x),
        Scalar::Int64 | Scalar::Bool => (Value::Int64(x), true),
    }
}

/// Casts a widened numeric leaf to the width of its destination field.
///
/// The cast truncates; a lossy cast is logged but not rejected.
fn narrow(name: &str, scalar: Scalar, leaf: Tree) -> std::result::Result<Value, AccessError> {
    let (value, exact) = match (scalar, leaf) {
        (Scalar::Bool, Tree::Bool(b)) => (Value::Bool(b), true),
        (Scalar::Bool, other) => {
            return Err(AccessError::Mismatch {
                expected: "bool",
                found: other.kind_name(),
            })
        }
        (_, Tree::Int(x)) => narrow_int(scalar, x),
        (Scalar::Float32, Tree::Float(x)) => {
            let y = x as f32;
            (Value::Float32(y), f64::from(y) == x || x.is_nan())
        }
        (Scalar::Float64, Tree::Float(x)) => (Value::Float64(x), true),
        (_, Tree::Float(x)) => {
            let (value, exact) = narrow_int(scalar, x as i64);
            (value, exact && x.fract() == 0.0)
        }
        (_, other) => {
            return Err(AccessError::Mismatch {
                expected: scalar.name(),
                found: other.kind_name(),
            })
        }
    };
    if !exact {
        log::warn!("value of field `{name}` does not fit in {scalar}; truncated");
    }
    Ok(value)
}
