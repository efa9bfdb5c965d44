//! Field schemas
//!
//! A record's schema is an ordered list of [`FieldDescriptor`]s, each pairing
//! a field name with its semantic [`FieldKind`] and a type-erased accessor and
//! mutator. Descriptors are built explicitly (by hand or by the `Record`
//! derive macro) from the [`Field`] implementation of each field's Rust type,
//! so no runtime introspection is involved.
//!
//! # Field kinds
//!
//! Only [`FieldKind::Primitive`] fields are written in the untagged fixed-width
//! layout inside a binary record; every other kind is a *reference* field,
//! which may be null and is encoded in full, with its own type tag.
//!
//! | Rust type           | kind                        |
//! |---------------------|-----------------------------|
//! | `bool`, `i8`..`f64` | `Primitive(_)`              |
//! | `Option<i32>` etc.  | `Boxed(_)`                  |
//! | `String`            | `Str`                       |
//! | [`Bytes`]           | `Bytes`                     |
//! | `Vec<T>`            | `List`                      |
//! | derived records     | `Record(name)`              |
//!
//! `Option<T>` over any non-scalar kind keeps the kind of `T`, and only
//! changes whether null is accepted.

use std::fmt::{self, Debug, Display};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::error::AccessError;
use crate::value::{Object, Record, Value};

/// Fixed-width scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scalar {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl Scalar {
    /// All scalar types, in type-tag order
    pub const ALL: [Scalar; 7] = [
        Scalar::Bool,
        Scalar::Int8,
        Scalar::Int16,
        Scalar::Int32,
        Scalar::Int64,
        Scalar::Float32,
        Scalar::Float64,
    ];

    /// Number of bytes in the binary payload of this scalar
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Scalar::Bool | Scalar::Int8 => 1,
            Scalar::Int16 => 2,
            Scalar::Int32 | Scalar::Float32 => 4,
            Scalar::Int64 | Scalar::Float64 => 8,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Scalar::Bool => "bool",
            Scalar::Int8 => "int8",
            Scalar::Int16 => "int16",
            Scalar::Int32 => "int32",
            Scalar::Int64 => "int64",
            Scalar::Float32 => "float32",
            Scalar::Float64 => "float64",
        }
    }

    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            Scalar::Int8 | Scalar::Int16 | Scalar::Int32 | Scalar::Int64
        )
    }

    /// Returns the scalar type of a value, if it has one.
    #[must_use]
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) => Some(Scalar::Bool),
            Value::Int8(_) => Some(Scalar::Int8),
            Value::Int16(_) => Some(Scalar::Int16),
            Value::Int32(_) => Some(Scalar::Int32),
            Value::Int64(_) => Some(Scalar::Int64),
            Value::Float32(_) => Some(Scalar::Float32),
            Value::Float64(_) => Some(Scalar::Float64),
            _ => None,
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Semantic type of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Non-nullable scalar, written untagged inside a binary record
    Primitive(Scalar),
    /// Nullable scalar, written as a full tagged value
    Boxed(Scalar),
    Str,
    Bytes,
    List,
    /// Nested record of the named type
    Record(&'static str),
}

impl FieldKind {
    /// Returns the nullable counterpart of this kind.
    ///
    /// Only primitive kinds change; all other kinds are already references.
    #[must_use]
    pub const fn boxed(self) -> Self {
        match self {
            FieldKind::Primitive(s) => FieldKind::Boxed(s),
            other => other,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        matches!(self, FieldKind::Primitive(_))
    }

    /// Returns the scalar type behind a primitive or boxed kind.
    #[must_use]
    pub const fn scalar(self) -> Option<Scalar> {
        match self {
            FieldKind::Primitive(s) | FieldKind::Boxed(s) => Some(s),
            _ => None,
        }
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Primitive(s) => Display::fmt(s, f),
            FieldKind::Boxed(s) => write!(f, "{s}?"),
            FieldKind::Str => f.write_str("string"),
            FieldKind::Bytes => f.write_str("byte-sequence"),
            FieldKind::List => f.write_str("list"),
            FieldKind::Record(name) => f.write_str(name),
        }
    }
}

/// Conversion between a Rust field type and [`Value`]
///
/// [`from_value`](Field::from_value) only accepts the exact `Value` variant
/// that [`to_value`](Field::to_value) produces.
/// [`from_widened`](Field::from_widened) additionally casts any numeric
/// variant to the width of the field, so that elements widened to
/// `Int64`/`Float64` by the text path can be narrowed back.
pub trait Field: Sized + 'static {
    const KIND: FieldKind;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, AccessError>;

    /// Lenient form of [`from_value`](Field::from_value), narrowing numeric
    /// values with a truncating cast.
    fn from_widened(value: Value) -> Result<Self, AccessError> {
        Self::from_value(value)
    }
}

fn mismatch(expected: &'static str, found: &Value) -> AccessError {
    AccessError::Mismatch {
        expected,
        found: found.kind_name(),
    }
}

impl Field for bool {
    const KIND: FieldKind = FieldKind::Primitive(Scalar::Bool);

    #[inline]
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, AccessError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Null => Err(AccessError::Null("bool")),
            other => Err(mismatch("bool", &other)),
        }
    }
}

macro_rules! numeric_field {
    ($($t:ty => $variant:ident, $scalar:ident);* $(;)?) => {
        $(
            impl Field for $t {
                const KIND: FieldKind = FieldKind::Primitive(Scalar::$scalar);

                #[inline]
                fn to_value(&self) -> Value {
                    Value::$variant(*self)
                }

                fn from_value(value: Value) -> Result<Self, AccessError> {
                    let name = Scalar::$scalar.name();
                    match value {
                        Value::$variant(x) => Ok(x),
                        Value::Null => Err(AccessError::Null(name)),
                        other => Err(mismatch(name, &other)),
                    }
                }

                fn from_widened(value: Value) -> Result<Self, AccessError> {
                    let name = Scalar::$scalar.name();
                    match value {
                        Value::Int8(x) => Ok(x as $t),
                        Value::Int16(x) => Ok(x as $t),
                        Value::Int32(x) => Ok(x as $t),
                        Value::Int64(x) => Ok(x as $t),
                        Value::Float32(x) => Ok(x as $t),
                        Value::Float64(x) => Ok(x as $t),
                        Value::Null => Err(AccessError::Null(name)),
                        other => Err(mismatch(name, &other)),
                    }
                }
            }
        )*
    };
}

numeric_field! {
    i8 => Int8, Int8;
    i16 => Int16, Int16;
    i32 => Int32, Int32;
    i64 => Int64, Int64;
    f32 => Float32, Float32;
    f64 => Float64, Float64;
}

impl Field for String {
    const KIND: FieldKind = FieldKind::Str;

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, AccessError> {
        match value {
            Value::Str(s) => Ok(s),
            Value::Null => Err(AccessError::Null("string")),
            other => Err(mismatch("string", &other)),
        }
    }
}

/// Variable-length opaque byte-sequence
///
/// Newtype around `Vec<u8>` that distinguishes a byte-sequence field from a
/// list of integers.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Default)]
#[repr(transparent)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(buf: Vec<u8>) -> Self {
        Self(buf)
    }
}

impl From<&[u8]> for Bytes {
    fn from(buf: &[u8]) -> Self {
        Self(buf.to_vec())
    }
}

impl From<Bytes> for Vec<u8> {
    fn from(val: Bytes) -> Self {
        val.0
    }
}

impl Deref for Bytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Bytes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Field for Bytes {
    const KIND: FieldKind = FieldKind::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(self.0.clone())
    }

    fn from_value(value: Value) -> Result<Self, AccessError> {
        match value {
            Value::Bytes(buf) => Ok(Self(buf)),
            Value::Null => Err(AccessError::Null("byte-sequence")),
            other => Err(mismatch("byte-sequence", &other)),
        }
    }

    fn from_widened(value: Value) -> Result<Self, AccessError> {
        match value {
            Value::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Int64(x) => Ok(x as u8),
                    other => Err(mismatch("byte", &other)),
                })
                .collect::<Result<Vec<u8>, _>>()
                .map(Self),
            other => Self::from_value(other),
        }
    }
}

impl<T: Field> Field for Vec<T> {
    const KIND: FieldKind = FieldKind::List;

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Field::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, AccessError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            Value::Null => Err(AccessError::Null("list")),
            other => Err(mismatch("list", &other)),
        }
    }

    fn from_widened(value: Value) -> Result<Self, AccessError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_widened).collect(),
            other => Self::from_value(other),
        }
    }
}

impl<T: Field> Field for Option<T> {
    const KIND: FieldKind = T::KIND.boxed();

    fn to_value(&self) -> Value {
        match self {
            Some(x) => x.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, AccessError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn from_widened(value: Value) -> Result<Self, AccessError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_widened(other).map(Some),
        }
    }
}

type Getter = dyn Fn(&dyn Object) -> Result<Value, AccessError> + Send + Sync;
type Setter = dyn Fn(&mut dyn Object, Value) -> Result<(), AccessError> + Send + Sync;

/// Name, kind, accessor and mutator of one serializable field
#[derive(Clone)]
pub struct FieldDescriptor {
    name: &'static str,
    kind: FieldKind,
    get: Arc<Getter>,
    set: Arc<Setter>,
    set_widened: Arc<Setter>,
}

impl FieldDescriptor {
    /// Builds the descriptor of a field of type `F` inside record `R`, given
    /// projections onto that field.
    ///
    /// ```
    /// # use plaindata::schema::{FieldDescriptor, FieldKind, Scalar};
    /// # #[derive(Debug, Default, Clone, PartialEq)]
    /// # struct Point { x: i32 }
    /// # impl plaindata::Record for Point {
    /// #     const NAME: &'static str = "Point";
    /// #     fn fields() -> Vec<FieldDescriptor> { vec![] }
    /// # }
    /// let x = FieldDescriptor::new::<Point, i32>("x", |p| &p.x, |p| &mut p.x);
    /// assert_eq!(x.kind(), FieldKind::Primitive(Scalar::Int32));
    /// ```
    pub fn new<R: Record, F: Field>(
        name: &'static str,
        project: fn(&R) -> &F,
        project_mut: fn(&mut R) -> &mut F,
    ) -> Self {
        let receiver = move || AccessError::WrongReceiver {
            record: R::NAME,
            field: name,
        };
        Self {
            name,
            kind: F::KIND,
            get: Arc::new(move |obj: &dyn Object| {
                obj.as_any()
                    .downcast_ref::<R>()
                    .map(|r| project(r).to_value())
                    .ok_or_else(receiver)
            }),
            set: Arc::new(move |obj: &mut dyn Object, value: Value| {
                let r = obj.as_any_mut().downcast_mut::<R>().ok_or_else(receiver)?;
                *project_mut(r) = F::from_value(value)?;
                Ok(())
            }),
            set_widened: Arc::new(move |obj: &mut dyn Object, value: Value| {
                let r = obj.as_any_mut().downcast_mut::<R>().ok_or_else(receiver)?;
                *project_mut(r) = F::from_widened(value)?;
                Ok(())
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Reads this field out of a record instance.
    ///
    /// # Errors
    ///
    /// Fails with [`AccessError::WrongReceiver`] if `obj` is not an instance
    /// of the record type this descriptor was built for.
    pub fn get(&self, obj: &dyn Object) -> Result<Value, AccessError> {
        (self.get)(obj)
    }

    /// Writes `value` into this field of a record instance.
    ///
    /// # Errors
    ///
    /// Fails if `obj` is not an instance of the owning record type, or if
    /// `value` cannot be converted into the field's Rust type.
    pub fn set(&self, obj: &mut dyn Object, value: Value) -> Result<(), AccessError> {
        (self.set)(obj, value)
    }

    /// Like [`set`](Self::set), but narrows numeric values of any width with
    /// [`Field::from_widened`].
    pub fn set_widened(&self, obj: &mut dyn Object, value: Value) -> Result<(), AccessError> {
        (self.set_widened)(obj, value)
    }
}

impl Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Field descriptors of one record type, sorted by field name
///
/// This ordering is the binary layout of the record.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Sorts `fields` by name.
    ///
    /// Returns the first duplicated name as an error.
    pub(crate) fn from_fields(
        mut fields: Vec<FieldDescriptor>,
    ) -> Result<Self, &'static str> {
        fields.sort_by(|a, b| a.name.cmp(b.name));
        if let Some(w) = fields.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(w[0].name);
        }
        Ok(Self { fields })
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .binary_search_by(|f| f.name.cmp(name))
            .ok()
            .map(|ix| &self.fields[ix])
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(FieldDescriptor::name)
    }
}

impl Deref for Schema {
    type Target = [FieldDescriptor];

    fn deref(&self) -> &Self::Target {
        &self.fields
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Point, Sample};

    #[test]
    fn kinds() {
        assert_eq!(<i16 as Field>::KIND, FieldKind::Primitive(Scalar::Int16));
        assert_eq!(<Option<i16> as Field>::KIND, FieldKind::Boxed(Scalar::Int16));
        assert_eq!(<Option<String> as Field>::KIND, FieldKind::Str);
        assert_eq!(<Vec<Point> as Field>::KIND, FieldKind::List);
        assert_eq!(<Point as Field>::KIND, FieldKind::Record("Point"));
        assert_eq!(<Option<Point> as Field>::KIND, FieldKind::Record("Point"));
        assert!(!<Option<bool> as Field>::KIND.is_primitive());
    }

    #[test]
    fn exact_numeric_conversion() {
        assert_eq!(i8::from_value(Value::Int8(-4)), Ok(-4));
        assert_eq!(
            i32::from_value(Value::Int64((1 << 32) + 7)),
            Err(AccessError::Mismatch {
                expected: "int32",
                found: "int64"
            })
        );
        assert_eq!(
            f32::from_value(Value::Float64(0.5)),
            Err(AccessError::Mismatch {
                expected: "float32",
                found: "float64"
            })
        );
        assert_eq!(
            Option::<i32>::from_value(Value::Int16(3)),
            Err(AccessError::Mismatch {
                expected: "int32",
                found: "int16"
            })
        );
    }

    #[test]
    fn numeric_narrowing() {
        assert_eq!(i8::from_widened(Value::Int64(300)), Ok(300i64 as i8));
        assert_eq!(i32::from_widened(Value::Float64(2.9)), Ok(2));
        assert_eq!(f32::from_widened(Value::Int64(5)), Ok(5.0));
        assert_eq!(i32::from_widened(Value::Null), Err(AccessError::Null("int32")));
        assert_eq!(
            i64::from_value(Value::Str("1".into())),
            Err(AccessError::Mismatch {
                expected: "int64",
                found: "string"
            })
        );
    }

    #[test]
    fn options_and_lists() {
        assert_eq!(Option::<i32>::from_value(Value::Null), Ok(None));
        assert_eq!(Option::<i32>::from_value(Value::Int32(4)), Ok(Some(4)));
        assert_eq!(Some(4i32).to_value(), Value::Int32(4));
        assert_eq!(None::<String>.to_value(), Value::Null);
        let widened = Value::List(vec![Value::Int64(1), Value::Int64(2)]);
        assert_eq!(Vec::<i16>::from_widened(widened.clone()), Ok(vec![1, 2]));
        assert!(Vec::<i16>::from_value(widened).is_err());
        assert_eq!(
            Vec::<Option<i16>>::from_widened(Value::List(vec![Value::Null, Value::Int64(3)])),
            Ok(vec![None, Some(3)])
        );
        assert_eq!(
            Bytes::from_widened(Value::List(vec![Value::Int64(0xff), Value::Int64(1)])),
            Ok(Bytes::from(vec![0xff, 1]))
        );
        assert!(Bytes::from_value(Value::List(vec![Value::Int64(1)])).is_err());
    }

    #[test]
    fn descriptors() {
        let schema = Schema::from_fields(Point::fields()).unwrap();
        assert_eq!(schema.names().collect::<Vec<_>>(), ["x", "y"]);

        let mut point = Point { x: 3, y: -7 };
        let y = schema.field("y").unwrap();
        assert_eq!(y.get(&point), Ok(Value::Int32(-7)));
        y.set(&mut point, Value::Int32(12)).unwrap();
        assert_eq!(point, Point { x: 3, y: 12 });

        assert_eq!(
            y.get(&Sample::default()),
            Err(AccessError::WrongReceiver {
                record: "Point",
                field: "y"
            })
        );
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Holder {
        counts: Vec<Option<i64>>,
    }

    impl Record for Holder {
        const NAME: &'static str = "Holder";

        fn fields() -> Vec<FieldDescriptor> {
            vec![FieldDescriptor::new::<Self, Vec<Option<i64>>>(
                "counts",
                |h| &h.counts,
                |h| &mut h.counts,
            )]
        }
    }

    #[test]
    fn hand_built_descriptors() {
        let [counts]: [FieldDescriptor; 1] = Holder::fields().try_into().unwrap();
        assert_eq!(counts.kind(), FieldKind::List);

        let mut holder = Holder::default();
        counts
            .set(&mut holder, Value::List(vec![Value::Int64(9), Value::Null]))
            .unwrap();
        assert_eq!(holder.counts, [Some(9), None]);
        assert_eq!(
            counts.set(&mut holder, Value::List(vec![Value::Int32(1)])),
            Err(AccessError::Mismatch {
                expected: "int64",
                found: "int32"
            })
        );
        counts
            .set_widened(&mut holder, Value::List(vec![Value::Int32(1)]))
            .unwrap();
        assert_eq!(holder.counts, [Some(1)]);
    }

    #[test]
    fn duplicate_field_names() {
        let mut fields = Point::fields();
        fields.push(FieldDescriptor::new::<Point, i32>("x", |p| &p.y, |p| &mut p.y));
        assert_eq!(Schema::from_fields(fields).unwrap_err(), "x");
    }
}
