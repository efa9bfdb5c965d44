//! Typed runtime values
//!
//! [`Value`] is the currency of both codecs: every scalar, string,
//! byte-sequence and list is represented directly, and record instances are
//! carried behind the object-safe [`Object`] trait so that a single `Value`
//! can hold an instance of any registered [`Record`] type.

use std::any::{Any, TypeId};
use std::fmt::Debug;

use crate::error::AccessError;
use crate::schema::FieldDescriptor;

/// Trait for composite types whose fields can be serialized.
///
/// Implementors supply their qualified name and an explicit table of field
/// descriptors. The usual way to implement `Record` is through the derive
/// macro of the same name, which includes every field carrying the `#[serial]`
/// marker:
///
/// ```
/// use plaindata::Record;
///
/// #[derive(Record, Debug, Default, Clone, PartialEq)]
/// #[record(name = "Point")]
/// struct Point {
///     #[serial]
///     x: i32,
///     #[serial]
///     y: i32,
///     cache: Option<String>,
/// }
///
/// assert_eq!(<Point as plaindata::Record>::NAME, "Point");
/// assert_eq!(Point::fields().len(), 2);
/// ```
///
/// The order of `fields()` is irrelevant; the registry sorts descriptors by
/// name when the type is registered.
pub trait Record: Default + Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Qualified name, unique within a registry
    const NAME: &'static str;

    /// Returns the descriptor of every serializable field.
    fn fields() -> Vec<FieldDescriptor>;
}

/// Object-safe view of a [`Record`] instance.
///
/// Blanket-implemented for every `Record`; there is no reason to implement it
/// by hand.
pub trait Object: Any + Debug + Send + Sync {
    /// Returns the qualified name of the concrete record type.
    fn record_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn clone_object(&self) -> Box<dyn Object>;

    fn eq_object(&self, other: &dyn Object) -> bool;
}

impl<R: Record> Object for R {
    #[inline]
    fn record_name(&self) -> &'static str {
        R::NAME
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_object(&self) -> Box<dyn Object> {
        Box::new(self.clone())
    }

    fn eq_object(&self, other: &dyn Object) -> bool {
        other.as_any().downcast_ref::<R>() == Some(self)
    }
}

impl dyn Object {
    /// Returns the [`TypeId`] of the concrete record type behind this object.
    #[inline]
    pub fn concrete_type_id(&self) -> TypeId {
        self.as_any().type_id()
    }
}

impl Clone for Box<dyn Object> {
    fn clone(&self) -> Self {
        self.clone_object()
    }
}

impl PartialEq for Box<dyn Object> {
    fn eq(&self, other: &Self) -> bool {
        self.eq_object(other.as_ref())
    }
}

/// A typed value as seen by the codecs.
///
/// Narrow numeric variants are kept distinct so that the binary codec can
/// reproduce them exactly. The tree codec widens them to 64 bits, and
/// recovers the narrow width from the destination field on the way back.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Record(Box<dyn Object>),
}

impl Value {
    /// Wraps a record instance.
    #[inline]
    #[must_use]
    pub fn record<R: Record>(record: R) -> Self {
        Self::Record(Box::new(record))
    }

    /// Returns a short description of the kind of value, for error reporting.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Str(_) => "string",
            Value::Bytes(_) => "byte-sequence",
            Value::List(_) => "list",
            Value::Record(obj) => obj.record_name(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrows the record held by this value, if it is an instance of `R`.
    #[must_use]
    pub fn as_record<R: Record>(&self) -> Option<&R> {
        match self {
            Value::Record(obj) => obj.as_any().downcast_ref::<R>(),
            _ => None,
        }
    }

    /// Consumes this value, returning the record it holds.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Null`] for `Value::Null`, and
    /// [`AccessError::Mismatch`] for anything other than an instance of `R`.
    pub fn into_record<R: Record>(self) -> Result<R, AccessError> {
        match self {
            Value::Record(obj) => {
                let found = obj.record_name();
                obj.into_any()
                    .downcast::<R>()
                    .map(|boxed| *boxed)
                    .map_err(|_| AccessError::Mismatch {
                        expected: R::NAME,
                        found,
                    })
            }
            Value::Null => Err(AccessError::Null(R::NAME)),
            other => Err(AccessError::Mismatch {
                expected: R::NAME,
                found: other.kind_name(),
            }),
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                #[inline]
                fn from(x: $t) -> Self {
                    Value::$variant(x)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    String => Str,
    Vec<Value> => List,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Point, Polygon};

    #[test]
    fn record_equality_is_structural() {
        let a = Value::record(Point { x: 3, y: -7 });
        let b = Value::record(Point { x: 3, y: -7 });
        let c = Value::record(Point { x: 3, y: 7 });
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Value::record(Polygon::default()));
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn into_record() {
        let v = Value::record(Point { x: 1, y: 2 });
        assert_eq!(v.as_record::<Point>(), Some(&Point { x: 1, y: 2 }));
        assert_eq!(v.into_record::<Point>(), Ok(Point { x: 1, y: 2 }));

        assert_eq!(
            Value::record(Point::default()).into_record::<Polygon>(),
            Err(AccessError::Mismatch {
                expected: "Polygon",
                found: "Point"
            })
        );
        assert_eq!(
            Value::Null.into_record::<Point>(),
            Err(AccessError::Null("Point"))
        );
        assert_eq!(
            Value::Int32(4).into_record::<Point>(),
            Err(AccessError::Mismatch {
                expected: "Point",
                found: "int32"
            })
        );
    }
}
