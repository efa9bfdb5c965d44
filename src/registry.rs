//! Type registry
//!
//! A [`Registry`] records every record type that can appear in encoded data,
//! along with its field schema, and assigns each type a numeric [`TypeTag`].
//!
//! # Lifecycle
//!
//! A registry is *open* after construction, and accepts [`register`] calls
//! through a unique reference. It becomes *locked* the first time
//! [`lock`] is called, either explicitly or implicitly by a codec or an ID
//! lookup. Locking assigns the fixed built-in tags and then numbers the
//! registered records in ascending order of qualified name, starting from
//! [`TypeTag::FIRST_RECORD`]. As a result, two registries holding the same
//! set of types agree on every tag, regardless of registration order.
//!
//! Once locked, a registry is immutable and can be shared freely between
//! threads; further registration fails with [`RegistrationError::Locked`].
//!
//! A process-wide registry is conveniently built inside `lazy_static!`:
//!
//! ```
//! use plaindata::{lazy_static, BinaryCodec, Record, Registry, Value};
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
//! lazy_static! {
//!     static ref REGISTRY: Registry = {
//!         let mut registry = Registry::new();
//!         registry.register::<Point>().expect("registry is open");
//!         registry
//!     };
//! }
//!
//! let codec = BinaryCodec::new(&REGISTRY);
//! let bytes = codec.to_bytes(&Value::record(Point { x: 3, y: -7 })).unwrap();
//! assert_eq!(&bytes[..4], &[0, 0, 0, 10]);
//! ```
//!
//! [`register`]: Registry::register
//! [`lock`]: Registry::lock

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display};
use std::sync::OnceLock;

use crate::error::{RegistrationError, UnknownType};
use crate::schema::{Scalar, Schema};
use crate::value::{Object, Record};

/// Numeric identifier of a type on the binary wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TypeTag(u32);

impl TypeTag {
    /// Sentinel tag of a null value, which has no payload
    pub const NULL: Self = Self(0);
    pub const BOOL: Self = Self(1);
    pub const INT8: Self = Self(2);
    pub const INT16: Self = Self(3);
    pub const INT32: Self = Self(4);
    pub const INT64: Self = Self(5);
    pub const FLOAT32: Self = Self(6);
    pub const FLOAT64: Self = Self(7);
    pub const STRING: Self = Self(8);
    pub const LIST: Self = Self(9);
    /// Tag assigned to the first registered record
    pub const FIRST_RECORD: Self = Self(10);
    /// Reserved tag for byte-sequences, outside the range ever assigned to records
    pub const BYTES: Self = Self(u32::MAX);

    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Returns the fixed tag of a scalar type.
    #[must_use]
    pub const fn of_scalar(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Bool => Self::BOOL,
            Scalar::Int8 => Self::INT8,
            Scalar::Int16 => Self::INT16,
            Scalar::Int32 => Self::INT32,
            Scalar::Int64 => Self::INT64,
            Scalar::Float32 => Self::FLOAT32,
            Scalar::Float64 => Self::FLOAT64,
        }
    }

    /// Returns `true` if this tag belongs to the fixed built-in table.
    #[must_use]
    pub const fn is_builtin(self) -> bool {
        self.0 < Self::FIRST_RECORD.0 || self.0 == Self::BYTES.0
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// What a [`TypeTag`] resolves to
#[derive(Debug, Clone, Copy)]
pub enum TypeRef<'a> {
    Null,
    Scalar(Scalar),
    Str,
    Bytes,
    List,
    Record(&'a RegisteredType),
}

/// A record type after the registry has been locked
pub struct RegisteredType {
    name: &'static str,
    tag: TypeTag,
    type_id: TypeId,
    schema: Schema,
    instantiate: fn() -> Box<dyn Object>,
}

impl RegisteredType {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    #[inline]
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Creates a default-valued instance, ready to have its fields written.
    #[must_use]
    pub fn instantiate(&self) -> Box<dyn Object> {
        (self.instantiate)()
    }
}

impl fmt::Debug for RegisteredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredType")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

fn instantiate<R: Record>() -> Box<dyn Object> {
    Box::new(R::default())
}

/// Registration as recorded before lock
struct Entry {
    type_id: TypeId,
    schema: Schema,
    instantiate: fn() -> Box<dyn Object>,
}

/// Lookup tables built when the registry locks
#[derive(Debug)]
pub(crate) struct Tables {
    types: Vec<RegisteredType>,
    by_type: HashMap<TypeId, usize>,
    by_name: HashMap<&'static str, usize>,
}

impl Tables {
    fn build(entries: &BTreeMap<&'static str, Entry>) -> Result<Self, RegistrationError> {
        let max = (TypeTag::BYTES.0 - TypeTag::FIRST_RECORD.0) as usize;
        if entries.len() > max {
            return Err(RegistrationError::TooManyTypes {
                count: entries.len(),
            });
        }

        let mut types = Vec::with_capacity(entries.len());
        let mut by_type = HashMap::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());

        // BTreeMap iterates in ascending name order
        for (ix, (&name, entry)) in entries.iter().enumerate() {
            let tag = TypeTag(TypeTag::FIRST_RECORD.0 + ix as u32);
            log::trace!("assigned tag {tag} to `{name}`");
            types.push(RegisteredType {
                name,
                tag,
                type_id: entry.type_id,
                schema: entry.schema.clone(),
                instantiate: entry.instantiate,
            });
            by_type.insert(entry.type_id, ix);
            by_name.insert(name, ix);
        }

        Ok(Self {
            types,
            by_type,
            by_name,
        })
    }

    pub(crate) fn by_type_id(&self, type_id: TypeId) -> Option<&RegisteredType> {
        self.by_type.get(&type_id).map(|&ix| &self.types[ix])
    }

    pub(crate) fn by_name(&self, name: &str) -> Option<&RegisteredType> {
        self.by_name.get(name).map(|&ix| &self.types[ix])
    }

    /// Resolves the registered type of a record instance.
    pub(crate) fn of_object(&self, obj: &dyn Object) -> Result<&RegisteredType, RegistrationError> {
        self.by_type_id(obj.concrete_type_id())
            .ok_or_else(|| RegistrationError::NotRegistered {
                name: obj.record_name().to_owned(),
            })
    }

    pub(crate) fn resolve(&self, tag: TypeTag) -> Result<TypeRef<'_>, UnknownType> {
        Ok(match tag {
            TypeTag::NULL => TypeRef::Null,
            TypeTag::STRING => TypeRef::Str,
            TypeTag::LIST => TypeRef::List,
            TypeTag::BYTES => TypeRef::Bytes,
            TypeTag(raw @ 1..=7) => TypeRef::Scalar(Scalar::ALL[raw as usize - 1]),
            TypeTag(raw) => {
                let ix = (raw - TypeTag::FIRST_RECORD.0) as usize;
                TypeRef::Record(self.types.get(ix).ok_or(UnknownType::Tag(raw))?)
            }
        })
    }
}

/// Set of known record types and their schemas
///
/// See the [module-level documentation](self) for the open/locked lifecycle.
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<&'static str, Entry>,
    locked: OnceLock<Result<Tables, RegistrationError>>,
}

impl Registry {
    /// Creates an empty, open registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the serializable fields of `R`, sorted by field name.
    ///
    /// Registering the same type more than once is harmless.
    ///
    /// # Errors
    ///
    /// * [`RegistrationError::Locked`] if the registry has already been locked
    /// * [`RegistrationError::DuplicateName`] if a different type was
    ///   registered under `R::NAME`
    /// * [`RegistrationError::DuplicateField`] if `R` declares two fields with
    ///   the same name
    pub fn register<R: Record>(&mut self) -> Result<(), RegistrationError> {
        if self.is_locked() {
            return Err(RegistrationError::Locked { name: R::NAME });
        }

        let type_id = TypeId::of::<R>();
        if let Some(existing) = self.entries.get(R::NAME) {
            return if existing.type_id == type_id {
                Ok(())
            } else {
                Err(RegistrationError::DuplicateName { name: R::NAME })
            };
        }

        let schema = Schema::from_fields(R::fields()).map_err(|field| {
            RegistrationError::DuplicateField {
                record: R::NAME,
                field,
            }
        })?;
        log::debug!("registered `{}` with {} fields", R::NAME, schema.len());

        self.entries.insert(
            R::NAME,
            Entry {
                type_id,
                schema,
                instantiate: instantiate::<R>,
            },
        );
        Ok(())
    }

    /// Locks the registry, assigning type tags, if it is not locked already.
    ///
    /// # Errors
    ///
    /// Fails only if the registration set is too large to number, in which
    /// case every later call fails the same way.
    pub fn lock(&self) -> Result<(), RegistrationError> {
        self.tables().map(|_| ())
    }

    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.get().is_some()
    }

    pub(crate) fn tables(&self) -> Result<&Tables, RegistrationError> {
        self.locked
            .get_or_init(|| {
                let tables = Tables::build(&self.entries);
                if tables.is_ok() {
                    log::debug!("locked registry with {} record types", self.entries.len());
                }
                tables
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Returns the schema of `R`. Does not lock the registry.
    ///
    /// # Errors
    ///
    /// Fails with [`RegistrationError::NotRegistered`] if `R` was never registered.
    pub fn schema_of<R: Record>(&self) -> Result<&Schema, RegistrationError> {
        match self.entries.get(R::NAME) {
            Some(entry) if entry.type_id == TypeId::of::<R>() => Ok(&entry.schema),
            _ => Err(not_registered(R::NAME)),
        }
    }

    /// Returns the schema of the record registered under `name`. Does not
    /// lock the registry.
    ///
    /// # Errors
    ///
    /// Fails with [`RegistrationError::NotRegistered`] if no such record exists.
    pub fn schema_of_name(&self, name: &str) -> Result<&Schema, RegistrationError> {
        self.entries
            .get(name)
            .map(|entry| &entry.schema)
            .ok_or_else(|| not_registered(name))
    }

    /// Returns the tag of `R`, locking the registry if necessary.
    ///
    /// # Errors
    ///
    /// Fails with [`RegistrationError::NotRegistered`] if `R` was never registered.
    pub fn id_of<R: Record>(&self) -> Result<TypeTag, RegistrationError> {
        self.tables()?
            .by_type_id(TypeId::of::<R>())
            .map(RegisteredType::tag)
            .ok_or_else(|| not_registered(R::NAME))
    }

    /// Returns the tag of the record registered under `name`, locking the
    /// registry if necessary.
    ///
    /// # Errors
    ///
    /// Fails with [`RegistrationError::NotRegistered`] if no such record exists.
    pub fn id_of_name(&self, name: &str) -> Result<TypeTag, RegistrationError> {
        self.tables()?
            .by_name(name)
            .map(RegisteredType::tag)
            .ok_or_else(|| not_registered(name))
    }

    /// Resolves a tag to a built-in or registered type, locking the registry
    /// if necessary.
    ///
    /// # Errors
    ///
    /// Fails with [`UnknownType::Tag`] if the tag is not assigned, or with
    /// the registration error if the registry cannot be locked.
    pub fn type_of(&self, tag: TypeTag) -> crate::Result<TypeRef<'_>> {
        Ok(self.tables()?.resolve(tag)?)
    }

    /// Returns the registered type named `name`, or `None` if there is none,
    /// locking the registry if necessary.
    ///
    /// # Errors
    ///
    /// Fails only if the registry cannot be locked.
    pub fn get(&self, name: &str) -> Result<Option<&RegisteredType>, RegistrationError> {
        Ok(self.tables()?.by_name(name))
    }

    /// Iterates over the registered types in tag order, locking the registry
    /// if necessary.
    ///
    /// # Errors
    ///
    /// Fails only if the registry cannot be locked.
    pub fn types(
        &self,
    ) -> Result<impl Iterator<Item = &RegisteredType> + '_, RegistrationError> {
        Ok(self.tables()?.types.iter())
    }

    /// Number of registered record types
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.entries.keys().collect::<Vec<_>>())
            .field("locked", &self.is_locked())
            .finish()
    }
}

fn not_registered(name: &str) -> RegistrationError {
    RegistrationError::NotRegistered {
        name: name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{registry, Point, Polygon, Sample};

    #[test]
    fn tags_follow_name_order() {
        let mut a = Registry::new();
        a.register::<Sample>().unwrap();
        a.register::<Polygon>().unwrap();
        a.register::<Point>().unwrap();

        let mut b = Registry::new();
        b.register::<Point>().unwrap();
        b.register::<Polygon>().unwrap();
        b.register::<Sample>().unwrap();

        for reg in [&a, &b] {
            assert_eq!(reg.id_of::<Point>(), Ok(TypeTag::new(10)));
            assert_eq!(reg.id_of::<Polygon>(), Ok(TypeTag::new(11)));
            assert_eq!(reg.id_of::<Sample>(), Ok(TypeTag::new(12)));
        }
        assert_eq!(
            a.types().unwrap().map(RegisteredType::name).collect::<Vec<_>>(),
            ["Point", "Polygon", "Sample"]
        );
    }

    #[test]
    fn lock_is_idempotent_and_final() {
        let mut reg = Registry::new();
        reg.register::<Point>().unwrap();
        assert!(!reg.is_locked());
        reg.lock().unwrap();
        reg.lock().unwrap();
        assert!(reg.is_locked());
        assert_eq!(
            reg.register::<Polygon>(),
            Err(RegistrationError::Locked { name: "Polygon" })
        );
        assert_eq!(reg.id_of_name("Polygon"), Err(not_registered("Polygon")));
    }

    #[test]
    fn lookups_lock_implicitly() {
        let mut reg = Registry::new();
        reg.register::<Point>().unwrap();
        assert!(reg.schema_of::<Point>().is_ok());
        assert!(!reg.is_locked());
        assert_eq!(reg.id_of_name("Point"), Ok(TypeTag::FIRST_RECORD));
        assert!(reg.is_locked());
    }

    #[test]
    fn get_and_types() {
        let mut reg = Registry::new();
        reg.register::<Polygon>().unwrap();
        reg.register::<Point>().unwrap();
        assert!(!reg.is_locked());

        let polygon = reg.get("Polygon").unwrap().unwrap();
        assert_eq!(polygon.tag(), TypeTag::new(11));
        assert!(reg.is_locked());
        assert!(reg.get("Circle").unwrap().is_none());
        assert_eq!(
            reg.types().unwrap().map(RegisteredType::tag).collect::<Vec<_>>(),
            [TypeTag::new(10), TypeTag::new(11)]
        );
        assert_eq!(Registry::new().types().unwrap().count(), 0);
    }

    #[test]
    fn repeated_registration() {
        let mut reg = Registry::new();
        reg.register::<Point>().unwrap();
        reg.register::<Point>().unwrap();
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unregistered_lookups() {
        let reg = registry();
        let missing = Registry::new();
        assert_eq!(
            missing.schema_of::<Point>().unwrap_err(),
            not_registered("Point")
        );
        assert_eq!(missing.id_of::<Point>(), Err(not_registered("Point")));
        assert!(matches!(
            reg.type_of(TypeTag::new(99)),
            Err(crate::Error::UnknownType(UnknownType::Tag(99)))
        ));
    }

    #[test]
    fn builtin_tags() {
        let reg = registry();
        assert!(matches!(reg.type_of(TypeTag::NULL), Ok(TypeRef::Null)));
        assert!(matches!(
            reg.type_of(TypeTag::new(4)),
            Ok(TypeRef::Scalar(Scalar::Int32))
        ));
        assert!(matches!(
            reg.type_of(TypeTag::FLOAT64),
            Ok(TypeRef::Scalar(Scalar::Float64))
        ));
        assert!(matches!(reg.type_of(TypeTag::STRING), Ok(TypeRef::Str)));
        assert!(matches!(reg.type_of(TypeTag::LIST), Ok(TypeRef::List)));
        assert!(matches!(reg.type_of(TypeTag::BYTES), Ok(TypeRef::Bytes)));
        for scalar in Scalar::ALL {
            let tag = TypeTag::of_scalar(scalar);
            assert!(matches!(reg.type_of(tag), Ok(TypeRef::Scalar(s)) if s == scalar));
        }
    }

    #[test]
    fn schema_is_sorted() {
        let reg = registry();
        let names: Vec<_> = reg.schema_of::<Sample>().unwrap().names().collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
