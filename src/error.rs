//! General error types
//!
//! Every fallible operation in this crate reports one of four classes of
//! failure, each with its own refinement type:
//!
//!   * [`RegistrationError`] for misuse of the [`Registry`](crate::Registry)
//!     lifecycle, or schema lookups on types that were never registered.
//!   * [`UnknownType`] when a binary type tag or a textual `className` does not
//!     resolve against the registry.
//!   * [`MalformedInput`] when a byte stream or a text document cannot be read,
//!     whether because it ends early or because it contains something illegal.
//!   * [`AccessError`] when a field value cannot be read out of, or written into,
//!     a record instance.
//!
//! The crate-level [`Error`] wraps all four. None of these are recoverable at
//! the call boundary: they indicate either a programming error or a mismatch
//! between the registration sets of the two ends of a conversion.

use thiserror::Error;

/// Failures related to the registration phase of a [`Registry`](crate::Registry),
/// and to schema lookups made against it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A type was registered after the registry was locked.
    #[error("cannot register `{name}`: registry is already locked")]
    Locked { name: &'static str },
    /// Two distinct Rust types were registered under one qualified name.
    #[error("qualified name `{name}` is already registered to a different type")]
    DuplicateName { name: &'static str },
    /// A record declared two serializable fields with the same name.
    #[error("record `{record}` declares field `{field}` more than once")]
    DuplicateField {
        record: &'static str,
        field: &'static str,
    },
    /// A type was used with a codec, or looked up, without being registered.
    #[error("type `{name}` is not registered")]
    NotRegistered { name: String },
    /// The registration set is too large to assign 32-bit type tags.
    #[error("cannot assign type tags to {count} registered types")]
    TooManyTypes { count: usize },
}

/// Failures to resolve a type identifier read from encoded input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnknownType {
    /// Binary type tag with no corresponding built-in or registered type
    #[error("unregistered type tag {0}")]
    Tag(u32),
    /// `className` entry naming a type that is not registered
    #[error("unregistered class name `{0}`")]
    ClassName(String),
    /// Map without a (string-valued) `className` entry
    #[error("map has no string-valued `className` entry")]
    MissingClassName,
}

/// Failures encountered while reading binary or textual input.
#[derive(Debug, Error)]
pub enum MalformedInput {
    /// Byte stream ended before a fixed-width or length-prefixed read completed.
    #[error("stream truncated: needed {requested} bytes at offset {offset}, {available} available")]
    TruncatedStream {
        offset: usize,
        requested: usize,
        available: usize,
    },
    /// Boolean payload byte other than `0x00` or `0x01`
    #[error("invalid boolean encoding 0x{0:02x}")]
    InvalidBoolean(u8),
    /// String payload (or text source) that is not valid UTF-8
    #[error("invalid UTF-8 in input")]
    InvalidUtf8,
    /// A length or element count that cannot be represented in 4 bytes
    #[error("length {0} does not fit in a 32-bit length prefix")]
    LengthOverflow(usize),
    /// Unconsumed bytes after a complete top-level value
    #[error("{0} trailing bytes after complete value")]
    TrailingBytes(usize),
    /// Text ended in the middle of a value
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    /// Character that cannot begin (or continue) the token being read
    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),
    /// Misspelled `true`, `false`, or `null`
    #[error("invalid literal `{0}`")]
    InvalidLiteral(String),
    /// Number-like token that parses as neither an integer nor a float
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    /// Something other than `:` between a map key and its value
    #[error("expected ':' after map key, found {0:?}")]
    MissingColon(char),
    /// Something other than `,` or the closing bracket after an element
    #[error("expected ',' or closing bracket, found {0:?}")]
    MissingComma(char),
    /// Lists, records or text containers nested beyond the decoder's limit
    #[error("input nested deeper than {0} levels")]
    NestingTooDeep(usize),
    /// Failure of the underlying byte or character source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures to read a field from, or write a field into, a record instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Field accessor invoked on an instance of a different record type
    #[error("field `{field}` accessed on an instance that is not a `{record}`")]
    WrongReceiver {
        record: &'static str,
        field: &'static str,
    },
    /// Value of the wrong shape for the destination
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// Null written into a field that cannot hold it
    #[error("null value for non-nullable {0}")]
    Null(&'static str),
}

/// Crate-level error type
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    UnknownType(#[from] UnknownType),
    #[error(transparent)]
    Malformed(#[from] MalformedInput),
    #[error(transparent)]
    Access(#[from] AccessError),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Malformed(MalformedInput::Io(err))
    }
}

/// Type alias for `Result` with the crate-level [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::*;

    fn dummy<T: Send + Sync>() {}

    #[test]
    fn error_threadsafe() {
        dummy::<Error>()
    }

    #[test]
    fn io_errors_are_malformed_input() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, Error::Malformed(MalformedInput::Io(_))));
    }

    #[test]
    fn display() {
        assert_eq!(
            Error::from(UnknownType::Tag(42)).to_string(),
            "unregistered type tag 42"
        );
        assert_eq!(
            MalformedInput::MissingColon('x').to_string(),
            "expected ':' after map key, found 'x'"
        );
    }
}
