//! JSON-like text syntax for [`Tree`]s
//!
//! ```text
//! value  = object | array | string | number | "true" | "false" | "null"
//! object = '{' ( string ':' value ( ',' string ':' value )* )? '}'
//! array  = '[' ( value ( ',' value )* )? ']'
//! ```
//!
//! Space, tab, CR and LF are insignificant between tokens. The syntax is a
//! lenient relative of JSON rather than a conforming implementation:
//!
//!   * strings recognize only the escapes `\n \b \f \r \t \" \\`, keep the
//!     escaped character of any other escape, and pass raw control
//!     characters through
//!   * a number is the longest run of `[0-9.eE-]`, and is a float if that run
//!     contains `.`, `e` or `E`
//!   * the literals `true`, `false` and `null` are matched case-insensitively
//!
//! Reading stops after the first complete value. Objects and arrays may nest
//! at most [`MAX_DEPTH`] levels deep.
//!
//! [`Tree`]: crate::Tree

pub mod reader;
pub mod writer;

pub use reader::{CharSource, ReadSource, Reader, MAX_DEPTH};
pub use writer::{to_string, write};

use crate::parse::ParseResult;
use crate::tree::Tree;

/// Layout of written text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Style {
    /// One entry per line, indented with one tab per level of nesting
    #[default]
    Pretty,
    /// No whitespace at all
    Compact,
}

/// Reads one value from `source`.
///
/// Pass `&mut source` to keep reading from the same source afterwards.
pub fn read<S: CharSource>(source: S) -> ParseResult<Tree> {
    Reader::new(source).read_value()
}
