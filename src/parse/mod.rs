//! Byte-level input model for the binary codec
//!
//! This module defines the [`Parser`] trait, an abstraction over a stateful,
//! forward-only cursor into a byte source, together with two implementors:
//!
//!   * [`ByteParser`], over a borrowed in-memory slice
//!   * [`ReadParser`], over any [`std::io::Read`], pulling bytes on demand
//!
//! All parsing is non-backtracking: a byte can only be viewed by consuming it,
//! and once consumed it cannot be consumed again. Running out of input in the
//! middle of a read is always reported as
//! [`MalformedInput::TruncatedStream`]; missing bytes are never zero-filled.

pub mod byteparser;
pub mod readparser;

pub use byteparser::ByteParser;
pub use readparser::ReadParser;

use crate::error::MalformedInput;

/// Type alias for `Result` with an error type of [`MalformedInput`]
pub type ParseResult<T> = std::result::Result<T, MalformedInput>;

/// Forward-only cursor over a byte source
///
/// Implementors define [`consume`] and [`offset`]; every `take_*` method has a
/// default implementation in terms of those. All multi-byte numeric reads are
/// big-endian.
///
/// [`consume`]: Parser::consume
/// [`offset`]: Parser::offset
pub trait Parser {
    /// Number of bytes consumed so far.
    fn offset(&self) -> usize;

    /// Attempts to consume and return exactly `nbytes` bytes.
    ///
    /// # Errors
    ///
    /// Must return [`MalformedInput::TruncatedStream`] when fewer than
    /// `nbytes` bytes remain.
    fn consume(&mut self, nbytes: usize) -> ParseResult<&[u8]>;

    /// Returns `true` if no further bytes can be consumed.
    ///
    /// Stream-backed parsers may need to block in order to answer.
    fn is_exhausted(&mut self) -> ParseResult<bool>;

    /// Consumes `N` bytes and returns them in array-form
    #[inline]
    fn consume_arr<const N: usize>(&mut self) -> ParseResult<[u8; N]> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.consume(N)?);
        Ok(arr)
    }

    #[inline]
    fn take_u8(&mut self) -> ParseResult<u8> {
        self.consume_arr::<1>().map(|[b]| b)
    }

    #[inline]
    fn take_i8(&mut self) -> ParseResult<i8> {
        self.consume_arr::<1>().map(i8::from_be_bytes)
    }

    #[inline]
    fn take_i16(&mut self) -> ParseResult<i16> {
        self.consume_arr::<2>().map(i16::from_be_bytes)
    }

    #[inline]
    fn take_u32(&mut self) -> ParseResult<u32> {
        self.consume_arr::<4>().map(u32::from_be_bytes)
    }

    #[inline]
    fn take_i32(&mut self) -> ParseResult<i32> {
        self.consume_arr::<4>().map(i32::from_be_bytes)
    }

    #[inline]
    fn take_i64(&mut self) -> ParseResult<i64> {
        self.consume_arr::<8>().map(i64::from_be_bytes)
    }

    #[inline]
    fn take_f32(&mut self) -> ParseResult<f32> {
        self.consume_arr::<4>().map(f32::from_be_bytes)
    }

    #[inline]
    fn take_f64(&mut self) -> ParseResult<f64> {
        self.consume_arr::<8>().map(f64::from_be_bytes)
    }

    /// Consumes a single byte and returns the boolean value it represents
    ///
    /// The only valid encodings are `0x01` for `true` and `0x00` for `false`.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedInput::InvalidBoolean`] for any other byte.
    #[inline]
    fn take_bool(&mut self) -> ParseResult<bool> {
        match self.take_u8()? {
            0x01 => Ok(true),
            0x00 => Ok(false),
            byte => Err(MalformedInput::InvalidBoolean(byte)),
        }
    }

    /// Consumes a 4-byte length prefix.
    #[inline]
    fn take_len(&mut self) -> ParseResult<usize> {
        self.take_u32().map(|n| n as usize)
    }

    /// Consumes and returns a `Vec<u8>` of length `nbytes`.
    #[inline]
    fn take_dynamic(&mut self, nbytes: usize) -> ParseResult<Vec<u8>> {
        self.consume(nbytes).map(Vec::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_scalars() {
        let mut p = ByteParser::new(&[
            0x00, 0x00, 0x00, 0x2a, // u32
            0xff, 0xfe, // i16
            0x3f, 0x80, 0x00, 0x00, // f32
            0x01, 0x00, // bools
        ]);
        assert_eq!(p.take_u32().unwrap(), 42);
        assert_eq!(p.take_i16().unwrap(), -2);
        assert_eq!(p.take_f32().unwrap(), 1.0);
        assert!(p.take_bool().unwrap());
        assert!(!p.take_bool().unwrap());
        assert!(p.is_exhausted().unwrap());
    }

    #[test]
    fn invalid_boolean() {
        let mut p = ByteParser::new(&[0xff]);
        assert!(matches!(
            p.take_bool(),
            Err(MalformedInput::InvalidBoolean(0xff))
        ));
    }
}
