//! Slice-backed [`Parser`]

use crate::error::MalformedInput;

use super::{ParseResult, Parser};

/// Parser over a borrowed, fully in-memory byte buffer
#[derive(Debug, Clone)]
pub struct ByteParser<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> ByteParser<'a> {
    #[inline]
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Number of bytes that can still be consumed
    #[inline]
    #[must_use]
    pub fn remainder(&self) -> usize {
        self.buf.len() - self.offset
    }
}

impl<'a> From<&'a [u8]> for ByteParser<'a> {
    fn from(buf: &'a [u8]) -> Self {
        Self::new(buf)
    }
}

impl Parser for ByteParser<'_> {
    #[inline]
    fn offset(&self) -> usize {
        self.offset
    }

    fn consume(&mut self, nbytes: usize) -> ParseResult<&[u8]> {
        if nbytes > self.remainder() {
            return Err(MalformedInput::TruncatedStream {
                offset: self.offset,
                requested: nbytes,
                available: self.remainder(),
            });
        }
        let ret = &self.buf[self.offset..self.offset + nbytes];
        self.offset += nbytes;
        Ok(ret)
    }

    #[inline]
    fn is_exhausted(&mut self) -> ParseResult<bool> {
        Ok(self.remainder() == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_consumes_nothing() {
        let mut p = ByteParser::new(&[1, 2, 3]);
        assert_eq!(p.consume(1).unwrap(), &[1]);
        match p.consume(4) {
            Err(MalformedInput::TruncatedStream {
                offset,
                requested,
                available,
            }) => assert_eq!((offset, requested, available), (1, 4, 2)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(p.offset(), 1);
        assert_eq!(p.take_dynamic(2).unwrap(), vec![2, 3]);
        assert!(p.is_exhausted().unwrap());
    }
}
