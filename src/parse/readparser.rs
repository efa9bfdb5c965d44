//! Stream-backed [`Parser`]

use std::io::{ErrorKind, Read};

use crate::error::MalformedInput;

use super::{ParseResult, Parser};

/// Chunk size for length-prefixed reads, so that a corrupt length prefix
/// cannot force a huge up-front allocation.
const CHUNK: usize = 8 * 1024;

/// Parser that pulls bytes from a [`Read`] source as they are needed
///
/// Reads block for as long as the underlying source blocks. Wrapping an
/// unbuffered source (such as a raw socket or file) in a
/// [`BufReader`](std::io::BufReader) is recommended.
#[derive(Debug)]
pub struct ReadParser<R> {
    inner: R,
    scratch: Vec<u8>,
    /// Byte read ahead by `is_exhausted`, not yet consumed
    pending: Option<u8>,
    offset: usize,
}

impl<R: Read> ReadParser<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            scratch: Vec::new(),
            pending: None,
            offset: 0,
        }
    }

    /// Returns the underlying source.
    ///
    /// A byte read ahead by [`Parser::is_exhausted`] is lost.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn truncated(&self, requested: usize, available: usize) -> MalformedInput {
        MalformedInput::TruncatedStream {
            offset: self.offset,
            requested,
            available,
        }
    }
}

impl<R: Read> Parser for ReadParser<R> {
    #[inline]
    fn offset(&self) -> usize {
        self.offset
    }

    fn consume(&mut self, nbytes: usize) -> ParseResult<&[u8]> {
        self.scratch.clear();
        if nbytes > 0 {
            self.scratch.extend(self.pending.take());
        }

        while self.scratch.len() < nbytes {
            let have = self.scratch.len();
            let want = (nbytes - have).min(CHUNK);
            self.scratch.resize(have + want, 0);
            match self.inner.read(&mut self.scratch[have..]) {
                Ok(0) => {
                    self.scratch.truncate(have);
                    return Err(self.truncated(nbytes, have));
                }
                Ok(n) => self.scratch.truncate(have + n),
                Err(e) if e.kind() == ErrorKind::Interrupted => self.scratch.truncate(have),
                Err(e) => return Err(MalformedInput::Io(e)),
            }
        }

        self.offset += nbytes;
        Ok(&self.scratch[..nbytes])
    }

    fn is_exhausted(&mut self) -> ParseResult<bool> {
        if self.pending.is_some() {
            return Ok(false);
        }
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(true),
                Ok(_) => {
                    self.pending = Some(byte[0]);
                    return Ok(false);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(MalformedInput::Io(e)),
            }
        }
    }
}
