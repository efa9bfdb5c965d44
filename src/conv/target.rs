/// Byte-oriented buffers with incremental append operations
///
/// `Target` plays the role of [`std::io::Write`] for the binary codec, with
/// the difference that its `push_XXX` methods are infallible and total. They
/// return the number of bytes written, which is used only for book-keeping on
/// the caller side.
///
/// Encoding into a fallible sink goes through a `Vec<u8>` first; see
/// [`BinaryCodec::write_to`](crate::BinaryCodec::write_to).
pub trait Target {
    /// Hints that at least `extra` more bytes are about to be written.
    ///
    /// For many implementors this is a no-op. For `Vec<u8>` it reserves
    /// capacity.
    fn anticipate(&mut self, extra: usize);

    /// Returns a fresh object of the `Self` type with an initially empty buffer.
    fn create() -> Self;

    /// Appends a single byte. The return value must be `1`.
    fn push_one(&mut self, b: u8) -> usize;

    /// Appends the bytes of a known-length array. The return value must be `N`.
    ///
    /// Indistinguishable from repeated calls to `push_one` over every element
    /// of the array in order.
    fn push_many<const N: usize>(&mut self, arr: [u8; N]) -> usize;

    /// Appends the bytes of an arbitrary-length slice. The return value must be
    /// the length of the slice.
    fn push_all(&mut self, buf: &[u8]) -> usize;
}

/// Alias for `std::io::Sink`, used to count the number of bytes an encoding
/// would take without writing them anywhere.
pub type ByteCounter = std::io::Sink;

impl Target for ByteCounter {
    #[inline(always)]
    fn anticipate(&mut self, _: usize) {}

    #[inline]
    fn create() -> Self {
        std::io::sink()
    }

    #[inline(always)]
    fn push_one(&mut self, _: u8) -> usize {
        1
    }

    #[inline(always)]
    fn push_many<const N: usize>(&mut self, _: [u8; N]) -> usize {
        N
    }

    #[inline(always)]
    fn push_all(&mut self, buf: &[u8]) -> usize {
        buf.len()
    }
}

impl Target for Vec<u8> {
    #[inline]
    fn anticipate(&mut self, extra: usize) {
        self.reserve(extra)
    }

    #[inline]
    fn create() -> Self {
        Self::new()
    }

    #[inline]
    fn push_one(&mut self, b: u8) -> usize {
        self.push(b);
        1
    }

    #[inline]
    fn push_many<const N: usize>(&mut self, arr: [u8; N]) -> usize {
        self.extend(&arr);
        N
    }

    #[inline]
    fn push_all(&mut self, buf: &[u8]) -> usize {
        self.extend_from_slice(buf);
        buf.len()
    }
}
