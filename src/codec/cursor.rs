//! Bounds-checked reader for fixed-offset binary layouts.
//!
//! Every read returns `None` when the requested field runs past the end of
//! the buffer, so decoders built on top of it cannot panic on truncated
//! input.

/// Read-only view over a byte blob with little-endian field accessors.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteCursor<'a> {
    /// Wraps a borrowed byte slice.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Whether at least `n` bytes are available from the start.
    pub fn has(&self, n: usize) -> bool {
        self.bytes.len() >= n
    }

    /// Reads a little-endian `u32` at `offset`.
    pub fn u32_le_at(&self, offset: usize) -> Option<u32> {
        self.array_at::<4>(offset).map(u32::from_le_bytes)
    }

    /// Reads a little-endian `u64` at `offset`.
    pub fn u64_le_at(&self, offset: usize) -> Option<u64> {
        self.array_at::<8>(offset).map(u64::from_le_bytes)
    }

    fn array_at<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let end = offset.checked_add(N)?;
        self.bytes.get(offset..end)?.try_into().ok()
    }
}
