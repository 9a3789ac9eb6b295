//! Pluggable buffer reallocation for root document builders.
//!
//! Only a root [`DocumentBuf`](crate::DocumentBuf) owns storage, and growth
//! is the only operation it delegates: the allocator must make the buffer's
//! capacity at least the requested size, or report failure and leave the
//! buffer untouched. Freeing happens through `Drop` as usual. Substituting an
//! allocator is how embedders account for or cap codec memory, and how tests
//! exercise the allocation-failure paths.

use alloc::vec::Vec;

/// Grows the byte buffer behind a root document builder.
pub trait BufferAllocator {
    /// Ensure `buf.capacity() >= capacity`, preserving contents.
    ///
    /// Returns `false` if the memory cannot be provided; the buffer must then
    /// be left exactly as it was.
    fn reallocate(&mut self, buf: &mut Vec<u8>, capacity: usize) -> bool;
}

/// The default allocator: the global heap, via fallible reservation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAllocator;

impl BufferAllocator for DefaultAllocator {
    fn reallocate(&mut self, buf: &mut Vec<u8>, capacity: usize) -> bool {
        if capacity <= buf.capacity() {
            return true;
        }
        buf.try_reserve(capacity - buf.len()).is_ok()
    }
}
