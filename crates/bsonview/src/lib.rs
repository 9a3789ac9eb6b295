//! Zero-copy BSON document views, eager validation, and in-place mutation.
//!
//! BSON documents are length-prefixed, type-tagged byte sequences. This crate
//! interprets such a byte buffer without copying it: constructing a
//! [`DocumentView`] checks only the four-byte length header and the trailing
//! zero byte, and each element is bounds-checked lazily as an iterator reaches
//! it. Untrusted input can instead be checked up front with
//! [`validate_untrusted`], after which the returned view can be handed around
//! and iterated without re-validation.
//!
//! The write path is [`DocumentBuf`], a growable buffer that always holds a
//! well-formed document, and [`DocumentMut`], a mutator that supports
//! positional insertion and erasure of every wire type, including in-place
//! edits of nested documents obtained with [`DocumentMut::subdocument`]. All
//! structural edits funnel through a single byte-splice primitive that keeps
//! the size headers of the edited document and every enclosing document
//! correct.
//!
//! Mutation may reallocate the root buffer, which conceptually invalidates
//! every outstanding iterator and position in the whole document tree. Here
//! that contract is enforced rather than documented: iterators borrow the
//! buffer, so the borrow checker rejects any attempt to hold one across a
//! mutation, and [`Position`] tokens are plain offsets that are re-resolved
//! against the buffer on every use. After mutating a subdocument, use
//! [`DocumentMut::parent_iterator`] to re-derive the parent's iterator.
//!
//! ```
//! use bsonview::DocumentBuf;
//!
//! let mut doc = DocumentBuf::new();
//! let mut root = doc.as_mut();
//! let end = root.end_position();
//! root.insert_int32(end, "a", 1).unwrap();
//! let end = root.end_position();
//! root.insert_utf8(end, "b", "hello").unwrap();
//!
//! let view = doc.as_view();
//! let it = view.find_key("b");
//! assert_eq!(it.utf8().unwrap(), "hello");
//! ```

#![no_std]
#![allow(missing_docs)]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod allocator;
mod arith;
mod error;
mod mutate;
mod types;
mod validate;
mod view;

#[cfg(test)]
mod tests;

pub use allocator::{BufferAllocator, DefaultAllocator};
pub use error::{BuildError, IterError, ValidateError, ValidateErrorKind, ViewError};
pub use mutate::{DocumentBuf, DocumentMut};
pub use types::{Binary, DbPointer, Decimal128, ElementType, ObjectId, Regex, Timestamp};
pub use validate::validate_untrusted;
pub use view::{CodeWithScope, DocIter, DocumentView, Elements, Position};
