//! Growable document buffers and positional mutation.
//!
//! Overview
//! - [`DocumentBuf`] is the root: it owns a growable byte buffer that always
//!   holds a well-formed document, and it is the only place allocation
//!   happens, through the [`BufferAllocator`] plug-in.
//! - [`DocumentMut`] is the mutator. A root mutator edits the buffer's
//!   top-level document; [`DocumentMut::subdocument`] projects a mutator into
//!   a nested document or array element, through any depth. A child owns
//!   nothing: it carries the offsets of its ancestor elements and re-derives
//!   every byte position from the root buffer on each use. Capacity for a
//!   child is likewise derived, not stored: it is the root's capacity minus
//!   every byte in the tree that is not the child's own.
//! - Every structural change funnels through one splice primitive that opens
//!   or closes a byte gap and rewrites the size header of the edited document
//!   and of each enclosing document. Element insertion is a thin layer on
//!   top: splice a gap, write the tag and key, then encode the value.
//!
//! Failure never mutates. Size arithmetic is checked before any bytes move,
//! and an allocator refusal leaves the document exactly as it was; both
//! surface as a [`BuildError`].
//!
//! Positions and invalidation
//! - Mutation sites are named by [`Position`] tokens taken from an iterator
//!   or from [`DocumentMut::begin_position`]/[`end_position`](DocumentMut::end_position).
//!   A token is a byte offset within its document: it stays memory-safe when
//!   stale, but any insertion or erasure invalidates tokens and iterators
//!   elsewhere in the tree, and growth moves the whole buffer. Iterators
//!   borrow the buffer, so holding one across a mutation is a compile error;
//!   re-derive them afterwards, with [`DocumentMut::parent_iterator`] when
//!   returning from a subdocument edit.

use alloc::vec::Vec;
use bstr::ByteSlice;
use core::iter;

use crate::{
    allocator::{BufferAllocator, DefaultAllocator},
    arith,
    error::BuildError,
    types::{
        Decimal128, ElementType, ObjectId, Timestamp, read_u32_le, write_u32_le, write_u64_le,
    },
    view::{DocIter, DocumentView, MIN_DOC_LEN, Position},
};

/// Initial reservation for [`DocumentBuf::new`].
const DEFAULT_RESERVE: usize = 512;

/// Extra capacity requested whenever a splice must grow the buffer, so that
/// repeated small insertions do not reallocate every time.
const GROW_HEADROOM: i32 = 1024;

/// The encoding of a document with no elements.
const EMPTY_DOC: [u8; MIN_DOC_LEN] = [MIN_DOC_LEN as u8, 0, 0, 0, 0];

/// An owning, growable buffer that always holds a well-formed document.
///
/// # Examples
///
/// ```
/// use bsonview::DocumentBuf;
///
/// let mut doc = DocumentBuf::new();
/// assert_eq!(doc.as_bytes(), &[5, 0, 0, 0, 0]);
///
/// let mut root = doc.as_mut();
/// let end = root.end_position();
/// root.insert_int32(end, "answer", 42).unwrap();
/// assert_eq!(doc.as_view().find_key("answer").int32(), Some(42));
/// ```
#[derive(Debug)]
pub struct DocumentBuf<A: BufferAllocator = DefaultAllocator> {
    /// Always exactly the document: its length equals the declared length.
    bytes: Vec<u8>,
    alloc: A,
}

impl DocumentBuf {
    /// An empty document with a modest default reservation.
    #[must_use]
    pub fn new() -> Self {
        let mut bytes = Vec::with_capacity(DEFAULT_RESERVE);
        bytes.extend_from_slice(&EMPTY_DOC);
        Self {
            bytes,
            alloc: DefaultAllocator,
        }
    }

    /// Copy an existing document into a fresh owning buffer.
    #[must_use]
    pub fn from_document(doc: DocumentView<'_>) -> Self {
        Self {
            bytes: doc.as_bytes().to_vec(),
            alloc: DefaultAllocator,
        }
    }
}

impl Default for DocumentBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: BufferAllocator> DocumentBuf<A> {
    /// An empty document using `alloc` for all growth, with at least
    /// `reserve` bytes of initial capacity.
    ///
    /// # Errors
    ///
    /// [`BuildError::AllocFailed`] if the allocator refuses the initial
    /// reservation.
    pub fn new_in(mut alloc: A, reserve: usize) -> Result<Self, BuildError> {
        let mut bytes = Vec::new();
        if !alloc.reallocate(&mut bytes, reserve.max(MIN_DOC_LEN)) {
            return Err(BuildError::AllocFailed);
        }
        bytes.extend_from_slice(&EMPTY_DOC);
        Ok(Self { bytes, alloc })
    }

    /// Bytes available before the next growth must reallocate.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// The document's byte length.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the document contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.len() == MIN_DOC_LEN
    }

    /// Grow capacity to at least `capacity` bytes; never shrinks.
    ///
    /// Returns the resulting capacity. Growth invalidates outstanding
    /// positions' underlying bytes only in the sense that the buffer may
    /// move; position tokens themselves remain usable.
    ///
    /// # Errors
    ///
    /// [`BuildError::AllocFailed`] if the allocator cannot provide the
    /// capacity. The document is unchanged.
    pub fn reserve(&mut self, capacity: usize) -> Result<usize, BuildError> {
        if self.bytes.capacity() < capacity {
            if !self.alloc.reallocate(&mut self.bytes, capacity) {
                return Err(BuildError::AllocFailed);
            }
            debug_assert!(self.bytes.capacity() >= capacity);
        }
        Ok(self.bytes.capacity())
    }

    /// The document bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the document bytes out of the buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// A read-only view of the document. Construction checks are skipped;
    /// the buffer is well-formed by construction.
    #[must_use]
    pub fn as_view(&self) -> DocumentView<'_> {
        DocumentView::trusted(&self.bytes)
    }

    /// A mutator for the top-level document.
    pub fn as_mut(&mut self) -> DocumentMut<'_, A> {
        DocumentMut {
            root: self,
            chain: Vec::new(),
        }
    }
}

/// One ancestor level of a child mutator: the offsets, within the root
/// buffer, of the document element and of the document value it contains.
#[derive(Debug, Clone, Copy)]
struct Frame {
    elem: usize,
    doc: usize,
}

/// A mutator over the root document or, through [`subdocument`](Self::subdocument),
/// over a nested document at any depth.
///
/// # Examples
///
/// Editing a nested document in place:
///
/// ```
/// use bsonview::DocumentBuf;
///
/// let mut doc = DocumentBuf::new();
/// let mut root = doc.as_mut();
/// let end = root.end_position();
/// let at = root.insert_document(end, "inner", None).unwrap();
///
/// let mut inner = root.subdocument(at).unwrap();
/// let end = inner.end_position();
/// inner.insert_utf8(end, "greeting", "hi").unwrap();
///
/// // Back in the parent, re-derive the element iterator.
/// let it = inner.parent_iterator().unwrap();
/// assert_eq!(it.key(), "inner");
/// assert_eq!(it.document().unwrap().find_key("greeting").utf8().unwrap(), "hi");
/// ```
#[derive(Debug)]
pub struct DocumentMut<'a, A: BufferAllocator = DefaultAllocator> {
    root: &'a mut DocumentBuf<A>,
    /// Ancestor elements from the root document down to this document;
    /// empty for the root mutator.
    chain: Vec<Frame>,
}

impl<'a, A: BufferAllocator> DocumentMut<'a, A> {
    /// Whether this mutator edits the root document.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.chain.is_empty()
    }

    fn doc_offset(&self) -> usize {
        self.chain.last().map_or(0, |f| f.doc)
    }

    /// This document's byte length.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        read_u32_le(&self.root.bytes[self.doc_offset()..]) as usize
    }

    /// Whether this document contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == MIN_DOC_LEN
    }

    fn doc_bytes(&self) -> &[u8] {
        let off = self.doc_offset();
        &self.root.bytes[off..off + self.len()]
    }

    /// Bytes this document may grow by before the root must reallocate.
    ///
    /// For a child this is derived on demand: the root's capacity minus
    /// every sibling byte in every ancestor, which collapses to the root's
    /// capacity minus the bytes of the tree that are not this document's own.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.root.bytes.capacity() - (self.root.bytes.len() - self.len())
    }

    /// Grow the root buffer's capacity. Rejected on a child: only the root
    /// owns a buffer.
    ///
    /// # Errors
    ///
    /// [`BuildError::ChildReserve`] on a child mutator;
    /// [`BuildError::AllocFailed`] if the allocator refuses.
    pub fn reserve(&mut self, capacity: usize) -> Result<usize, BuildError> {
        if !self.is_root() {
            return Err(BuildError::ChildReserve);
        }
        self.root.reserve(capacity)
    }

    /// A read-only view of this document.
    #[must_use]
    pub fn view(&self) -> DocumentView<'_> {
        DocumentView::trusted(self.doc_bytes())
    }

    /// The position before the first element.
    #[must_use]
    pub fn begin_position(&self) -> Position {
        Position { offset: 4 }
    }

    /// The past-the-end position. Inserting here appends.
    #[must_use]
    pub fn end_position(&self) -> Position {
        Position {
            offset: self.len() - 1,
        }
    }

    /// Resolve a position to an iterator over this document.
    ///
    /// # Errors
    ///
    /// [`BuildError::InvalidPosition`] if the offset is out of bounds or the
    /// bytes there do not parse as an element boundary.
    pub fn iter_at(&self, pos: Position) -> Result<DocIter<'_>, BuildError> {
        if pos.offset < 4 || pos.offset >= self.len() {
            return Err(BuildError::InvalidPosition);
        }
        let it = DocIter::at(self.doc_bytes(), pos.offset);
        if it.error().is_some() {
            return Err(BuildError::InvalidPosition);
        }
        Ok(it)
    }

    /// Walk from the first element to check that `pos` is a boundary.
    /// Only used under `debug_assert`.
    fn is_element_boundary(&self, pos: Position) -> bool {
        let mut it = DocIter::at(self.doc_bytes(), 4);
        loop {
            if it.position() == pos {
                return true;
            }
            if it.done() {
                return false;
            }
            it = it.next_element();
        }
    }

    /// Open (or close) a byte gap at `at` (an offset within the root buffer)
    /// and rewrite the size headers of this document and every ancestor.
    ///
    /// This is the single primitive behind every structural change. The gap
    /// is zero-filled; callers overwrite it immediately.
    fn splice(&mut self, at: usize, n_delete: usize, n_insert: usize) -> Result<(), BuildError> {
        let inserted = i64::try_from(n_insert).map_err(|_| BuildError::TooLarge)?;
        let grow = inserted - n_delete as i64;
        let new_root_len = arith::i64_to_i32(self.root.bytes.len() as i64 + grow)
            .ok_or(BuildError::TooLarge)?;
        if new_root_len as usize > self.root.bytes.capacity() {
            let want = arith::add_i32(new_root_len, GROW_HEADROOM).ok_or(BuildError::TooLarge)?;
            if !self
                .root
                .alloc
                .reallocate(&mut self.root.bytes, want as usize)
            {
                return Err(BuildError::AllocFailed);
            }
        }
        // Capacity is already sufficient, so this cannot reallocate behind
        // the allocator's back; dropping the Splice moves the tail.
        drop(
            self.root
                .bytes
                .splice(at..at + n_delete, iter::repeat_n(0u8, n_insert)),
        );
        for doc_off in iter::once(0).chain(self.chain.iter().map(|f| f.doc)) {
            let len = i64::from(read_u32_le(&self.root.bytes[doc_off..]));
            write_u32_le(&mut self.root.bytes[doc_off..], (len + grow) as u32);
        }
        Ok(())
    }

    /// Splice in room for a new element at `pos`, write its tag, key, and
    /// key NUL, and return the offset (within the root buffer) where the
    /// caller must encode exactly `value_size` value bytes.
    fn prep_element(
        &mut self,
        pos: Position,
        tag: ElementType,
        key: &str,
        value_size: usize,
    ) -> Result<usize, BuildError> {
        if key.as_bytes().find_byte(0).is_some() {
            return Err(BuildError::KeyContainsNul);
        }
        let value_i = arith::usize_to_i32(value_size).ok_or(BuildError::TooLarge)?;
        let key_i = arith::usize_to_i32(key.len()).ok_or(BuildError::TooLarge)?;
        // Two: the tag byte and the key's NUL.
        let overhead = arith::add_i32(key_i, 2).ok_or(BuildError::TooLarge)?;
        let elem_size = arith::add_i32(value_i, overhead).ok_or(BuildError::TooLarge)?;
        self.iter_at(pos)?;
        debug_assert!(self.is_element_boundary(pos));
        let at = self.doc_offset() + pos.offset;
        self.splice(at, 0, elem_size as usize)?;
        let key_end = at + 1 + key.len();
        let bytes = &mut self.root.bytes;
        bytes[at] = tag as u8;
        bytes[at + 1..key_end].copy_from_slice(key.as_bytes());
        bytes[key_end] = 0;
        Ok(key_end + 1)
    }

    /// Insert a `double` element before `pos`. Returns the position of the
    /// new element; like every insertion, this invalidates other outstanding
    /// positions in the tree.
    pub fn insert_double(
        &mut self,
        pos: Position,
        key: &str,
        value: f64,
    ) -> Result<Position, BuildError> {
        let at = self.prep_element(pos, ElementType::Double, key, 8)?;
        write_u64_le(&mut self.root.bytes[at..], value.to_bits());
        Ok(pos)
    }

    /// Insert a string element before `pos`.
    ///
    /// The string is length-prefixed on the wire, so it may contain NUL.
    pub fn insert_utf8(
        &mut self,
        pos: Position,
        key: &str,
        value: &str,
    ) -> Result<Position, BuildError> {
        self.insert_stringlike(pos, key, ElementType::Utf8, value)
    }

    /// Insert a JavaScript code element before `pos`.
    pub fn insert_code(
        &mut self,
        pos: Position,
        key: &str,
        code: &str,
    ) -> Result<Position, BuildError> {
        self.insert_stringlike(pos, key, ElementType::Code, code)
    }

    /// Insert a symbol element before `pos`.
    pub fn insert_symbol(
        &mut self,
        pos: Position,
        key: &str,
        symbol: &str,
    ) -> Result<Position, BuildError> {
        self.insert_stringlike(pos, key, ElementType::Symbol, symbol)
    }

    fn insert_stringlike(
        &mut self,
        pos: Position,
        key: &str,
        tag: ElementType,
        s: &str,
    ) -> Result<Position, BuildError> {
        let content = arith::usize_to_i32(s.len()).ok_or(BuildError::TooLarge)?;
        // The prefixed count includes the trailing NUL.
        let string_size = arith::add_i32(content, 1).ok_or(BuildError::TooLarge)?;
        let value_size = arith::add_i32(string_size, 4).ok_or(BuildError::TooLarge)?;
        let at = self.prep_element(pos, tag, key, value_size as usize)?;
        let bytes = &mut self.root.bytes;
        write_u32_le(&mut bytes[at..], string_size as u32);
        bytes[at + 4..at + 4 + s.len()].copy_from_slice(s.as_bytes());
        bytes[at + 4 + s.len()] = 0;
        Ok(pos)
    }

    /// Insert a document element before `pos`: a copy of `doc`, or an empty
    /// document for `None`. The copy is verbatim; later edits go through
    /// [`subdocument`](Self::subdocument).
    pub fn insert_document(
        &mut self,
        pos: Position,
        key: &str,
        doc: Option<DocumentView<'_>>,
    ) -> Result<Position, BuildError> {
        self.insert_doclike(pos, key, ElementType::Document, doc)
    }

    /// Insert an array element before `pos`: a copy of `doc`, or an empty
    /// array for `None`. Array keys are the element indices as decimal
    /// strings; maintaining that is the caller's concern.
    pub fn insert_array(
        &mut self,
        pos: Position,
        key: &str,
        doc: Option<DocumentView<'_>>,
    ) -> Result<Position, BuildError> {
        self.insert_doclike(pos, key, ElementType::Array, doc)
    }

    fn insert_doclike(
        &mut self,
        pos: Position,
        key: &str,
        tag: ElementType,
        doc: Option<DocumentView<'_>>,
    ) -> Result<Position, BuildError> {
        match doc {
            Some(d) => {
                let at = self.prep_element(pos, tag, key, d.len())?;
                self.root.bytes[at..at + d.len()].copy_from_slice(d.as_bytes());
            }
            None => {
                let at = self.prep_element(pos, tag, key, MIN_DOC_LEN)?;
                self.root.bytes[at..at + MIN_DOC_LEN].copy_from_slice(&EMPTY_DOC);
            }
        }
        Ok(pos)
    }

    /// Insert a binary element before `pos`.
    pub fn insert_binary(
        &mut self,
        pos: Position,
        key: &str,
        subtype: u8,
        data: &[u8],
    ) -> Result<Position, BuildError> {
        let content = arith::usize_to_i32(data.len()).ok_or(BuildError::TooLarge)?;
        let value_size = arith::add_i32(content, 5).ok_or(BuildError::TooLarge)?;
        let at = self.prep_element(pos, ElementType::Binary, key, value_size as usize)?;
        let bytes = &mut self.root.bytes;
        write_u32_le(&mut bytes[at..], content as u32);
        bytes[at + 4] = subtype;
        bytes[at + 5..at + 5 + data.len()].copy_from_slice(data);
        Ok(pos)
    }

    /// Insert an undefined element before `pos`.
    pub fn insert_undefined(&mut self, pos: Position, key: &str) -> Result<Position, BuildError> {
        self.prep_element(pos, ElementType::Undefined, key, 0)?;
        Ok(pos)
    }

    /// Insert an object id element before `pos`.
    pub fn insert_object_id(
        &mut self,
        pos: Position,
        key: &str,
        id: ObjectId,
    ) -> Result<Position, BuildError> {
        let at = self.prep_element(pos, ElementType::ObjectId, key, 12)?;
        self.root.bytes[at..at + 12].copy_from_slice(&id.0);
        Ok(pos)
    }

    /// Insert a boolean element before `pos`.
    pub fn insert_bool(
        &mut self,
        pos: Position,
        key: &str,
        value: bool,
    ) -> Result<Position, BuildError> {
        let at = self.prep_element(pos, ElementType::Bool, key, 1)?;
        self.root.bytes[at] = u8::from(value);
        Ok(pos)
    }

    /// Insert a datetime element (milliseconds since the Unix epoch) before
    /// `pos`.
    pub fn insert_datetime(
        &mut self,
        pos: Position,
        key: &str,
        millis: i64,
    ) -> Result<Position, BuildError> {
        let at = self.prep_element(pos, ElementType::DateTime, key, 8)?;
        write_u64_le(&mut self.root.bytes[at..], millis as u64);
        Ok(pos)
    }

    /// Insert a null element before `pos`.
    pub fn insert_null(&mut self, pos: Position, key: &str) -> Result<Position, BuildError> {
        self.prep_element(pos, ElementType::Null, key, 0)?;
        Ok(pos)
    }

    /// Insert a regular expression element before `pos`.
    ///
    /// Both strings are NUL-terminated on the wire; an embedded NUL in
    /// either is rejected rather than silently truncated.
    pub fn insert_regex(
        &mut self,
        pos: Position,
        key: &str,
        pattern: &str,
        options: &str,
    ) -> Result<Position, BuildError> {
        if pattern.as_bytes().find_byte(0).is_some() || options.as_bytes().find_byte(0).is_some() {
            return Err(BuildError::StringContainsNul);
        }
        let p = arith::usize_to_i32(pattern.len()).ok_or(BuildError::TooLarge)?;
        let o = arith::usize_to_i32(options.len()).ok_or(BuildError::TooLarge)?;
        let both = arith::add_i32(p, o).ok_or(BuildError::TooLarge)?;
        let value_size = arith::add_i32(both, 2).ok_or(BuildError::TooLarge)?;
        let at = self.prep_element(pos, ElementType::Regex, key, value_size as usize)?;
        let bytes = &mut self.root.bytes;
        bytes[at..at + pattern.len()].copy_from_slice(pattern.as_bytes());
        bytes[at + pattern.len()] = 0;
        let opts = at + pattern.len() + 1;
        bytes[opts..opts + options.len()].copy_from_slice(options.as_bytes());
        bytes[opts + options.len()] = 0;
        Ok(pos)
    }

    /// Insert a dbpointer element before `pos`. The collection name is
    /// NUL-terminated on the wire and cannot contain NUL.
    pub fn insert_dbpointer(
        &mut self,
        pos: Position,
        key: &str,
        collection: &str,
        id: ObjectId,
    ) -> Result<Position, BuildError> {
        if collection.as_bytes().find_byte(0).is_some() {
            return Err(BuildError::StringContainsNul);
        }
        let content = arith::usize_to_i32(collection.len()).ok_or(BuildError::TooLarge)?;
        let string_size = arith::add_i32(content, 1).ok_or(BuildError::TooLarge)?;
        let value_size = arith::add_i32(string_size, 4 + 12).ok_or(BuildError::TooLarge)?;
        let at = self.prep_element(pos, ElementType::DbPointer, key, value_size as usize)?;
        let bytes = &mut self.root.bytes;
        write_u32_le(&mut bytes[at..], string_size as u32);
        bytes[at + 4..at + 4 + collection.len()].copy_from_slice(collection.as_bytes());
        bytes[at + 4 + collection.len()] = 0;
        let id_at = at + 4 + collection.len() + 1;
        bytes[id_at..id_at + 12].copy_from_slice(&id.0);
        Ok(pos)
    }

    /// Insert a code-with-scope element before `pos`, copying `scope`.
    pub fn insert_code_with_scope(
        &mut self,
        pos: Position,
        key: &str,
        code: &str,
        scope: DocumentView<'_>,
    ) -> Result<Position, BuildError> {
        let content = arith::usize_to_i32(code.len()).ok_or(BuildError::TooLarge)?;
        let code_size = arith::add_i32(content, 1).ok_or(BuildError::TooLarge)?;
        let scope_size = arith::usize_to_i32(scope.len()).ok_or(BuildError::TooLarge)?;
        // Two prefixes: the self-inclusive total and the code string's own.
        let prefixed = arith::add_i32(code_size, 4 + 4).ok_or(BuildError::TooLarge)?;
        let value_size = arith::add_i32(prefixed, scope_size).ok_or(BuildError::TooLarge)?;
        let at = self.prep_element(pos, ElementType::CodeWithScope, key, value_size as usize)?;
        let bytes = &mut self.root.bytes;
        write_u32_le(&mut bytes[at..], value_size as u32);
        write_u32_le(&mut bytes[at + 4..], code_size as u32);
        bytes[at + 8..at + 8 + code.len()].copy_from_slice(code.as_bytes());
        bytes[at + 8 + code.len()] = 0;
        let scope_at = at + 8 + code.len() + 1;
        bytes[scope_at..scope_at + scope.len()].copy_from_slice(scope.as_bytes());
        Ok(pos)
    }

    /// Insert an `int32` element before `pos`.
    pub fn insert_int32(
        &mut self,
        pos: Position,
        key: &str,
        value: i32,
    ) -> Result<Position, BuildError> {
        let at = self.prep_element(pos, ElementType::Int32, key, 4)?;
        write_u32_le(&mut self.root.bytes[at..], value as u32);
        Ok(pos)
    }

    /// Insert a timestamp element before `pos`.
    pub fn insert_timestamp(
        &mut self,
        pos: Position,
        key: &str,
        ts: Timestamp,
    ) -> Result<Position, BuildError> {
        let at = self.prep_element(pos, ElementType::Timestamp, key, 8)?;
        let bytes = &mut self.root.bytes;
        write_u32_le(&mut bytes[at..], ts.increment as u32);
        write_u32_le(&mut bytes[at + 4..], ts.seconds as u32);
        Ok(pos)
    }

    /// Insert an `int64` element before `pos`.
    pub fn insert_int64(
        &mut self,
        pos: Position,
        key: &str,
        value: i64,
    ) -> Result<Position, BuildError> {
        let at = self.prep_element(pos, ElementType::Int64, key, 8)?;
        write_u64_le(&mut self.root.bytes[at..], value as u64);
        Ok(pos)
    }

    /// Insert a `decimal128` element before `pos`.
    pub fn insert_decimal128(
        &mut self,
        pos: Position,
        key: &str,
        value: Decimal128,
    ) -> Result<Position, BuildError> {
        let at = self.prep_element(pos, ElementType::Decimal128, key, 16)?;
        self.root.bytes[at..at + 16].copy_from_slice(&value.0);
        Ok(pos)
    }

    /// Insert a maxkey element before `pos`.
    pub fn insert_maxkey(&mut self, pos: Position, key: &str) -> Result<Position, BuildError> {
        self.prep_element(pos, ElementType::MaxKey, key, 0)?;
        Ok(pos)
    }

    /// Insert a minkey element before `pos`.
    pub fn insert_minkey(&mut self, pos: Position, key: &str) -> Result<Position, BuildError> {
        self.prep_element(pos, ElementType::MinKey, key, 0)?;
        Ok(pos)
    }

    /// Remove the elements in `[first, last)`. Equal positions remove
    /// nothing. Returns the new position of `last`.
    ///
    /// # Errors
    ///
    /// [`BuildError::InvalidPosition`] if either position does not resolve,
    /// or `last` is not reachable from `first`.
    pub fn erase_range(&mut self, first: Position, last: Position) -> Result<Position, BuildError> {
        let delete = {
            let mut it = self.iter_at(first)?;
            debug_assert!(self.is_element_boundary(first));
            let mut total = 0usize;
            while it.position() != last {
                if it.done() {
                    return Err(BuildError::InvalidPosition);
                }
                total += it.byte_len();
                it = it.next_element();
                if it.error().is_some() {
                    return Err(BuildError::InvalidPosition);
                }
            }
            total
        };
        if delete == 0 {
            return Ok(first);
        }
        let at = self.doc_offset() + first.offset;
        self.splice(at, delete, 0)?;
        Ok(first)
    }

    /// Remove the single element at `pos`. Returns the new position of the
    /// element that followed it.
    ///
    /// # Errors
    ///
    /// [`BuildError::InvalidPosition`] if `pos` does not resolve to an
    /// element.
    pub fn erase(&mut self, pos: Position) -> Result<Position, BuildError> {
        let last = {
            let it = self.iter_at(pos)?;
            if it.done() {
                return Err(BuildError::InvalidPosition);
            }
            it.next_element().position()
        };
        self.erase_range(pos, last)
    }

    /// A mutator for the document or array element at `pos`.
    ///
    /// The child borrows this mutator exclusively; finish with it (or use
    /// [`parent_iterator`](Self::parent_iterator)) before touching the
    /// parent again.
    ///
    /// # Errors
    ///
    /// [`BuildError::NotADocument`] if the element is not a document or
    /// array; [`BuildError::InvalidPosition`] if `pos` does not resolve.
    pub fn subdocument(&mut self, pos: Position) -> Result<DocumentMut<'_, A>, BuildError> {
        let (elem, doc) = {
            let it = self.iter_at(pos)?;
            match it.element_type() {
                Some(ElementType::Document | ElementType::Array) => {}
                _ => return Err(BuildError::NotADocument),
            }
            (
                self.doc_offset() + pos.offset,
                self.doc_offset() + it.value_offset(),
            )
        };
        let mut chain = self.chain.clone();
        chain.push(Frame { elem, doc });
        Ok(DocumentMut {
            root: &mut *self.root,
            chain,
        })
    }

    /// The iterator, within the parent document, that refers to this child's
    /// element. `None` on the root mutator.
    ///
    /// This is how a caller re-synchronizes its view of the parent after
    /// mutating a subdocument: offsets are re-derived from the buffer as it
    /// is now, so the result is correct even after growth moved everything.
    #[must_use]
    pub fn parent_iterator(&self) -> Option<DocIter<'_>> {
        let frame = *self.chain.last()?;
        let parent_doc = if self.chain.len() >= 2 {
            self.chain[self.chain.len() - 2].doc
        } else {
            0
        };
        let parent_len = read_u32_le(&self.root.bytes[parent_doc..]) as usize;
        let parent = &self.root.bytes[parent_doc..parent_doc + parent_len];
        Some(DocIter::at(parent, frame.elem - parent_doc))
    }
}
