//! Non-owning document views and the lazy element iterator.
//!
//! Overview
//! - A [`DocumentView`] is a borrowed byte buffer whose header and terminator
//!   have been checked once, at construction. Nothing else is checked up
//!   front: element-level validity is established lazily, one element at a
//!   time, as a [`DocIter`] advances.
//! - Advancing the iterator is the load-bearing operation. Before an element
//!   is exposed it is bounds-checked: the type tag must be known, the key must
//!   have a NUL within the remaining bytes, and the value's declared or
//!   implied size must fit strictly inside what remains of the document. A
//!   violation produces a terminal errant iterator instead of an out-of-bounds
//!   read.
//! - Sizing is table-driven. Constant-size types come straight from
//!   [`FIXED_SIZES`]; length-prefixed types add a 32-bit prefix read; only
//!   `regex` needs a secondary scan over its two NUL-terminated strings. The
//!   arithmetic is done in 64 bits so a hostile length prefix cannot wrap.
//! - Nested documents are not walked when their parent element is visited.
//!   [`DocIter::document`] re-enters [`DocumentView::from_bytes`] on the value
//!   bytes, which is the only place nested validation happens on the lazy
//!   path.
//!
//! Iterators never outlive their view and own nothing; they are `Copy` tokens
//! of (buffer, offset). Equality compares positions and is meaningful for
//! non-errant iterators over the same view.

use bstr::{BStr, ByteSlice};

use crate::{
    error::{IterError, ViewError},
    types::{
        Binary, DbPointer, Decimal128, ElementType, FIXED_SIZES, ObjectId, Regex, SIZE_INVALID,
        Timestamp, VARSIZE_PREFIX, read_u32_le, read_u64_le,
    },
};

/// The smallest well-formed document: a length header and a terminator.
pub(crate) const MIN_DOC_LEN: usize = 5;

/// The largest declarable document length.
pub(crate) const MAX_DOC_LEN: u32 = i32::MAX as u32;

/// A read-only view of a document held in a borrowed byte buffer.
///
/// The view's logical length is the length the header declares, which may be
/// shorter than the buffer it was constructed from; trailing bytes are
/// ignored. This supports buffered reads of unknown size.
///
/// # Examples
///
/// ```
/// use bsonview::DocumentView;
///
/// // An empty document: length 5, no elements, terminator.
/// let bytes = [5u8, 0, 0, 0, 0];
/// let view = DocumentView::from_bytes(&bytes).unwrap();
/// assert!(view.is_empty());
/// assert_eq!(view.len(), 5);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DocumentView<'a> {
    /// Exactly the declared bytes: header, elements, terminator.
    data: &'a [u8],
}

impl<'a> DocumentView<'a> {
    /// Interpret `bytes` as a document.
    ///
    /// Checks the header and the terminator, nothing more. Elements are
    /// validated lazily during iteration; use
    /// [`validate_untrusted`](crate::validate_untrusted) when the buffer
    /// comes from an untrusted producer and must be fully checked once.
    ///
    /// # Errors
    ///
    /// - [`ViewError::ShortRead`] if `bytes` is shorter than five bytes or
    ///   shorter than the header declares.
    /// - [`ViewError::InvalidHeader`] if the declared length cannot be a
    ///   document length.
    /// - [`ViewError::InvalidTerminator`] if the declared final byte is not
    ///   zero.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, ViewError> {
        if bytes.len() < MIN_DOC_LEN {
            return Err(ViewError::ShortRead);
        }
        let declared = read_u32_le(bytes);
        if declared < MIN_DOC_LEN as u32 || declared > MAX_DOC_LEN {
            return Err(ViewError::InvalidHeader);
        }
        let declared = declared as usize;
        if declared > bytes.len() {
            return Err(ViewError::ShortRead);
        }
        if bytes[declared - 1] != 0 {
            return Err(ViewError::InvalidTerminator);
        }
        Ok(Self {
            data: &bytes[..declared],
        })
    }

    /// View bytes that are already known to hold a well-formed header and
    /// terminator, skipping the checks.
    pub(crate) fn trusted(bytes: &'a [u8]) -> Self {
        debug_assert!(Self::from_bytes(bytes).is_ok());
        Self { data: bytes }
    }

    /// The viewed bytes: exactly the declared length.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// The byte length of the document, as declared by its header.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the document contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == MIN_DOC_LEN
    }

    /// An iterator at the first element, or at the end for an empty document.
    #[must_use]
    pub fn begin(&self) -> DocIter<'a> {
        DocIter::at(self.data, 4)
    }

    /// The past-the-end iterator, positioned on the document terminator.
    #[must_use]
    pub fn end(&self) -> DocIter<'a> {
        DocIter::at(self.data, self.data.len() - 1)
    }

    /// Iterate the elements, yielding each positioned iterator in turn and a
    /// final `Err` if a malformed element is reached.
    #[must_use]
    pub fn elements(&self) -> Elements<'a> {
        Elements {
            it: self.begin(),
            failed: false,
        }
    }

    /// Linear scan for the first element whose key equals `key`.
    ///
    /// Returns the matching iterator, or a done/errant iterator if the scan
    /// reached the end or a malformed element first.
    #[must_use]
    pub fn find_key(&self, key: &str) -> DocIter<'a> {
        let mut it = self.begin();
        while !it.done() {
            if it.key_eq(key) {
                break;
            }
            it = it.next_element();
        }
        it
    }
}

/// A position token: the byte offset of an element within its document.
///
/// Positions are plain offsets, detached from any borrow, so they can be
/// carried across mutations. They are re-resolved against the document on
/// every use; a position taken before an insertion or erasure earlier in the
/// document is stale and will be rejected or refer to a different element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub(crate) offset: usize,
}

impl Position {
    /// The byte offset within the containing document.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// A cursor over one element of a [`DocumentView`].
///
/// The cursor is either positioned on an element, positioned past the end, or
/// errant. [`done`](Self::done) is true for the latter two;
/// [`error`](Self::error) distinguishes them. Advancing a done or errant
/// cursor returns it unchanged, so a loop over [`next_element`](Self::next_element)
/// always terminates.
#[derive(Debug, Clone, Copy)]
pub struct DocIter<'a> {
    /// The whole document: header, elements, terminator.
    doc: &'a [u8],
    /// Offset of the current element's type tag, or of the terminator.
    offset: usize,
    /// Length of the current key, without its NUL.
    key_len: usize,
    /// Byte length of the current value.
    value_size: usize,
    err: Option<IterError>,
}

impl<'a> DocIter<'a> {
    /// Position a cursor at `offset`, which must be the start of an element
    /// or the terminator, and bounds-check the element found there.
    pub(crate) fn at(doc: &'a [u8], offset: usize) -> Self {
        debug_assert!(offset >= 4 && offset < doc.len());
        let remaining = doc.len() - offset;
        if remaining == 1 {
            // Only the terminator remains; this is the past-the-end cursor.
            return Self {
                doc,
                offset,
                key_len: 0,
                value_size: 0,
                err: None,
            };
        }
        let tag = doc[offset];
        // The document terminator guarantees a NUL ahead, so this scan cannot
        // run off the buffer; a miss means the terminator itself is gone.
        let Some(key_len) = doc[offset + 1..].find_byte(0) else {
            return Self::errant(doc, offset, IterError::Invalid);
        };
        let value_offset = offset + 1 + key_len + 1;
        if doc.len() - value_offset < 1 {
            // The key's NUL was the document terminator; no room for a value.
            return Self::errant(doc, offset, IterError::ShortRead);
        }
        match value_size(tag, &doc[value_offset..]) {
            Ok(value_size) => Self {
                doc,
                offset,
                key_len,
                value_size,
                err: None,
            },
            Err(e) => Self::errant(doc, offset, e),
        }
    }

    fn errant(doc: &'a [u8], offset: usize, err: IterError) -> Self {
        Self {
            doc,
            offset,
            key_len: 0,
            value_size: 0,
            err: Some(err),
        }
    }

    /// True when the cursor is past the end or errant; advancing it further
    /// is a no-op.
    #[must_use]
    pub fn done(&self) -> bool {
        self.err.is_some() || self.offset == self.doc.len() - 1
    }

    /// The error that stopped iteration, if any.
    #[must_use]
    pub fn error(&self) -> Option<IterError> {
        self.err
    }

    /// This cursor's position token, usable with the mutation API.
    #[must_use]
    pub fn position(&self) -> Position {
        Position {
            offset: self.offset,
        }
    }

    /// The cursor for the element that follows this one.
    ///
    /// Returns the past-the-end cursor after the last element, an errant
    /// cursor if the next element is malformed, and `self` unchanged if this
    /// cursor is already done or errant.
    #[must_use]
    pub fn next_element(&self) -> Self {
        if self.done() {
            return *self;
        }
        Self::at(self.doc, self.offset + self.byte_len())
    }

    /// Total byte length of the current element: tag, key, NUL, value.
    pub(crate) fn byte_len(&self) -> usize {
        debug_assert!(!self.done());
        1 + self.key_len + 1 + self.value_size
    }

    /// Offset of the current value within the document.
    pub(crate) fn value_offset(&self) -> usize {
        self.offset + 1 + self.key_len + 1
    }

    /// The current value's bytes, exactly the computed value size long.
    pub(crate) fn value_bytes(&self) -> &'a [u8] {
        debug_assert!(!self.done());
        let start = self.value_offset();
        &self.doc[start..start + self.value_size]
    }

    /// The current element's key.
    ///
    /// Keys are NUL-free byte strings and are not guaranteed to be valid
    /// UTF-8. Empty for a done or errant cursor.
    #[must_use]
    pub fn key(&self) -> &'a BStr {
        BStr::new(&self.doc[self.offset + 1..self.offset + 1 + self.key_len])
    }

    /// Whether the current key equals `key`.
    #[must_use]
    pub fn key_eq(&self, key: &str) -> bool {
        let k: &[u8] = self.key();
        k == key.as_bytes()
    }

    /// The current element's type, or `None` for a done or errant cursor.
    #[must_use]
    pub fn element_type(&self) -> Option<ElementType> {
        if self.done() {
            return None;
        }
        ElementType::from_u8(self.doc[self.offset])
    }

    /// The current `double` value.
    #[must_use]
    pub fn double(&self) -> Option<f64> {
        self.expect(ElementType::Double)?;
        Some(f64::from_bits(read_u64_le(self.value_bytes())))
    }

    /// The current string value.
    ///
    /// The embedded length is validated against the element bounds. The bytes
    /// are not guaranteed to be valid UTF-8 and may contain NUL; the trailing
    /// NUL is not included.
    #[must_use]
    pub fn utf8(&self) -> Option<&'a BStr> {
        self.stringlike(ElementType::Utf8)
    }

    /// The current JavaScript code value, encoded like a string.
    #[must_use]
    pub fn code(&self) -> Option<&'a BStr> {
        self.stringlike(ElementType::Code)
    }

    /// The current symbol value, encoded like a string.
    #[must_use]
    pub fn symbol(&self) -> Option<&'a BStr> {
        self.stringlike(ElementType::Symbol)
    }

    fn stringlike(&self, want: ElementType) -> Option<&'a BStr> {
        self.expect(want)?;
        let value = self.value_bytes();
        let len = read_u32_le(value) as usize;
        if len < 1 || 4 + len > value.len() {
            return None;
        }
        Some(BStr::new(&value[4..4 + len - 1]))
    }

    /// View the current document or array value.
    ///
    /// This is where nested validation happens on the lazy path, and only at
    /// the header/terminator level; the nested document's elements are in
    /// turn validated as they are iterated.
    #[must_use]
    pub fn document(&self) -> Option<DocumentView<'a>> {
        let t = self.element_type()?;
        if t != ElementType::Document && t != ElementType::Array {
            return None;
        }
        DocumentView::from_bytes(self.value_bytes()).ok()
    }

    /// The current binary value.
    #[must_use]
    pub fn binary(&self) -> Option<Binary<'a>> {
        self.expect(ElementType::Binary)?;
        let value = self.value_bytes();
        let len = read_u32_le(value) as usize;
        if value.len() != len + 5 {
            return None;
        }
        Some(Binary {
            subtype: value[4],
            bytes: &value[5..],
        })
    }

    /// The current object id.
    #[must_use]
    pub fn object_id(&self) -> Option<ObjectId> {
        self.expect(ElementType::ObjectId)?;
        let bytes: [u8; 12] = self.value_bytes().try_into().ok()?;
        Some(ObjectId(bytes))
    }

    /// The current boolean. Any nonzero byte reads as `true`.
    #[must_use]
    pub fn bool_value(&self) -> Option<bool> {
        self.expect(ElementType::Bool)?;
        Some(self.value_bytes()[0] != 0)
    }

    /// The current datetime, in milliseconds since the Unix epoch.
    #[must_use]
    pub fn datetime(&self) -> Option<i64> {
        self.expect(ElementType::DateTime)?;
        Some(read_u64_le(self.value_bytes()) as i64)
    }

    /// The current regular expression.
    #[must_use]
    pub fn regex(&self) -> Option<Regex<'a>> {
        self.expect(ElementType::Regex)?;
        let value = self.value_bytes();
        let p = value.find_byte(0)?;
        let rest = &value[p + 1..];
        let o = rest.find_byte(0)?;
        Some(Regex {
            pattern: BStr::new(&value[..p]),
            options: BStr::new(&rest[..o]),
        })
    }

    /// The current dbpointer.
    #[must_use]
    pub fn dbpointer(&self) -> Option<DbPointer<'a>> {
        self.expect(ElementType::DbPointer)?;
        let value = self.value_bytes();
        let len = read_u32_le(value) as usize;
        if len < 1 || value.len() != 4 + len + 12 || value[3 + len] != 0 {
            return None;
        }
        let id: [u8; 12] = value[4 + len..].try_into().ok()?;
        Some(DbPointer {
            collection: BStr::new(&value[4..4 + len - 1]),
            id: ObjectId(id),
        })
    }

    /// The current code-with-scope value.
    ///
    /// The self-inclusive total size, the inner string size, and the scope
    /// document header are cross-checked; any disagreement yields `None`.
    #[must_use]
    pub fn code_with_scope(&self) -> Option<CodeWithScope<'a>> {
        self.expect(ElementType::CodeWithScope)?;
        let value = self.value_bytes();
        // Smallest possible: total, an empty string, an empty scope.
        if value.len() < 4 + (4 + 1) + MIN_DOC_LEN {
            return None;
        }
        let code_len = read_u32_le(&value[4..]) as usize;
        if code_len < 1 || 8 + code_len + MIN_DOC_LEN > value.len() || value[7 + code_len] != 0 {
            return None;
        }
        let scope = DocumentView::from_bytes(&value[8 + code_len..]).ok()?;
        if scope.len() != value.len() - 8 - code_len {
            return None;
        }
        Some(CodeWithScope {
            code: BStr::new(&value[8..8 + code_len - 1]),
            scope,
        })
    }

    /// The current `int32` value.
    #[must_use]
    pub fn int32(&self) -> Option<i32> {
        self.expect(ElementType::Int32)?;
        let v = self.value_bytes();
        Some(i32::from_le_bytes([v[0], v[1], v[2], v[3]]))
    }

    /// The current timestamp value.
    #[must_use]
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.expect(ElementType::Timestamp)?;
        let v = self.value_bytes();
        Some(Timestamp {
            increment: i32::from_le_bytes([v[0], v[1], v[2], v[3]]),
            seconds: i32::from_le_bytes([v[4], v[5], v[6], v[7]]),
        })
    }

    /// The current `int64` value.
    #[must_use]
    pub fn int64(&self) -> Option<i64> {
        self.expect(ElementType::Int64)?;
        Some(read_u64_le(self.value_bytes()) as i64)
    }

    /// The current `decimal128` value, as raw bytes.
    #[must_use]
    pub fn decimal128(&self) -> Option<Decimal128> {
        self.expect(ElementType::Decimal128)?;
        let bytes: [u8; 16] = self.value_bytes().try_into().ok()?;
        Some(Decimal128(bytes))
    }

    fn expect(&self, want: ElementType) -> Option<()> {
        (self.element_type()? == want).then_some(())
    }
}

impl PartialEq for DocIter<'_> {
    /// Position equality: same view, same offset.
    fn eq(&self, other: &Self) -> bool {
        self.doc.as_ptr() == other.doc.as_ptr()
            && self.doc.len() == other.doc.len()
            && self.offset == other.offset
    }
}

/// A JavaScript code value together with its scope document.
#[derive(Debug, Clone, Copy)]
pub struct CodeWithScope<'a> {
    /// The code source, without its trailing NUL.
    pub code: &'a BStr,
    /// The scope document.
    pub scope: DocumentView<'a>,
}

/// Adapter turning a [`DocIter`] into a `core::iter::Iterator`.
///
/// Yields each positioned cursor; if a malformed element stops the walk, the
/// final item is the error and iteration ends.
#[derive(Debug, Clone)]
pub struct Elements<'a> {
    it: DocIter<'a>,
    failed: bool,
}

impl<'a> Iterator for Elements<'a> {
    type Item = Result<DocIter<'a>, IterError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(err) = self.it.error() {
            self.failed = true;
            return Some(Err(err));
        }
        if self.it.done() {
            return None;
        }
        let current = self.it;
        self.it = self.it.next_element();
        Some(Ok(current))
    }
}

/// Compute the byte length of the value that begins at `value[0]`.
///
/// `value` runs from the value's first byte to the end of the document, so it
/// always ends with the document terminator. The computed length must be
/// strictly smaller than `value.len()`, which is exactly the requirement that
/// the value leaves the terminator in place.
fn value_size(tag: u8, value: &[u8]) -> Result<usize, IterError> {
    let fixed = FIXED_SIZES[usize::from(tag)];
    let varsize = VARSIZE_PREFIX[usize::from(tag)];
    // 64-bit so that fixed + prefix cannot wrap, whatever the prefix says.
    let mut full = u64::from(fixed);
    if varsize {
        if value.len() <= 4 {
            // Not enough bytes to read the length prefix itself.
            return Err(IterError::ShortRead);
        }
        full += u64::from(read_u32_le(value));
    }
    if full < value.len() as u64 {
        return Ok(full as usize);
    }
    // The table entry for regex is a sentinel that always lands here; its
    // real length comes from scanning its two NUL-terminated strings.
    if tag == ElementType::Regex as u8 {
        return regex_size(value);
    }
    if fixed == SIZE_INVALID {
        return Err(IterError::InvalidType);
    }
    Err(IterError::ShortRead)
}

/// Byte length of a regex value: pattern NUL options NUL.
fn regex_size(value: &[u8]) -> Result<usize, IterError> {
    let p = value.find_byte(0).ok_or(IterError::ShortRead)?;
    let rest = &value[p + 1..];
    let o = rest.find_byte(0).ok_or(IterError::ShortRead)?;
    let total = p + 1 + o + 1;
    // Strictly less: the document terminator must remain beyond the value.
    if total >= value.len() {
        return Err(IterError::ShortRead);
    }
    Ok(total)
}
