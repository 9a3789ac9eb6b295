//! Eager, whole-buffer validation of untrusted input.
//!
//! Lazy iteration checks exactly one element ahead of the caller, which is
//! the right cost model for trusted data. Bytes arriving from an untrusted
//! channel want the opposite: check everything once, then hand the resulting
//! view around freely. [`validate_untrusted`] performs that full pre-order
//! walk, recursing into every nested document, array, and code-with-scope
//! scope, using the same size tables and error taxonomy as the iterator. A
//! failure reports the byte offset of the first violation within the input.
//!
//! Nesting depth is bounded only by the buffer (each level costs at least
//! five bytes), so the walk keeps its own work stack on the heap instead of
//! recursing; adversarially deep nesting cannot overflow the call stack.

use alloc::vec::Vec;

use crate::{
    error::{ValidateError, ValidateErrorKind},
    types::ElementType,
    view::{DocIter, DocumentView},
};

/// Walk the entire buffer up front and return a trusted view on success.
///
/// On success the returned view is the one [`DocumentView::from_bytes`] would
/// produce for the same bytes, with the construction cost already paid; it
/// can be iterated lazily without re-validating.
///
/// # Errors
///
/// The first violation found, with its byte offset within `bytes`. The kinds
/// mirror the lazy path: a document-level defect at any depth maps to the
/// header/terminator kinds, a malformed element to the iterator kinds.
///
/// # Examples
///
/// ```
/// use bsonview::{validate_untrusted, ValidateErrorKind};
///
/// let ok = [5u8, 0, 0, 0, 0];
/// assert!(validate_untrusted(&ok).is_ok());
///
/// let bad = [5u8, 0, 0, 0, 1];
/// let err = validate_untrusted(&bad).unwrap_err();
/// assert_eq!(err.kind, ValidateErrorKind::InvalidTerminator);
/// ```
pub fn validate_untrusted(bytes: &[u8]) -> Result<DocumentView<'_>, ValidateError> {
    let view = DocumentView::from_bytes(bytes).map_err(|e| ValidateError {
        offset: 0,
        kind: e.into(),
    })?;
    // Pending cursors, each with the offset of its document within `bytes`.
    let mut stack: Vec<(usize, DocIter)> = Vec::new();
    stack.push((0, view.begin()));
    while let Some((base, mut it)) = stack.pop() {
        loop {
            if let Some(kind) = it.error() {
                return Err(ValidateError {
                    offset: base + it.position().offset(),
                    kind: kind.into(),
                });
            }
            if it.done() {
                break;
            }
            match it.element_type() {
                Some(ElementType::Document | ElementType::Array) => {
                    let value_offset = base + it.value_offset();
                    let nested =
                        DocumentView::from_bytes(it.value_bytes()).map_err(|e| ValidateError {
                            offset: value_offset,
                            kind: e.into(),
                        })?;
                    // Finish this document later; descend first.
                    stack.push((base, it.next_element()));
                    stack.push((value_offset, nested.begin()));
                    break;
                }
                Some(ElementType::CodeWithScope) => {
                    let value_offset = base + it.value_offset();
                    let Some(cws) = it.code_with_scope() else {
                        return Err(ValidateError {
                            offset: value_offset,
                            kind: ValidateErrorKind::Invalid,
                        });
                    };
                    let scope_offset =
                        base + it.value_offset() + (it.value_bytes().len() - cws.scope.len());
                    stack.push((base, it.next_element()));
                    stack.push((scope_offset, cws.scope.begin()));
                    break;
                }
                _ => it = it.next_element(),
            }
        }
    }
    Ok(view)
}
