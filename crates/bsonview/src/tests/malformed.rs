use alloc::vec::Vec;

use rstest::rstest;

use crate::{DocumentView, IterError, ViewError, validate_untrusted};

#[rstest]
#[case::truncated_header(&[4, 0, 0], ViewError::ShortRead)]
#[case::declared_below_minimum(&[4, 0, 0, 0, 0], ViewError::InvalidHeader)]
#[case::declared_negative(&[0, 0, 0, 0x80, 0], ViewError::InvalidHeader)]
#[case::declared_past_buffer(&[10, 0, 0, 0, 0], ViewError::ShortRead)]
#[case::missing_terminator(&[5, 0, 0, 0, 7], ViewError::InvalidTerminator)]
fn header_level_rejections(#[case] bytes: &[u8], #[case] want: ViewError) {
    assert_eq!(DocumentView::from_bytes(bytes).unwrap_err(), want);
    // The eager validator reports the same defect, at the document start.
    let err = validate_untrusted(bytes).unwrap_err();
    assert_eq!(err.offset, 0);
    assert_eq!(err.kind, want.into());
}

/// A string element whose length prefix points past the end of the document.
fn oversized_utf8() -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&[15, 0, 0, 0]);
    b.extend_from_slice(&[0x02, b's', 0]);
    b.extend_from_slice(&100u32.to_le_bytes());
    b.extend_from_slice(b"hi\0");
    b.push(0);
    b
}

/// An element with a tag byte outside the known set.
fn unknown_tag() -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&[12, 0, 0, 0]);
    b.extend_from_slice(&[0x20, b'k', 0]);
    b.extend_from_slice(&[1, 2, 3, 4]);
    b.push(0);
    b
}

/// The key's NUL is the document terminator, leaving no room for a value.
fn key_consumes_document() -> Vec<u8> {
    alloc::vec![7, 0, 0, 0, 0x0A, b'k', 0]
}

/// A regex whose options string has no NUL of its own before the document
/// terminator.
fn regex_missing_nul() -> Vec<u8> {
    alloc::vec![11, 0, 0, 0, 0x0B, b'r', 0, b'a', 0, b'b', 0]
}

/// A bool element truncated by the end of the document.
fn truncated_bool() -> Vec<u8> {
    alloc::vec![8, 0, 0, 0, 0x08, b'b', 0, 0]
}

#[rstest]
#[case::utf8_prefix_overruns(oversized_utf8(), IterError::ShortRead)]
#[case::unknown_tag(unknown_tag(), IterError::InvalidType)]
#[case::key_consumes_document(key_consumes_document(), IterError::ShortRead)]
#[case::regex_missing_nul(regex_missing_nul(), IterError::ShortRead)]
#[case::truncated_bool(truncated_bool(), IterError::ShortRead)]
fn first_element_rejections(#[case] bytes: Vec<u8>, #[case] want: IterError) {
    let view = DocumentView::from_bytes(&bytes).unwrap();
    let it = view.begin();
    assert_eq!(it.error(), Some(want));
    assert!(it.done());

    let err = validate_untrusted(&bytes).unwrap_err();
    assert_eq!(err.kind, want.into());
    // The violation is attributed to the element, which starts after the
    // four header bytes.
    assert_eq!(err.offset, 4);
}

#[test]
fn errant_iterator_is_terminal() {
    let bytes = oversized_utf8();
    let view = DocumentView::from_bytes(&bytes).unwrap();
    let it = view.begin();
    assert!(it.done());
    // Advancing a terminal iterator is a guarded no-op.
    let again = it.next_element();
    assert_eq!(again.error(), it.error());
    assert_eq!(again.position(), it.position());
}

#[test]
fn elements_adapter_yields_the_error_once() {
    let bytes = unknown_tag();
    let view = DocumentView::from_bytes(&bytes).unwrap();
    let mut elems = view.elements();
    assert_eq!(elems.next(), Some(Err(IterError::InvalidType)));
    assert_eq!(elems.next(), None);
}

#[test]
fn error_after_a_valid_element() {
    // One good int32, then a truncated bool.
    let mut b = Vec::new();
    b.extend_from_slice(&[15, 0, 0, 0]);
    b.extend_from_slice(&[0x10, b'a', 0]);
    b.extend_from_slice(&1i32.to_le_bytes());
    b.extend_from_slice(&[0x08, b'b', 0]);
    b.push(0);
    let view = DocumentView::from_bytes(&b).unwrap();

    let first = view.begin();
    assert!(first.key_eq("a"));
    assert_eq!(first.int32(), Some(1));
    let second = first.next_element();
    assert_eq!(second.error(), Some(IterError::ShortRead));

    let err = validate_untrusted(&b).unwrap_err();
    assert_eq!(err.offset, 11);
}
