use alloc::vec::Vec;

use crate::{
    DocumentBuf, DocumentView, ElementType, ValidateErrorKind, validate_untrusted,
};

/// `depth` documents nested under key "d", innermost empty, built bottom-up.
fn deeply_nested(depth: usize) -> Vec<u8> {
    let mut doc = alloc::vec![5u8, 0, 0, 0, 0];
    for _ in 0..depth {
        let elem_len = 1 + 2 + doc.len();
        let total = 4 + elem_len + 1;
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&u32::try_from(total).unwrap().to_le_bytes());
        out.extend_from_slice(&[0x03, b'd', 0]);
        out.extend_from_slice(&doc);
        out.push(0);
        doc = out;
    }
    doc
}

/// The recursive counterpart of the eager validator, expressed in terms of
/// the lazy iteration API. The two must agree on every input.
fn lazy_walk_ok(bytes: &[u8]) -> bool {
    fn walk(view: DocumentView) -> bool {
        let mut it = view.begin();
        loop {
            if it.error().is_some() {
                return false;
            }
            if it.done() {
                return true;
            }
            match it.element_type() {
                Some(ElementType::Document | ElementType::Array) => match it.document() {
                    Some(sub) => {
                        if !walk(sub) {
                            return false;
                        }
                    }
                    None => return false,
                },
                Some(ElementType::CodeWithScope) => match it.code_with_scope() {
                    Some(cws) => {
                        if !walk(cws.scope) {
                            return false;
                        }
                    }
                    None => return false,
                },
                _ => {}
            }
            it = it.next_element();
        }
    }
    DocumentView::from_bytes(bytes).is_ok_and(walk)
}

#[test]
fn success_returns_an_equivalent_view() {
    let mut doc = DocumentBuf::new();
    {
        let mut m = doc.as_mut();
        let end = m.end_position();
        m.insert_utf8(end, "k", "v").unwrap();
    }
    let validated = validate_untrusted(doc.as_bytes()).unwrap();
    let direct = DocumentView::from_bytes(doc.as_bytes()).unwrap();
    assert_eq!(validated.as_bytes(), direct.as_bytes());
    assert_eq!(validated.begin(), direct.begin());
}

#[test]
fn nested_defects_are_found_and_located() {
    let mut doc = DocumentBuf::new();
    {
        let mut m = doc.as_mut();
        let end = m.end_position();
        let pos = m.insert_document(end, "d", None).unwrap();
        let mut sub = m.subdocument(pos).unwrap();
        let end = sub.end_position();
        sub.insert_int32(end, "x", 1).unwrap();
    }
    let mut bytes = doc.as_bytes().to_vec();
    assert!(validate_untrusted(&bytes).is_ok());

    // Corrupt the nested document's length header: its value starts after
    // the outer header (4) and the element frame (tag + "d\0" = 3). The
    // declared length 4 truncates the nested value below the minimum, so the
    // nested view construction reports a short read.
    let nested_start = 4 + 3;
    bytes[nested_start] = 4;
    let err = validate_untrusted(&bytes).unwrap_err();
    assert_eq!(err.offset, nested_start);
    assert_eq!(err.kind, ValidateErrorKind::ShortRead);
    assert!(!lazy_walk_ok(&bytes));
}

#[test]
fn corrupt_nested_element_is_attributed_to_its_offset() {
    let mut doc = DocumentBuf::new();
    {
        let mut m = doc.as_mut();
        let end = m.end_position();
        let pos = m.insert_document(end, "d", None).unwrap();
        let mut sub = m.subdocument(pos).unwrap();
        let end = sub.end_position();
        sub.insert_int32(end, "x", 1).unwrap();
    }
    let mut bytes = doc.as_bytes().to_vec();
    // The nested element's tag sits after both headers and the element frame.
    let nested_elem = 4 + 3 + 4;
    bytes[nested_elem] = 0x20;
    let err = validate_untrusted(&bytes).unwrap_err();
    assert_eq!(err.offset, nested_elem);
    assert_eq!(err.kind, ValidateErrorKind::InvalidType);
    assert!(!lazy_walk_ok(&bytes));
}

#[test]
fn adversarial_nesting_depth_does_not_recurse() {
    // Far deeper than any call stack would tolerate if validation recursed.
    let bytes = deeply_nested(100_000);
    assert!(validate_untrusted(&bytes).is_ok());
}

#[test]
fn deep_corruption_is_detected() {
    let mut bytes = deeply_nested(64);
    assert!(validate_untrusted(&bytes).is_ok());
    let last = bytes.len() - 1;
    bytes[last] = 1;
    let err = validate_untrusted(&bytes).unwrap_err();
    assert_eq!(err.kind, ValidateErrorKind::InvalidTerminator);
    assert!(!lazy_walk_ok(&bytes));
}

#[test]
fn code_with_scope_consistency_is_checked() {
    let mut scope = DocumentBuf::new();
    {
        let mut m = scope.as_mut();
        let end = m.end_position();
        m.insert_int32(end, "s", 1).unwrap();
    }
    let mut doc = DocumentBuf::new();
    {
        let mut m = doc.as_mut();
        let end = m.end_position();
        m.insert_code_with_scope(end, "c", "f()", scope.as_view())
            .unwrap();
    }
    let bytes = doc.as_bytes().to_vec();
    assert!(validate_untrusted(&bytes).is_ok());
    assert!(lazy_walk_ok(&bytes));

    // Shrink the inner string size so the three sizes disagree.
    let mut bad = bytes.clone();
    let code_size_at = 4 + 3 + 4;
    bad[code_size_at] = 2;
    let err = validate_untrusted(&bad).unwrap_err();
    assert_eq!(err.kind, ValidateErrorKind::Invalid);
    assert!(!lazy_walk_ok(&bad));
}

#[test]
fn agreement_on_directed_corpus() {
    let mut doc = DocumentBuf::new();
    {
        let mut m = doc.as_mut();
        let end = m.end_position();
        m.insert_utf8(end, "s", "text").unwrap();
        let end = m.end_position();
        let pos = m.insert_document(end, "d", None).unwrap();
        let mut sub = m.subdocument(pos).unwrap();
        let end = sub.end_position();
        sub.insert_bool(end, "b", true).unwrap();
    }
    let bytes = doc.as_bytes();
    // Flip every byte through a handful of values; the eager and lazy
    // verdicts must match at each point.
    for idx in 0..bytes.len() {
        for replacement in [0x00, 0x01, 0x04, 0x7F, 0xFF] {
            let mut mutated = bytes.to_vec();
            mutated[idx] = replacement;
            assert_eq!(
                validate_untrusted(&mutated).is_ok(),
                lazy_walk_ok(&mutated),
                "disagreement at byte {idx} value {replacement:#x}"
            );
        }
    }
}
