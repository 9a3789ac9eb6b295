use alloc::{string::String, vec::Vec};

use quickcheck::{Arbitrary, Gen, QuickCheck};

use crate::{
    DocumentBuf, DocumentMut, DocumentView, ElementType, validate_untrusted,
};

/// A generator-friendly value model covering scalars and nested documents.
#[derive(Debug, Clone)]
enum Val {
    I32(i32),
    I64(i64),
    F64(f64),
    Bool(bool),
    Null,
    Str(String),
    Doc(Vec<(String, Val)>),
}

/// Keys are NUL-terminated on the wire, so generated keys drop NULs.
fn arbitrary_key(g: &mut Gen) -> String {
    String::arbitrary(g).replace('\0', "")
}

fn arbitrary_val(g: &mut Gen, depth: usize) -> Val {
    let variants = if depth == 0 { 6 } else { 7 };
    match u8::arbitrary(g) % variants {
        0 => Val::I32(i32::arbitrary(g)),
        1 => Val::I64(i64::arbitrary(g)),
        2 => Val::F64(f64::arbitrary(g)),
        3 => Val::Bool(bool::arbitrary(g)),
        4 => Val::Null,
        5 => Val::Str(String::arbitrary(g)),
        _ => {
            let n = usize::arbitrary(g) % 4;
            Val::Doc(
                (0..n)
                    .map(|_| (arbitrary_key(g), arbitrary_val(g, depth - 1)))
                    .collect(),
            )
        }
    }
}

impl Arbitrary for Val {
    fn arbitrary(g: &mut Gen) -> Self {
        arbitrary_val(g, 2)
    }
}

fn build_into(m: &mut DocumentMut<'_>, items: &[(String, Val)]) {
    for (key, val) in items {
        let end = m.end_position();
        match val {
            Val::I32(x) => {
                m.insert_int32(end, key, *x).unwrap();
            }
            Val::I64(x) => {
                m.insert_int64(end, key, *x).unwrap();
            }
            Val::F64(x) => {
                m.insert_double(end, key, *x).unwrap();
            }
            Val::Bool(x) => {
                m.insert_bool(end, key, *x).unwrap();
            }
            Val::Null => {
                m.insert_null(end, key).unwrap();
            }
            Val::Str(s) => {
                m.insert_utf8(end, key, s).unwrap();
            }
            Val::Doc(sub) => {
                let pos = m.insert_document(end, key, None).unwrap();
                let mut child = m.subdocument(pos).unwrap();
                build_into(&mut child, sub);
            }
        }
    }
}

fn build_doc(items: &[(String, Val)]) -> DocumentBuf {
    let mut doc = DocumentBuf::new();
    build_into(&mut doc.as_mut(), items);
    doc
}

fn check_doc(view: DocumentView<'_>, items: &[(String, Val)]) -> bool {
    let mut it = view.begin();
    for (key, val) in items {
        if it.done() || !it.key_eq(key) {
            return false;
        }
        let ok = match val {
            Val::I32(x) => it.int32() == Some(*x),
            Val::I64(x) => it.int64() == Some(*x),
            Val::F64(x) => it.double().map(f64::to_bits) == Some(x.to_bits()),
            Val::Bool(x) => it.bool_value() == Some(*x),
            Val::Null => it.element_type() == Some(ElementType::Null),
            Val::Str(s) => it.utf8().is_some_and(|b| {
                let b: &[u8] = b;
                b == s.as_bytes()
            }),
            Val::Doc(sub) => it.document().is_some_and(|v| check_doc(v, sub)),
        };
        if !ok {
            return false;
        }
        it = it.next_element();
    }
    it.done() && it.error().is_none()
}

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

fn test_count() -> u64 {
    if is_ci::cached() { 10_000 } else { 1_000 }
}

/// Property: inserting any sequence of values into an empty document and
/// iterating the result yields the same keys and values, in insertion order,
/// and the bytes pass eager validation.
#[test]
fn roundtrip_quickcheck() {
    fn prop(items: Vec<(String, Val)>) -> bool {
        let items: Vec<_> = items
            .into_iter()
            .map(|(k, v)| (k.replace('\0', ""), v))
            .collect();
        let doc = build_doc(&items);
        if validate_untrusted(doc.as_bytes()).is_err() {
            return false;
        }
        check_doc(doc.as_view(), &items)
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Vec<(String, Val)>) -> bool);
}

/// Property: the eager validator and a full lazy walk agree on every buffer,
/// including buffers corrupted at an arbitrary point.
#[test]
fn validator_iterator_agreement_quickcheck() {
    fn prop(items: Vec<(String, Val)>, index: usize, replacement: u8) -> bool {
        let items: Vec<_> = items
            .into_iter()
            .map(|(k, v)| (k.replace('\0', ""), v))
            .collect();
        let mut bytes = build_doc(&items).into_bytes();
        let index = index % bytes.len();
        bytes[index] = replacement;
        validate_untrusted(&bytes).is_ok() == lazy_walk_ok(&bytes)
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Vec<(String, Val)>, usize, u8) -> bool);
}

/// Property: erasing a freshly appended element restores the exact bytes.
#[test]
fn erase_undoes_insert_quickcheck() {
    fn prop(items: Vec<(String, Val)>, key: String, value: i32) -> bool {
        let items: Vec<_> = items
            .into_iter()
            .map(|(k, v)| (k.replace('\0', ""), v))
            .collect();
        let key = key.replace('\0', "");
        let mut doc = build_doc(&items);
        let before = doc.as_bytes().to_vec();
        let mut m = doc.as_mut();
        let end = m.end_position();
        let pos = m.insert_int32(end, &key, value).unwrap();
        m.erase(pos).unwrap();
        doc.as_bytes() == &before[..]
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Vec<(String, Val)>, String, i32) -> bool);
}

/// Property: view construction is idempotent; two views of the same bytes
/// iterate identically.
#[test]
fn idempotent_views_quickcheck() {
    fn prop(items: Vec<(String, Val)>) -> bool {
        let items: Vec<_> = items
            .into_iter()
            .map(|(k, v)| (k.replace('\0', ""), v))
            .collect();
        let doc = build_doc(&items);
        let snapshot = |view: DocumentView| -> Vec<(Vec<u8>, Option<ElementType>)> {
            view.elements()
                .map(|e| {
                    let it = e.unwrap();
                    (it.key().to_vec(), it.element_type())
                })
                .collect()
        };
        let a = snapshot(DocumentView::from_bytes(doc.as_bytes()).unwrap());
        let b = snapshot(DocumentView::from_bytes(doc.as_bytes()).unwrap());
        a == b
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Vec<(String, Val)>) -> bool);
}
