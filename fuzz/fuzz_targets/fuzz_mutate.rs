#![no_main]
use arbitrary::Arbitrary;
use bsonview::{DocumentBuf, DocumentMut, ObjectId, Timestamp, validate_untrusted};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Int32 { key: String, value: i32 },
    Int64 { key: String, value: i64 },
    Double { key: String, value: f64 },
    Utf8 { key: String, value: String },
    Bool { key: String, value: bool },
    Null { key: String },
    Binary { key: String, subtype: u8, data: Vec<u8> },
    ObjectId { key: String, id: [u8; 12] },
    Timestamp { key: String, increment: i32, seconds: i32 },
    Regex { key: String, pattern: String, options: String },
    PushDoc { key: String },
    PushArray { key: String },
    Pop,
    EraseFirst,
    EraseLastInserted,
}

/// Apply ops to `m`, descending into a child on `PushDoc`/`PushArray` and
/// returning to the parent on `Pop`. Rejected insertions (NUL keys and the
/// like) leave the document untouched and are simply skipped.
fn apply(m: &mut DocumentMut<'_>, ops: &mut std::slice::Iter<'_, Op>) {
    let mut last = None;
    while let Some(op) = ops.next() {
        let end = m.end_position();
        let inserted = match op {
            Op::Int32 { key, value } => m.insert_int32(end, key, *value),
            Op::Int64 { key, value } => m.insert_int64(end, key, *value),
            Op::Double { key, value } => m.insert_double(end, key, *value),
            Op::Utf8 { key, value } => m.insert_utf8(end, key, value),
            Op::Bool { key, value } => m.insert_bool(end, key, *value),
            Op::Null { key } => m.insert_null(end, key),
            Op::Binary { key, subtype, data } => m.insert_binary(end, key, *subtype, data),
            Op::ObjectId { key, id } => m.insert_object_id(end, key, ObjectId(*id)),
            Op::Timestamp {
                key,
                increment,
                seconds,
            } => m.insert_timestamp(
                end,
                key,
                Timestamp {
                    increment: *increment,
                    seconds: *seconds,
                },
            ),
            Op::Regex {
                key,
                pattern,
                options,
            } => m.insert_regex(end, key, pattern, options),
            Op::PushDoc { key } | Op::PushArray { key } => {
                let result = if matches!(op, Op::PushDoc { .. }) {
                    m.insert_document(end, key, None)
                } else {
                    m.insert_array(end, key, None)
                };
                if let Ok(pos) = result {
                    let mut child = m.subdocument(pos).expect("inserted a document");
                    apply(&mut child, ops);
                }
                continue;
            }
            Op::Pop => return,
            Op::EraseFirst => {
                if !m.is_empty() {
                    m.erase(m.begin_position()).expect("first element exists");
                }
                // Erasure shifts everything after it; the remembered
                // position would be stale.
                last = None;
                continue;
            }
            Op::EraseLastInserted => {
                if let Some(pos) = last.take() {
                    let _ = m.erase(pos);
                }
                continue;
            }
        };
        if let Ok(pos) = inserted {
            last = Some(pos);
        }
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let mut doc = DocumentBuf::new();
    apply(&mut doc.as_mut(), &mut ops.iter());
    // Whatever the op sequence did, the buffer must still hold a fully
    // valid document.
    validate_untrusted(doc.as_bytes()).expect("builder output must validate");
});
