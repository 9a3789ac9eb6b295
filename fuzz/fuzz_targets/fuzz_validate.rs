#![no_main]
use bsonview::{DocumentView, ElementType, validate_untrusted};
use libfuzzer_sys::fuzz_target;

/// Recursive lazy walk mirroring what the eager validator checks. Recursion
/// depth is bounded by the input length the fuzzer hands us.
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

/// Exercise every accessor so that any out-of-bounds slice in the read path
/// panics under the fuzzer.
fn poke_accessors(view: DocumentView) {
    let mut it = view.begin();
    while !it.done() {
        let _ = it.key();
        let _ = it.double();
        let _ = it.utf8();
        let _ = it.code();
        let _ = it.symbol();
        let _ = it.binary();
        let _ = it.object_id();
        let _ = it.bool_value();
        let _ = it.datetime();
        let _ = it.regex();
        let _ = it.dbpointer();
        let _ = it.int32();
        let _ = it.int64();
        let _ = it.timestamp();
        let _ = it.decimal128();
        if let Some(sub) = it.document() {
            poke_accessors(sub);
        }
        if let Some(cws) = it.code_with_scope() {
            poke_accessors(cws.scope);
        }
        it = it.next_element();
    }
}

fuzz_target!(|data: &[u8]| {
    let eager = validate_untrusted(data);
    let lazy = lazy_walk_ok(data);
    assert_eq!(eager.is_ok(), lazy, "eager and lazy validation disagree");
    if let Ok(view) = eager {
        poke_accessors(view);
    }
});
