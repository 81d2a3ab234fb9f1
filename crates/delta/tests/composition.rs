//! Property tests for delta composition.
//!
//! Edits are generated relative to the document they will be applied to, so
//! every generated edit is in bounds.

use delta::{AttributeMap, Delta, DeltaError};
use proptest::prelude::*;
use serde_json::Value;

#[derive(Clone, Debug)]
enum Step {
    Retain(usize, Option<bool>),
    Insert(String, bool),
    Delete(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (1usize..5, proptest::option::of(any::<bool>())).prop_map(|(n, b)| Step::Retain(n, b)),
        ("[a-cé]{1,4}", any::<bool>()).prop_map(|(s, b)| Step::Insert(s, b)),
        (1usize..5).prop_map(Step::Delete),
    ]
}

fn bold(value: Value) -> Option<AttributeMap> {
    let mut map = AttributeMap::new();
    map.insert("bold".to_string(), value);
    Some(map)
}

/// Build an edit from `steps`, clamping spans to the `base` length.
fn build(steps: &[Step], base: usize) -> Delta {
    let mut remaining = base;
    let mut edit = Delta::new();
    for step in steps {
        edit = match step {
            Step::Retain(n, attr) => {
                let n = (*n).min(remaining);
                remaining -= n;
                let attributes = attr.and_then(|on| {
                    bold(if on { Value::Bool(true) } else { Value::Null })
                });
                edit.retain_with(n, attributes)
            }
            Step::Insert(text, on) => {
                let attributes = if *on { bold(Value::Bool(true)) } else { None };
                edit.insert_with(text.clone(), attributes)
            }
            Step::Delete(n) => {
                let n = (*n).min(remaining);
                remaining -= n;
                edit.delete(n)
            }
        };
    }
    edit
}

fn document(steps: &[Step]) -> Delta {
    Delta::new()
        .apply(&build(steps, 0))
        .expect("inserts onto an empty document are always in bounds")
}

proptest! {
    #[test]
    fn applying_twice_equals_applying_the_composition(
        doc_steps in proptest::collection::vec(step(), 0..8),
        a_steps in proptest::collection::vec(step(), 0..8),
        b_steps in proptest::collection::vec(step(), 0..8),
    ) {
        let doc = document(&doc_steps);
        let a = build(&a_steps, doc.len());
        let mid = doc.apply(&a).unwrap();
        let b = build(&b_steps, mid.len());

        let sequential = mid.apply(&b).unwrap();
        let composed = doc.apply(&a.compose(&b)).unwrap();
        prop_assert_eq!(sequential, composed);
    }

    #[test]
    fn applied_edit_yields_document_of_expected_length(
        doc_steps in proptest::collection::vec(step(), 0..8),
        edit_steps in proptest::collection::vec(step(), 0..8),
    ) {
        let doc = document(&doc_steps);
        let edit = build(&edit_steps, doc.len());
        let next = doc.apply(&edit).unwrap();

        prop_assert!(next.is_document());
        prop_assert_eq!(next.len(), doc.len() - edit.base_len() + edit.target_len());
    }

    #[test]
    fn spans_past_the_end_are_rejected(
        doc_steps in proptest::collection::vec(step(), 0..8),
        extra in 1usize..10,
        delete in any::<bool>(),
    ) {
        let doc = document(&doc_steps);
        let len = doc.len() + extra;
        let edit = if delete { Delta::new().delete(len) } else { Delta::new().retain(len) };

        prop_assert_eq!(
            doc.apply(&edit),
            Err(DeltaError::OutOfRange { needed: len, available: doc.len() })
        );
    }
}

#[test]
fn concurrent_inserts_at_same_offset_apply_in_arrival_order() {
    // Two clients both append at offset 2 of "hi". Whichever edit arrives
    // second lands on top of the first; nothing reconciles them.
    let doc = Delta::new().insert("hi");
    let from_a = Delta::new().retain(2).insert("A");
    let from_b = Delta::new().retain(2).insert("B");

    let a_first = doc.apply(&from_a).unwrap().apply(&from_b).unwrap();
    let b_first = doc.apply(&from_b).unwrap().apply(&from_a).unwrap();

    assert_eq!(a_first.plain_text(), "hiBA");
    assert_eq!(b_first.plain_text(), "hiAB");
}
