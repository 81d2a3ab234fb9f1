//! The [`Delta`] type: a normalized sequence of ops.

use crate::attributes::{self, AttributeMap};
use crate::error::{DeltaError, DeltaResult};
use crate::iter::OpCursor;
use crate::op::{InsertValue, Op, OpKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An ordered list of retain/insert/delete ops.
///
/// A delta made only of inserts is a *document*; any other delta is an
/// *edit* that can be applied to a document. Ops are kept normalized: no
/// zero-length ops, adjacent compatible ops merged, inserts placed before an
/// adjacent delete.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "DeltaRepr")]
pub struct Delta {
    ops: Vec<Op>,
}

#[derive(Deserialize)]
struct DeltaRepr {
    ops: Vec<Op>,
}

impl From<DeltaRepr> for Delta {
    fn from(repr: DeltaRepr) -> Self {
        repr.ops.into_iter().collect()
    }
}

impl FromIterator<Op> for Delta {
    fn from_iter<I: IntoIterator<Item = Op>>(iter: I) -> Self {
        let mut delta = Delta::new();
        for op in iter {
            delta.push(op);
        }
        delta
    }
}

impl Delta {
    /// Create an empty delta (the empty document, or the no-op edit).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Insert plain text.
    pub fn insert(self, text: impl Into<String>) -> Self {
        self.insert_with(text, None)
    }

    /// Insert text carrying formatting attributes.
    pub fn insert_with(
        mut self,
        text: impl Into<String>,
        attributes: Option<AttributeMap>,
    ) -> Self {
        self.push(Op::Insert {
            value: InsertValue::Text(text.into()),
            attributes: attributes::normalize(attributes),
        });
        self
    }

    /// Insert an embed object, which occupies a single position.
    pub fn insert_embed(
        mut self,
        embed: Map<String, Value>,
        attributes: Option<AttributeMap>,
    ) -> Self {
        self.push(Op::Insert {
            value: InsertValue::Embed(embed),
            attributes: attributes::normalize(attributes),
        });
        self
    }

    pub fn retain(self, len: usize) -> Self {
        self.retain_with(len, None)
    }

    /// Keep `len` characters and apply `attributes` to them.
    pub fn retain_with(mut self, len: usize, attributes: Option<AttributeMap>) -> Self {
        self.push(Op::Retain {
            len,
            attributes: attributes::normalize(attributes),
        });
        self
    }

    pub fn delete(mut self, len: usize) -> Self {
        self.push(Op::Delete(len));
        self
    }

    /// Append an op, keeping the delta normalized.
    pub fn push(&mut self, op: Op) -> &mut Self {
        if op.is_empty() {
            return self;
        }

        let mut index = self.ops.len();
        if let (Some(Op::Delete(last)), Op::Delete(len)) = (self.ops.last_mut(), &op) {
            *last = last.saturating_add(*len);
            return self;
        }

        // Insert-then-delete and delete-then-insert are equivalent; keep
        // inserts first so equal edits compare equal.
        if op.is_insert() && matches!(self.ops.last(), Some(Op::Delete(_))) {
            index -= 1;
            if index == 0 {
                self.ops.insert(0, op);
                return self;
            }
        }

        if index > 0 {
            if let Some(merged) = self.ops[index - 1].merged_with(&op) {
                self.ops[index - 1] = merged;
                return self;
            }
        }

        self.ops.insert(index, op);
        self
    }

    /// Drop a trailing bare retain, which has no effect.
    pub fn chop(&mut self) -> &mut Self {
        if let Some(Op::Retain {
            attributes: None, ..
        }) = self.ops.last()
        {
            self.ops.pop();
        }
        self
    }

    /// Total characters covered by all ops. For a document this is the
    /// content length.
    pub fn len(&self) -> usize {
        self.ops
            .iter()
            .fold(0usize, |acc, op| acc.saturating_add(op.len()))
    }

    /// Characters of the base document this edit reads (retains + deletes).
    pub fn base_len(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| !op.is_insert())
            .fold(0usize, |acc, op| acc.saturating_add(op.len()))
    }

    /// Characters this edit leaves behind in its explicit span (retains + inserts).
    pub fn target_len(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| op.kind() != OpKind::Delete)
            .fold(0usize, |acc, op| acc.saturating_add(op.len()))
    }

    /// True when the delta consists only of inserts.
    pub fn is_document(&self) -> bool {
        self.ops.iter().all(Op::is_insert)
    }

    /// Text content of a document; embeds render as U+FFFC.
    pub fn plain_text(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Insert {
                    value: InsertValue::Text(text),
                    ..
                } => Some(text.as_str()),
                Op::Insert {
                    value: InsertValue::Embed(_),
                    ..
                } => Some("\u{FFFC}"),
                _ => None,
            })
            .collect()
    }

    /// Compose `other` on top of `self`, producing a delta equivalent to
    /// applying `self` then `other`.
    pub fn compose(&self, other: &Delta) -> Delta {
        let mut this = OpCursor::new(&self.ops);
        let mut that = OpCursor::new(&other.ops);
        let mut out = Delta::new();

        while this.has_next() || that.has_next() {
            if that.peek_kind() == OpKind::Insert {
                out.push(that.next_op(usize::MAX));
            } else if this.peek_kind() == OpKind::Delete {
                out.push(this.next_op(usize::MAX));
            } else {
                let len = this.peek_len().min(that.peek_len());
                let this_op = this.next_op(len);
                let that_op = that.next_op(len);

                match (this_op, that_op) {
                    (
                        Op::Retain { attributes: a, .. },
                        Op::Retain { attributes: b, .. },
                    ) => {
                        out.push(Op::Retain {
                            len,
                            attributes: attributes::compose(a.as_ref(), b.as_ref(), true),
                        });
                    }
                    (Op::Insert { value, attributes: a }, Op::Retain { attributes: b, .. }) => {
                        out.push(Op::Insert {
                            value,
                            attributes: attributes::compose(a.as_ref(), b.as_ref(), false),
                        });
                    }
                    (Op::Retain { .. }, Op::Delete(len)) => {
                        out.push(Op::Delete(len));
                    }
                    // Content inserted by `self` and deleted by `other` cancels out.
                    _ => {}
                }
            }
        }

        out.chop();
        out
    }

    /// Apply `edit` to this document, checking that it stays in bounds.
    ///
    /// Fails with [`DeltaError::OutOfRange`] when the edit retains or deletes
    /// past the end of the document, and with [`DeltaError::SplitsCharacter`]
    /// when one of its boundaries falls inside a surrogate pair. `self` is
    /// never modified.
    pub fn apply(&self, edit: &Delta) -> DeltaResult<Delta> {
        if !self.is_document() {
            return Err(DeltaError::NotADocument);
        }

        let needed = edit.base_len();
        let available = self.len();
        if needed > available {
            return Err(DeltaError::OutOfRange { needed, available });
        }

        let inside = self.pair_midpoints();
        if !inside.is_empty() {
            let mut offset = 0usize;
            for op in edit.ops() {
                if !op.is_insert() {
                    offset = offset.saturating_add(op.len());
                }
                if inside.binary_search(&offset).is_ok() {
                    return Err(DeltaError::SplitsCharacter { offset });
                }
            }
        }

        Ok(self.compose(edit))
    }

    /// Offsets that fall between the two halves of a surrogate pair,
    /// ascending.
    fn pair_midpoints(&self) -> Vec<usize> {
        let mut pos = 0usize;
        let mut midpoints = Vec::new();
        for op in &self.ops {
            match op {
                Op::Insert {
                    value: InsertValue::Text(text),
                    ..
                } => {
                    for ch in text.chars() {
                        if ch.len_utf16() == 2 {
                            midpoints.push(pos + 1);
                        }
                        pos += ch.len_utf16();
                    }
                }
                op => pos = pos.saturating_add(op.len()),
            }
        }
        midpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Option<AttributeMap> {
        Some(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_push_merges_and_reorders() {
        let delta = Delta::new().insert("a").insert("b").delete(1).delete(2);
        assert_eq!(delta.ops().len(), 2);
        assert_eq!(delta.ops()[1], Op::Delete(3));

        let delta = Delta::new().retain(1).delete(1).insert("x");
        assert_eq!(
            delta.ops(),
            &[
                Op::Retain { len: 1, attributes: None },
                Op::Insert {
                    value: InsertValue::Text("x".into()),
                    attributes: None
                },
                Op::Delete(1),
            ]
        );

        let delta = Delta::new().delete(1).insert("x");
        assert!(delta.ops()[0].is_insert());
    }

    #[test]
    fn test_zero_length_ops_are_dropped() {
        let delta = Delta::new().insert("").retain(0).delete(0);
        assert!(delta.is_empty());
    }

    #[test]
    fn test_lengths() {
        let edit = Delta::new().retain(2).insert("abc").delete(4);
        assert_eq!(edit.base_len(), 6);
        assert_eq!(edit.target_len(), 5);
        assert_eq!(edit.len(), 9);
        assert!(!edit.is_document());
    }

    #[test]
    fn test_apply_insert_then_append() {
        let doc = Delta::new().apply(&Delta::new().insert("hi")).unwrap();
        assert_eq!(doc.plain_text(), "hi");

        let doc = doc.apply(&Delta::new().retain(2).insert("!")).unwrap();
        assert_eq!(doc.plain_text(), "hi!");
        assert_eq!(doc, Delta::new().insert("hi!"));
    }

    #[test]
    fn test_apply_delete_in_middle() {
        let doc = Delta::new().insert("hello world");
        let doc = doc.apply(&Delta::new().retain(5).delete(6)).unwrap();
        assert_eq!(doc.plain_text(), "hello");
    }

    #[test]
    fn test_apply_out_of_range() {
        let doc = Delta::new().insert("hi");
        let err = doc.apply(&Delta::new().retain(3)).unwrap_err();
        assert_eq!(err, DeltaError::OutOfRange { needed: 3, available: 2 });

        let err = doc.apply(&Delta::new().retain(1).delete(2)).unwrap_err();
        assert_eq!(err, DeltaError::OutOfRange { needed: 3, available: 2 });
    }

    #[test]
    fn test_apply_requires_document() {
        let not_doc = Delta::new().retain(1);
        assert_eq!(
            not_doc.apply(&Delta::new()).unwrap_err(),
            DeltaError::NotADocument
        );
    }

    #[test]
    fn test_formatting_retain() {
        let doc = Delta::new().insert("bold");
        let doc = doc
            .apply(&Delta::new().retain_with(4, attrs(json!({"bold": true}))))
            .unwrap();
        assert_eq!(doc, Delta::new().insert_with("bold", attrs(json!({"bold": true}))));

        let doc = doc
            .apply(&Delta::new().retain_with(2, attrs(json!({"bold": null}))))
            .unwrap();
        assert_eq!(
            doc,
            Delta::new()
                .insert("bo")
                .insert_with("ld", attrs(json!({"bold": true})))
        );
    }

    #[test]
    fn test_embed_counts_as_one() {
        let mut image = Map::new();
        image.insert("image".into(), json!("cat.png"));

        let doc = Delta::new().insert("a").insert_embed(image, None).insert("b");
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.plain_text(), "a\u{FFFC}b");

        let doc = doc.apply(&Delta::new().retain(1).delete(1)).unwrap();
        assert_eq!(doc, Delta::new().insert("ab"));
    }

    #[test]
    fn test_lengths_follow_utf16_units() {
        let doc = Delta::new().insert("a😀");
        assert_eq!(doc.len(), 3);

        // A browser client retains the emoji as two units.
        let doc = doc.apply(&Delta::new().retain(3).insert("b")).unwrap();
        assert_eq!(doc.plain_text(), "a😀b");

        let doc = doc.apply(&Delta::new().retain(1).delete(2)).unwrap();
        assert_eq!(doc, Delta::new().insert("ab"));
    }

    #[test]
    fn test_apply_rejects_cut_inside_surrogate_pair() {
        let doc = Delta::new().insert("a😀b");

        assert_eq!(
            doc.apply(&Delta::new().retain(2).insert("x")),
            Err(DeltaError::SplitsCharacter { offset: 2 })
        );
        assert_eq!(
            doc.apply(&Delta::new().retain(1).delete(1)),
            Err(DeltaError::SplitsCharacter { offset: 2 })
        );
        assert_eq!(
            doc.apply(&Delta::new().retain_with(2, attrs(json!({"bold": true})))),
            Err(DeltaError::SplitsCharacter { offset: 2 })
        );
        assert!(doc.apply(&Delta::new().retain(3).insert("x")).is_ok());
    }

    #[test]
    fn test_compose_edits() {
        let a = Delta::new().insert("abc");
        let b = Delta::new().retain(1).delete(1);
        assert_eq!(a.compose(&b), Delta::new().insert("ac"));

        let a = Delta::new().retain(3).insert("x");
        let b = Delta::new().retain(5).delete(1);
        assert_eq!(
            a.compose(&b),
            Delta::new().retain(3).insert("x").retain(1).delete(1)
        );
    }

    #[test]
    fn test_compose_keeps_nulls_between_retains() {
        let a = Delta::new().retain_with(1, attrs(json!({"bold": true})));
        let b = Delta::new().retain_with(1, attrs(json!({"bold": null})));
        assert_eq!(
            a.compose(&b),
            Delta::new().retain_with(1, attrs(json!({"bold": null})))
        );
    }

    #[test]
    fn test_wire_round_trip_normalizes() {
        let json = json!({"ops": [{"insert": "a"}, {"insert": "b"}, {"retain": 1}]});
        let delta: Delta = serde_json::from_value(json).unwrap();
        assert_eq!(delta.ops().len(), 2);
        assert_eq!(
            serde_json::to_value(&delta).unwrap(),
            json!({"ops": [{"insert": "ab"}, {"retain": 1}]})
        );
    }

    #[test]
    fn test_wire_rejects_bad_op() {
        let json = json!({"ops": [{"retain": 0}]});
        assert!(serde_json::from_value::<Delta>(json).is_err());
    }
}
