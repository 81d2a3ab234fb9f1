//! The operations a delta is made of.

use crate::attributes::{self, AttributeMap};
use crate::error::DeltaError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content carried by an insert: a run of text or a single embed
/// (image, formula, ...) that counts as one character.
///
/// Text is measured in UTF-16 code units, the unit browser editors use for
/// retain and delete lengths, so a character outside the Basic Multilingual
/// Plane (most emoji) has length 2.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsertValue {
    Text(String),
    Embed(Map<String, Value>),
}

impl InsertValue {
    /// Length in UTF-16 code units; embeds count as one.
    pub fn len(&self) -> usize {
        match self {
            InsertValue::Text(text) => text.encode_utf16().count(),
            InsertValue::Embed(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Coarse classification used while walking two deltas in lockstep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    Insert,
    Retain,
    Delete,
}

/// A single retain, insert or delete span.
///
/// On the wire an op is an object with exactly one of `insert`, `retain`
/// or `delete`, plus optional `attributes`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOp", into = "RawOp")]
pub enum Op {
    /// Insert new content at the current position.
    Insert {
        value: InsertValue,
        attributes: Option<AttributeMap>,
    },
    /// Keep the next `len` characters, optionally reformatting them.
    Retain {
        len: usize,
        attributes: Option<AttributeMap>,
    },
    /// Remove the next `len` characters.
    Delete(usize),
}

impl Op {
    /// Number of characters this op covers (inserted, kept or removed).
    pub fn len(&self) -> usize {
        match self {
            Op::Insert { value, .. } => value.len(),
            Op::Retain { len, .. } => *len,
            Op::Delete(len) => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Op::Insert { .. } => OpKind::Insert,
            Op::Retain { .. } => OpKind::Retain,
            Op::Delete(_) => OpKind::Delete,
        }
    }

    pub fn is_insert(&self) -> bool {
        self.kind() == OpKind::Insert
    }

    pub fn attributes(&self) -> Option<&AttributeMap> {
        match self {
            Op::Insert { attributes, .. } | Op::Retain { attributes, .. } => attributes.as_ref(),
            Op::Delete(_) => None,
        }
    }

    /// Merge `next` into `self` when both are the same kind of span with
    /// equal attributes. Embeds never merge.
    pub(crate) fn merged_with(&self, next: &Op) -> Option<Op> {
        match (self, next) {
            (Op::Delete(a), Op::Delete(b)) => Some(Op::Delete(a.saturating_add(*b))),
            (
                Op::Retain { len: a, attributes },
                Op::Retain {
                    len: b,
                    attributes: next_attributes,
                },
            ) if attributes == next_attributes => Some(Op::Retain {
                len: a.saturating_add(*b),
                attributes: attributes.clone(),
            }),
            (
                Op::Insert {
                    value: InsertValue::Text(a),
                    attributes,
                },
                Op::Insert {
                    value: InsertValue::Text(b),
                    attributes: next_attributes,
                },
            ) if attributes == next_attributes => Some(Op::Insert {
                value: InsertValue::Text(format!("{a}{b}")),
                attributes: attributes.clone(),
            }),
            _ => None,
        }
    }
}

/// Loose wire shape, validated into an [`Op`].
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    insert: Option<InsertValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retain: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delete: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attributes: Option<AttributeMap>,
}

impl TryFrom<RawOp> for Op {
    type Error = DeltaError;

    fn try_from(raw: RawOp) -> Result<Self, Self::Error> {
        let attributes = attributes::normalize(raw.attributes);
        match (raw.insert, raw.retain, raw.delete) {
            (Some(value), None, None) => {
                if value.is_empty() {
                    return Err(DeltaError::InvalidOp("insert must not be empty".into()));
                }
                Ok(Op::Insert { value, attributes })
            }
            (None, Some(len), None) => {
                if len == 0 {
                    return Err(DeltaError::InvalidOp("retain must be positive".into()));
                }
                Ok(Op::Retain { len, attributes })
            }
            (None, None, Some(len)) => {
                if len == 0 {
                    return Err(DeltaError::InvalidOp("delete must be positive".into()));
                }
                if attributes.is_some() {
                    return Err(DeltaError::InvalidOp(
                        "delete cannot carry attributes".into(),
                    ));
                }
                Ok(Op::Delete(len))
            }
            _ => Err(DeltaError::InvalidOp(
                "op must carry exactly one of insert, retain or delete".into(),
            )),
        }
    }
}

impl From<Op> for RawOp {
    fn from(op: Op) -> Self {
        match op {
            Op::Insert { value, attributes } => RawOp {
                insert: Some(value),
                retain: None,
                delete: None,
                attributes,
            },
            Op::Retain { len, attributes } => RawOp {
                insert: None,
                retain: Some(len),
                delete: None,
                attributes,
            },
            Op::Delete(len) => RawOp {
                insert: None,
                retain: None,
                delete: Some(len),
                attributes: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_op_wire_shapes() {
        let op: Op = serde_json::from_value(json!({"insert": "hi", "attributes": {"bold": true}}))
            .unwrap();
        assert_eq!(op.len(), 2);
        assert!(op.attributes().is_some());

        let op: Op = serde_json::from_value(json!({"retain": 3})).unwrap();
        assert_eq!(op, Op::Retain { len: 3, attributes: None });

        let op: Op = serde_json::from_value(json!({"delete": 1})).unwrap();
        assert_eq!(op, Op::Delete(1));

        let op: Op = serde_json::from_value(json!({"insert": {"image": "a.png"}})).unwrap();
        assert_eq!(op.len(), 1);
    }

    #[test]
    fn test_op_rejects_malformed() {
        for bad in [
            json!({"insert": "a", "retain": 1}),
            json!({"retain": 0}),
            json!({"delete": 0}),
            json!({"insert": ""}),
            json!({"delete": 2, "attributes": {"bold": true}}),
            json!({"retain": -1}),
            json!({"bold": true}),
            json!({}),
        ] {
            assert!(serde_json::from_value::<Op>(bad.clone()).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_op_serializes_without_empty_fields() {
        let json = serde_json::to_value(Op::Delete(4)).unwrap();
        assert_eq!(json, json!({"delete": 4}));

        let json = serde_json::to_value(Op::Insert {
            value: InsertValue::Text("é".into()),
            attributes: None,
        })
        .unwrap();
        assert_eq!(json, json!({"insert": "é"}));
    }

    #[test]
    fn test_length_counts_utf16_units() {
        assert_eq!(InsertValue::Text("héllo".into()).len(), 5);
        assert_eq!(InsertValue::Text("a😀".into()).len(), 3);
        assert_eq!(InsertValue::Embed(Map::new()).len(), 1);
    }

    #[test]
    fn test_merge_rules() {
        let bold: AttributeMap = serde_json::from_value(json!({"bold": true})).unwrap();
        let a = Op::Insert {
            value: InsertValue::Text("a".into()),
            attributes: None,
        };
        let b = Op::Insert {
            value: InsertValue::Text("b".into()),
            attributes: Some(bold),
        };
        assert!(a.merged_with(&b).is_none());
        assert_eq!(a.merged_with(&a).unwrap().len(), 2);
        assert_eq!(Op::Delete(1).merged_with(&Op::Delete(2)), Some(Op::Delete(3)));
    }
}
