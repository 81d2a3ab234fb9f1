//! Cursor over a delta's ops that can hand out partial spans.

use crate::op::{InsertValue, Op, OpKind};

/// Walks a slice of ops, splitting them on demand.
///
/// Once exhausted the cursor behaves as an endless bare retain, which is how
/// a shorter delta implicitly keeps the rest of the document.
pub(crate) struct OpCursor<'a> {
    ops: &'a [Op],
    index: usize,
    offset: usize,
}

impl<'a> OpCursor<'a> {
    pub(crate) fn new(ops: &'a [Op]) -> Self {
        Self {
            ops,
            index: 0,
            offset: 0,
        }
    }

    pub(crate) fn has_next(&self) -> bool {
        self.index < self.ops.len()
    }

    pub(crate) fn peek_kind(&self) -> OpKind {
        self.ops
            .get(self.index)
            .map_or(OpKind::Retain, Op::kind)
    }

    /// Remaining length of the current op, `usize::MAX` once exhausted.
    pub(crate) fn peek_len(&self) -> usize {
        self.ops
            .get(self.index)
            .map_or(usize::MAX, |op| op.len() - self.offset)
    }

    /// Take up to `max` characters from the current op.
    pub(crate) fn next_op(&mut self, max: usize) -> Op {
        let Some(op) = self.ops.get(self.index) else {
            return Op::Retain {
                len: max,
                attributes: None,
            };
        };

        let offset = self.offset;
        let remaining = op.len() - offset;
        let take = max.min(remaining);
        if take == remaining {
            self.index += 1;
            self.offset = 0;
        } else {
            self.offset += take;
        }

        match op {
            Op::Delete(_) => Op::Delete(take),
            Op::Retain { attributes, .. } => Op::Retain {
                len: take,
                attributes: attributes.clone(),
            },
            Op::Insert {
                value: InsertValue::Text(text),
                attributes,
            } => Op::Insert {
                value: InsertValue::Text(utf16_slice(text, offset, take)),
                attributes: attributes.clone(),
            },
            Op::Insert { .. } => op.clone(),
        }
    }
}

/// The characters of `text` that start within UTF-16 units
/// `[start, start + len)`. A cut inside a surrogate pair keeps the pair in
/// the earlier piece; `Delta::apply` rejects edits that would need one.
fn utf16_slice(text: &str, start: usize, len: usize) -> String {
    let end = start.saturating_add(len);
    let mut pos = 0;
    let mut out = String::new();
    for ch in text.chars() {
        if pos >= end {
            break;
        }
        if pos >= start {
            out.push(ch);
        }
        pos += ch.len_utf16();
    }
    out
}
