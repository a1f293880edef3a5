//! Text edits produced by the lowering passes.
//!
//! Passes never build output text themselves; they record edits against
//! the original source in an [`EditSink`]. Edits can be cancelled, an
//! enclosing range can be rendered with its inner edits applied, and a
//! range can be superseded (inner edits cancelled, whole range replaced by
//! text that usually embeds such a rendering). [`apply_edits`] composes the
//! surviving edits into the final program.

use crate::range::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    Replace,
    /// Insert at `start`, before anything else anchored there.
    InsertBefore,
    /// Insert at `start`, attached to the text that ends there.
    InsertAfter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start: u32,
    /// Equal to `start` for inserts
    pub end: u32,
    pub text: String,
    pub placement: Placement,
}

impl TextEdit {
    /// Whether this edit belongs to the text of `range`.
    fn is_inside(&self, range: TextRange) -> bool {
        match self.placement {
            Placement::Replace => range.start <= self.start && self.end <= range.end,
            Placement::InsertBefore => range.start <= self.start && self.start < range.end,
            Placement::InsertAfter => range.start < self.start && self.start <= range.end,
        }
    }

    fn straddles(&self, range: TextRange) -> bool {
        self.placement == Placement::Replace
            && self.start < range.end
            && range.start < self.end
            && !self.is_inside(range)
            && !(self.start <= range.start && range.end <= self.end)
    }

    fn order_key(&self) -> (u32, u8) {
        let rank = match self.placement {
            Placement::InsertAfter => 0,
            Placement::InsertBefore => 1,
            Placement::Replace => 2,
        };
        (self.start, rank)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("edit at offset {at} overlaps an earlier replacement")]
    Overlap { at: u32 },
    #[error("edit range {start}..{end} is outside the source")]
    OutOfBounds { start: u32, end: u32 },
}

/// Handle to a recorded edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditId(usize);

/// Append-only log of edits; cancelled entries stay as `None` so handles
/// remain valid.
#[derive(Debug, Clone, Default)]
pub struct EditSink {
    edits: Vec<Option<TextEdit>>,
}

impl EditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: TextEdit) -> EditId {
        log::trace!(
            "edit {:?} {}..{} {:?}",
            edit.placement,
            edit.start,
            edit.end,
            edit.text
        );
        self.edits.push(Some(edit));
        EditId(self.edits.len() - 1)
    }

    pub fn replace(&mut self, range: TextRange, text: impl Into<String>) -> EditId {
        self.push(TextEdit {
            start: range.start,
            end: range.end,
            text: text.into(),
            placement: Placement::Replace,
        })
    }

    pub fn insert_before(&mut self, at: u32, text: impl Into<String>) -> EditId {
        self.push(TextEdit {
            start: at,
            end: at,
            text: text.into(),
            placement: Placement::InsertBefore,
        })
    }

    pub fn insert_after(&mut self, at: u32, text: impl Into<String>) -> EditId {
        self.push(TextEdit {
            start: at,
            end: at,
            text: text.into(),
            placement: Placement::InsertAfter,
        })
    }

    /// Deactivate an edit. Returns false if it was already inactive.
    pub fn cancel(&mut self, id: EditId) -> bool {
        self.edits
            .get_mut(id.0)
            .and_then(Option::take)
            .is_some()
    }

    pub fn is_active(&self, id: EditId) -> bool {
        matches!(self.edits.get(id.0), Some(Some(_)))
    }

    /// The source text of `range` with every active edit inside it applied.
    pub fn render(&self, source: &str, range: TextRange) -> Result<String, ApplyError> {
        let inner: Vec<&TextEdit> = self.active().filter(|e| e.is_inside(range)).collect();
        compose(source, range, inner)
    }

    /// Cancel every active edit inside `range` and replace the range with
    /// `text`.
    pub fn supersede(
        &mut self,
        range: TextRange,
        text: impl Into<String>,
    ) -> Result<EditId, ApplyError> {
        for slot in self.edits.iter_mut() {
            let inside = match slot {
                Some(edit) if edit.straddles(range) => {
                    return Err(ApplyError::Overlap { at: edit.start });
                }
                Some(edit) => edit.is_inside(range),
                None => false,
            };
            if inside {
                *slot = None;
            }
        }
        Ok(self.replace(range, text))
    }

    /// Active edits in emission order.
    pub fn active(&self) -> impl Iterator<Item = &TextEdit> {
        self.edits.iter().flatten()
    }

    pub fn into_edits(self) -> Vec<TextEdit> {
        self.edits.into_iter().flatten().collect()
    }

    pub fn len(&self) -> usize {
        self.active().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }
}

/// Apply `edits` (in emission order) to `source`.
///
/// Edits anchored at the same offset are applied insert-after first, then
/// insert-before, then replacement; ties keep emission order.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<String, ApplyError> {
    compose(
        source,
        TextRange::new(0, source.len() as u32),
        edits.iter().collect(),
    )
}

fn compose(source: &str, range: TextRange, mut edits: Vec<&TextEdit>) -> Result<String, ApplyError> {
    if range.end as usize > source.len() {
        return Err(ApplyError::OutOfBounds {
            start: range.start,
            end: range.end,
        });
    }
    // stable sort keeps emission order within a key
    edits.sort_by_key(|e| e.order_key());

    let mut out = String::with_capacity(range.len() as usize);
    let mut cursor = range.start;
    for edit in edits {
        if edit.start < cursor {
            return Err(ApplyError::Overlap { at: edit.start });
        }
        if edit.end > range.end || edit.end < edit.start {
            return Err(ApplyError::OutOfBounds {
                start: edit.start,
                end: edit.end,
            });
        }
        let gap = source
            .get(cursor as usize..edit.start as usize)
            .ok_or(ApplyError::OutOfBounds {
                start: cursor,
                end: edit.start,
            })?;
        out.push_str(gap);
        out.push_str(&edit.text);
        cursor = match edit.placement {
            Placement::Replace => edit.end,
            _ => edit.start,
        };
    }
    let tail = source
        .get(cursor as usize..range.end as usize)
        .ok_or(ApplyError::OutOfBounds {
            start: cursor,
            end: range.end,
        })?;
    out.push_str(tail);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_edits_is_identity() {
        let source = "let x = 1;";
        assert_eq!(apply_edits(source, &[]).unwrap(), source);
    }

    #[test]
    fn test_same_offset_ordering() {
        let source = "ab";
        let mut sink = EditSink::new();
        sink.replace(TextRange::new(1, 2), "B");
        sink.insert_before(1, "[");
        sink.insert_after(1, ")");
        sink.insert_after(1, "]");
        let out = apply_edits(source, &sink.into_edits()).unwrap();
        assert_eq!(out, "a)][B");
    }

    #[test]
    fn test_insert_after_replacement_end() {
        let mut sink = EditSink::new();
        sink.replace(TextRange::new(0, 3), "var");
        sink.insert_after(3, " /*x*/");
        assert_eq!(apply_edits("let a;", &sink.into_edits()).unwrap(), "var /*x*/ a;");
    }

    #[test]
    fn test_overlap_is_reported() {
        let mut sink = EditSink::new();
        sink.replace(TextRange::new(0, 4), "x");
        sink.insert_before(2, "y");
        assert_eq!(
            apply_edits("abcdef", &sink.into_edits()),
            Err(ApplyError::Overlap { at: 2 })
        );
    }

    #[test]
    fn test_cancel() {
        let mut sink = EditSink::new();
        let id = sink.replace(TextRange::new(0, 1), "z");
        assert!(sink.is_active(id));
        assert!(sink.cancel(id));
        assert!(!sink.cancel(id));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_render_and_supersede() {
        let source = "f(a, b)";
        let mut sink = EditSink::new();
        sink.replace(TextRange::new(2, 3), "x");
        sink.insert_before(0, "!");
        let rendered = sink.render(source, TextRange::new(2, 6)).unwrap();
        assert_eq!(rendered, "x, b");

        sink.supersede(TextRange::new(1, 7), format!("[{}]", rendered))
            .unwrap();
        let out = apply_edits(source, &sink.into_edits()).unwrap();
        assert_eq!(out, "!f[x, b]");
    }

    #[test]
    fn test_supersede_rejects_straddling_edit() {
        let mut sink = EditSink::new();
        sink.replace(TextRange::new(3, 8), "q");
        assert!(sink.supersede(TextRange::new(0, 5), "").is_err());
    }
}
