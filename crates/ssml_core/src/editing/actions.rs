//! Pure editing actions over the document tree.
//!
//! # Responsibility
//! - Toggle marks over a selection, insert voids/text, split blocks.
//!
//! # Invariants
//! - Actions never mutate their input; each returns a new normalized tree.
//! - Rejected actions return an error and no tree.
//! - Offsets count text characters plus one slot per inline void.

use super::selection::{selected_text, Point, Selection};
use crate::model::document::{Block, Document, Inline, InlineVoid, Leaf, TextRun};
use crate::model::mark::{Mark, MarkSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EditResult<T> = Result<T, EditError>;

/// Editing action errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Action needs a non-empty text selection.
    SelectionRequired,
    /// Point does not address a position in the document.
    PointOutOfRange { point: Point, block_count: usize },
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelectionRequired => write!(f, "action requires a non-empty text selection"),
            Self::PointOutOfRange { point, block_count } => write!(
                f,
                "point {}:{} is outside the document ({block_count} blocks)",
                point.block, point.offset
            ),
        }
    }
}

impl Error for EditError {}

/// Toggles `mark` across the selected text.
///
/// When every selected leaf segment already carries an equal mark, the mark
/// kind is removed from the selection; otherwise `mark` is set on every
/// segment, replacing marks of the same kind.
///
/// # Errors
/// - `SelectionRequired` when the selection covers no text.
/// - `PointOutOfRange` when either end is outside the document.
pub fn apply_mark(document: &Document, selection: &Selection, mark: Mark) -> EditResult<Document> {
    let (start, end) = selection.ordered();
    check_point(document, start)?;
    check_point(document, end)?;
    if selected_text(document, selection).is_empty() {
        return Err(EditError::SelectionRequired);
    }

    let mut already_marked = true;
    for_each_range(document, start, end, |block, from, to| {
        visit_leaf_segments(block, from, to, |leaf| {
            already_marked &= leaf.marks.contains(&mark);
        });
    });

    let kind = mark.kind();
    let restyle = |marks: &MarkSet| {
        let mut next = marks.clone();
        if already_marked {
            next.remove(kind);
        } else {
            next.insert(mark.clone());
        }
        next
    };

    let blocks = document
        .blocks
        .iter()
        .enumerate()
        .map(|(index, block)| match block_range(block, index, start, end) {
            Some((from, to)) => restyle_block(block, from, to, &restyle),
            None => block.clone(),
        })
        .collect();
    Ok(Document::from_blocks(blocks).normalize())
}

/// Inserts `void` at `point` and returns the point just past it.
pub fn insert_inline_void(
    document: &Document,
    point: Point,
    void: InlineVoid,
) -> EditResult<(Document, Point)> {
    check_point(document, point)?;
    let mut blocks = document.blocks.clone();
    let block = &mut blocks[point.block];
    let (mut left, right) = split_children(&block.children, point.offset);
    left.push(Inline::Void(void));
    left.extend(right);
    block.children = left;

    let next = Point::new(point.block, point.offset + 1);
    Ok((Document::from_blocks(blocks).normalize(), next))
}

/// Inserts `text` at `point`; it inherits the marks of the text before it
/// (or after it at the start of a run). Returns the point after the text.
pub fn insert_text(document: &Document, point: Point, text: &str) -> EditResult<(Document, Point)> {
    check_point(document, point)?;
    if text.is_empty() {
        return Ok((document.clone(), point));
    }

    let mut blocks = document.blocks.clone();
    let block = &mut blocks[point.block];
    let (mut left, right) = split_children(&block.children, point.offset);
    let marks = inherited_marks(&left, &right);
    let leaf = Leaf::marked(text, marks);
    match left.last_mut() {
        Some(Inline::Text(run)) => run.leaves.push(leaf),
        _ => left.push(Inline::Text(TextRun::from_leaves(vec![leaf]))),
    }
    left.extend(right);
    block.children = left;

    let next = Point::new(point.block, point.offset + text.chars().count());
    Ok((Document::from_blocks(blocks).normalize(), next))
}

/// Splits the block at `point` into two blocks sharing its class name.
/// Returns the start of the new block.
pub fn split_block(document: &Document, point: Point) -> EditResult<(Document, Point)> {
    check_point(document, point)?;
    let mut blocks = document.blocks.clone();
    let original = &blocks[point.block];
    let (left, right) = split_children(&original.children, point.offset);
    let head = Block::with_children(original.class_name.clone(), left);
    let tail = Block::with_children(original.class_name.clone(), right);
    blocks[point.block] = head;
    blocks.insert(point.block + 1, tail);

    let next = Point::new(point.block + 1, 0);
    Ok((Document::from_blocks(blocks).normalize(), next))
}

fn check_point(document: &Document, point: Point) -> EditResult<()> {
    let in_range = document
        .blocks
        .get(point.block)
        .is_some_and(|block| point.offset <= block.char_len());
    if in_range {
        Ok(())
    } else {
        Err(EditError::PointOutOfRange {
            point,
            block_count: document.blocks.len(),
        })
    }
}

/// Offset range of `block` covered by `start..end`, if any.
fn block_range(block: &Block, index: usize, start: Point, end: Point) -> Option<(usize, usize)> {
    if index < start.block || index > end.block {
        return None;
    }
    let from = if index == start.block { start.offset } else { 0 };
    let to = if index == end.block {
        end.offset
    } else {
        block.char_len()
    };
    Some((from, to))
}

fn for_each_range(
    document: &Document,
    start: Point,
    end: Point,
    mut f: impl FnMut(&Block, usize, usize),
) {
    for (index, block) in document.blocks.iter().enumerate() {
        if let Some((from, to)) = block_range(block, index, start, end) {
            f(block, from, to);
        }
    }
}

/// Calls `f` for every leaf overlapping `from..to` with at least one char.
fn visit_leaf_segments(block: &Block, from: usize, to: usize, mut f: impl FnMut(&Leaf)) {
    let mut cursor = 0;
    for child in &block.children {
        match child {
            Inline::Void(_) => cursor += 1,
            Inline::Text(run) => {
                for leaf in &run.leaves {
                    let len = leaf.char_len();
                    if from.max(cursor) < to.min(cursor + len) {
                        f(leaf);
                    }
                    cursor += len;
                }
            }
        }
    }
}

fn restyle_block(
    block: &Block,
    from: usize,
    to: usize,
    restyle: &impl Fn(&MarkSet) -> MarkSet,
) -> Block {
    let mut cursor = 0;
    let mut children = Vec::with_capacity(block.children.len());
    for child in &block.children {
        match child {
            Inline::Void(_) => {
                cursor += 1;
                children.push(child.clone());
            }
            Inline::Text(run) => {
                let mut leaves = Vec::with_capacity(run.leaves.len());
                for leaf in &run.leaves {
                    let len = leaf.char_len();
                    let lo = from.clamp(cursor, cursor + len);
                    let hi = to.clamp(cursor, cursor + len).max(lo);
                    if lo == hi {
                        leaves.push(leaf.clone());
                    } else {
                        let (before, rest) = split_chars(&leaf.text, lo - cursor);
                        let (middle, after) = split_chars(rest, hi - lo);
                        leaves.push(Leaf::marked(before, leaf.marks.clone()));
                        leaves.push(Leaf::marked(middle, restyle(&leaf.marks)));
                        leaves.push(Leaf::marked(after, leaf.marks.clone()));
                    }
                    cursor += len;
                }
                children.push(Inline::Text(TextRun::from_leaves(leaves)));
            }
        }
    }
    Block {
        kind: block.kind,
        class_name: block.class_name.clone(),
        children,
    }
}

/// Splits inline children at a block offset.
fn split_children(children: &[Inline], offset: usize) -> (Vec<Inline>, Vec<Inline>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut cursor = 0;
    for child in children {
        let len = child.char_len();
        if cursor + len <= offset {
            left.push(child.clone());
        } else if cursor >= offset {
            right.push(child.clone());
        } else if let Inline::Text(run) = child {
            let (head, tail) = split_run(run, offset - cursor);
            left.push(Inline::Text(head));
            right.push(Inline::Text(tail));
        }
        cursor += len;
    }
    (left, right)
}

fn split_run(run: &TextRun, at: usize) -> (TextRun, TextRun) {
    let mut head = Vec::new();
    let mut tail = Vec::new();
    let mut cursor = 0;
    for leaf in &run.leaves {
        let len = leaf.char_len();
        if cursor + len <= at {
            head.push(leaf.clone());
        } else if cursor >= at {
            tail.push(leaf.clone());
        } else {
            let (before, after) = split_chars(&leaf.text, at - cursor);
            head.push(Leaf::marked(before, leaf.marks.clone()));
            tail.push(Leaf::marked(after, leaf.marks.clone()));
        }
        cursor += len;
    }
    (TextRun::from_leaves(head), TextRun::from_leaves(tail))
}

fn inherited_marks(left: &[Inline], right: &[Inline]) -> MarkSet {
    let before = match left.last() {
        Some(Inline::Text(run)) => run
            .leaves
            .iter()
            .rev()
            .find(|leaf| !leaf.text.is_empty())
            .map(|leaf| leaf.marks.clone()),
        _ => None,
    };
    before
        .or_else(|| match right.first() {
            Some(Inline::Text(run)) => run
                .leaves
                .iter()
                .find(|leaf| !leaf.text.is_empty())
                .map(|leaf| leaf.marks.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Splits `text` after `chars` characters.
fn split_chars(text: &str, chars: usize) -> (&str, &str) {
    let index = text
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index);
    text.split_at(index)
}
