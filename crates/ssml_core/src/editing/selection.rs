//! Caret and selection capability consumed by editing actions.
//!
//! The core never tracks the caret itself; the editing surface supplies a
//! `SelectionSource` and the core only asks it questions.

use crate::model::document::{Document, Inline};
use serde::{Deserialize, Serialize};

/// Position inside a document.
///
/// `offset` counts characters of text plus one slot per inline void.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub block: usize,
    pub offset: usize,
}

impl Point {
    pub fn new(block: usize, offset: usize) -> Self {
        Self { block, offset }
    }
}

/// Anchor/focus pair; either end may come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self::new(point, point)
    }

    /// `(start, end)` in document order.
    pub fn ordered(&self) -> (Point, Point) {
        if self.anchor <= self.focus {
            (self.anchor, self.focus)
        } else {
            (self.focus, self.anchor)
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Selected text, without void slots; empty when the selection is collapsed
/// or out of range.
pub fn selected_text(document: &Document, selection: &Selection) -> String {
    let (start, end) = selection.ordered();
    let mut out = String::new();
    for (index, block) in document.blocks.iter().enumerate() {
        if index < start.block || index > end.block {
            continue;
        }
        let from = if index == start.block { start.offset } else { 0 };
        let to = if index == end.block {
            end.offset
        } else {
            block.char_len()
        };

        let mut cursor = 0;
        for child in &block.children {
            let len = child.char_len();
            if let Inline::Text(run) = child {
                let text = run.text();
                let lo = from.max(cursor).min(cursor + len);
                let hi = to.min(cursor + len).max(lo);
                out.extend(text.chars().skip(lo - cursor).take(hi - lo));
            }
            cursor += len;
        }
    }
    out
}

/// Injected caret/selection capability.
pub trait SelectionSource {
    /// Current selection, if the surface has one.
    fn selection(&self) -> Option<Selection>;

    /// Where inserted content lands.
    fn insertion_point(&self) -> Point;

    /// Moves the caret, collapsing any selection.
    fn move_to(&mut self, point: Point);

    /// Whether a non-empty text range is selected.
    fn has_text_selection(&self, document: &Document) -> bool {
        self.selection()
            .is_some_and(|selection| !selected_text(document, &selection).is_empty())
    }
}

/// Selection state set explicitly by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedSelection {
    selection: Option<Selection>,
    caret: Point,
}

impl FixedSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `anchor..focus`; the caret follows the focus.
    pub fn select(&mut self, anchor: Point, focus: Point) {
        self.selection = Some(Selection::new(anchor, focus));
        self.caret = focus;
    }

    pub fn clear(&mut self) {
        self.selection = None;
    }
}

impl SelectionSource for FixedSelection {
    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn insertion_point(&self) -> Point {
        self.caret
    }

    fn move_to(&mut self, point: Point) {
        self.caret = point;
        self.selection = Some(Selection::collapsed(point));
    }
}

#[cfg(test)]
mod tests {
    use super::{selected_text, FixedSelection, Point, Selection, SelectionSource};
    use crate::codec::deserialize;

    #[test]
    fn ordered_swaps_backward_selections() {
        let selection = Selection::new(Point::new(1, 2), Point::new(0, 5));
        assert_eq!(selection.ordered(), (Point::new(0, 5), Point::new(1, 2)));
    }

    #[test]
    fn selected_text_spans_blocks_and_skips_voids() {
        let doc = deserialize(
            r#"<p>hello<span class="break" time="1"></span>world</p><p>again</p>"#,
        )
        .unwrap();

        let selection = Selection::new(Point::new(0, 3), Point::new(1, 2));
        assert_eq!(selected_text(&doc, &selection), "loworldag");

        let voids_only = Selection::new(Point::new(0, 5), Point::new(0, 6));
        assert_eq!(selected_text(&doc, &voids_only), "");
    }

    #[test]
    fn fixed_selection_reports_text_selection() {
        let doc = deserialize("<p>abc</p>").unwrap();
        let mut source = FixedSelection::new();
        assert!(!source.has_text_selection(&doc));

        source.select(Point::new(0, 0), Point::new(0, 2));
        assert!(source.has_text_selection(&doc));
        assert_eq!(source.insertion_point(), Point::new(0, 2));

        source.move_to(Point::new(0, 3));
        assert!(!source.has_text_selection(&doc));
    }
}
