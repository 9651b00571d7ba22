//! Rich document tree.
//!
//! # Responsibility
//! - Define the in-memory block/inline/leaf tree edited by a session.
//! - Provide the normalization pass every conversion and edit ends with.
//!
//! # Invariants
//! - A document holds at least one block after `normalize()`.
//! - Blocks never nest; inline voids are childless and unmarked.
//! - Concatenated leaf texts of a run are exactly the run's text.
//! - After `normalize()`, adjacent leaves of a run never share a mark set,
//!   adjacent inline children are never both text runs, and empty leaves
//!   only appear as the single leaf of an otherwise empty block.

use super::mark::MarkSet;
use serde::{Deserialize, Serialize};

/// Block kind. The current model has paragraphs only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    #[default]
    Paragraph,
}

impl BlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
        }
    }
}

/// Pause inserted between text runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BreakSpec {
    /// Pause length in whole seconds.
    pub seconds: u32,
}

/// Childless inline node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InlineVoid {
    Break(BreakSpec),
}

impl InlineVoid {
    pub fn pause(seconds: u32) -> Self {
        Self::Break(BreakSpec { seconds })
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Break(_) => "break",
        }
    }
}

/// Contiguous text carrying one uniform mark set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leaf {
    pub text: String,
    #[serde(default)]
    pub marks: MarkSet,
}

impl Leaf {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: MarkSet::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: MarkSet) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    /// Length in characters, the unit used by editing offsets.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Ordered leaves forming one text node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRun {
    pub leaves: Vec<Leaf>,
}

impl TextRun {
    /// A run with a single empty, unmarked leaf.
    pub fn empty() -> Self {
        Self {
            leaves: vec![Leaf::default()],
        }
    }

    pub fn from_leaves(leaves: Vec<Leaf>) -> Self {
        Self { leaves }
    }

    pub fn text(&self) -> String {
        self.leaves.iter().map(|leaf| leaf.text.as_str()).collect()
    }

    pub fn char_len(&self) -> usize {
        self.leaves.iter().map(Leaf::char_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.iter().all(|leaf| leaf.text.is_empty())
    }

    /// Drops empty leaves and coalesces neighbours with equal mark sets.
    ///
    /// An all-empty run collapses to `TextRun::empty()`.
    pub fn normalized(&self) -> TextRun {
        let mut leaves: Vec<Leaf> = Vec::with_capacity(self.leaves.len());
        for leaf in self.leaves.iter().filter(|leaf| !leaf.text.is_empty()) {
            match leaves.last_mut() {
                Some(previous) if previous.marks == leaf.marks => {
                    previous.text.push_str(&leaf.text);
                }
                _ => leaves.push(leaf.clone()),
            }
        }
        if leaves.is_empty() {
            return TextRun::empty();
        }
        TextRun { leaves }
    }
}

/// Child of a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "object", content = "data", rename_all = "snake_case")]
pub enum Inline {
    Text(TextRun),
    Void(InlineVoid),
}

impl Inline {
    /// Editing length: characters for text, one slot for a void.
    pub fn char_len(&self) -> usize {
        match self {
            Self::Text(run) => run.char_len(),
            Self::Void(_) => 1,
        }
    }
}

/// Top-level block node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    /// Verbatim `class` attribute of the persisted element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub children: Vec<Inline>,
}

impl Block {
    /// Empty paragraph holding one empty run.
    pub fn paragraph() -> Self {
        Self {
            kind: BlockKind::Paragraph,
            class_name: None,
            children: vec![Inline::Text(TextRun::empty())],
        }
    }

    pub fn with_children(class_name: Option<String>, children: Vec<Inline>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            class_name,
            children,
        }
    }

    /// Plain text of the block; voids contribute nothing.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                Inline::Text(run) => Some(run.text()),
                Inline::Void(_) => None,
            })
            .collect()
    }

    pub fn char_len(&self) -> usize {
        self.children.iter().map(Inline::char_len).sum()
    }

    /// Merges adjacent runs, normalizes each run, and drops empty runs.
    ///
    /// A block left without children receives one empty run.
    pub fn normalized(&self) -> Block {
        let mut children: Vec<Inline> = Vec::with_capacity(self.children.len());
        for child in &self.children {
            match (children.last_mut(), child) {
                (Some(Inline::Text(previous)), Inline::Text(run)) => {
                    previous.leaves.extend(run.leaves.iter().cloned());
                }
                _ => children.push(child.clone()),
            }
        }

        let mut normalized: Vec<Inline> = children
            .into_iter()
            .filter_map(|child| match child {
                Inline::Text(run) if run.is_empty() => None,
                Inline::Text(run) => Some(Inline::Text(run.normalized())),
                void => Some(void),
            })
            .collect();
        if normalized.is_empty() {
            normalized.push(Inline::Text(TextRun::empty()));
        }

        Block {
            kind: self.kind,
            class_name: self.class_name.clone(),
            children: normalized,
        }
    }
}

/// Whole editable document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    /// One empty paragraph; the value used when no markup is supplied.
    pub fn empty() -> Self {
        Self {
            blocks: vec![Block::paragraph()],
        }
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Block texts joined by newlines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns the canonical form of this document.
    pub fn normalize(&self) -> Document {
        if self.blocks.is_empty() {
            return Document::empty();
        }
        Document {
            blocks: self.blocks.iter().map(Block::normalized).collect(),
        }
    }

    pub fn is_normalized(&self) -> bool {
        *self == self.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::{Block, Document, Inline, InlineVoid, Leaf, TextRun};
    use crate::model::mark::{EmphasisLevel, Mark, MarkSet};

    fn strong() -> MarkSet {
        MarkSet::from(vec![Mark::Emphasis(EmphasisLevel::Strong)])
    }

    #[test]
    fn empty_document_has_one_empty_paragraph() {
        let doc = Document::empty();
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].children, vec![Inline::Text(TextRun::empty())]);
        assert!(doc.is_normalized());
    }

    #[test]
    fn normalize_coalesces_leaves_and_merges_runs() {
        let block = Block::with_children(
            None,
            vec![
                Inline::Text(TextRun::from_leaves(vec![
                    Leaf::marked("ab", strong()),
                    Leaf::plain(""),
                ])),
                Inline::Text(TextRun::from_leaves(vec![
                    Leaf::marked("cd", strong()),
                    Leaf::plain("e"),
                ])),
            ],
        );

        let normalized = block.normalized();
        assert_eq!(
            normalized.children,
            vec![Inline::Text(TextRun::from_leaves(vec![
                Leaf::marked("abcd", strong()),
                Leaf::plain("e"),
            ]))]
        );
    }

    #[test]
    fn normalize_drops_empty_runs_next_to_voids() {
        let block = Block::with_children(
            None,
            vec![
                Inline::Text(TextRun::empty()),
                Inline::Void(InlineVoid::pause(2)),
                Inline::Text(TextRun::empty()),
            ],
        );

        assert_eq!(
            block.normalized().children,
            vec![Inline::Void(InlineVoid::pause(2))]
        );
    }

    #[test]
    fn normalize_never_yields_an_empty_document() {
        assert_eq!(Document::from_blocks(Vec::new()).normalize(), Document::empty());
    }

    #[test]
    fn char_len_counts_voids_as_one_slot() {
        let block = Block::with_children(
            None,
            vec![
                Inline::Text(TextRun::from_leaves(vec![Leaf::plain("héllo")])),
                Inline::Void(InlineVoid::pause(1)),
            ],
        );
        assert_eq!(block.char_len(), 6);
        assert_eq!(block.text(), "héllo");
    }
}
