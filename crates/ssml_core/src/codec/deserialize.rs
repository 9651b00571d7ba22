//! Markup -> document tree.
//!
//! # Responsibility
//! - Walk a parsed markup tree depth-first and build a normalized document.
//!
//! # Invariants
//! - Unrecognized elements are transparent: their children are walked.
//! - Void element content is never walked.
//! - Leaves carry the union of marks of all enclosing mark elements.
//! - Blank or absent input yields `Document::empty()`.

use super::CodecResult;
use crate::markup::{parse_markup, MarkupElement, MarkupNode};
use crate::model::document::{Block, Document, Inline, InlineVoid, Leaf, TextRun};
use crate::model::mark::MarkSet;
use crate::rules::{Descriptor, DescriptorKind, Recognition, RuleTable, DEFAULT_RULES};
use log::{debug, warn};
use std::time::Instant;

/// Deserializes persisted markup with the default rule table.
///
/// # Errors
/// - `CodecError::Markup` when the markup cannot be parsed.
pub fn deserialize(markup: &str) -> CodecResult<Document> {
    deserialize_with(&DEFAULT_RULES, markup)
}

/// Load-time entry point: absent or unparseable markup falls back to the
/// empty document instead of failing the load.
pub fn deserialize_or_default(markup: Option<&str>) -> Document {
    let Some(markup) = markup else {
        return Document::empty();
    };
    match deserialize(markup) {
        Ok(document) => document,
        Err(err) => {
            warn!(
                "event=markup_deserialize module=codec status=fallback error_code=parse_failed error={}",
                err
            );
            Document::empty()
        }
    }
}

/// Deserializes persisted markup with a caller-provided rule table.
pub fn deserialize_with(rules: &RuleTable, markup: &str) -> CodecResult<Document> {
    if markup.trim().is_empty() {
        return Ok(Document::empty());
    }

    let started_at = Instant::now();
    let nodes = parse_markup(markup)?;
    let mut builder = TreeBuilder::new(rules);
    builder.walk(&nodes, &MarkSet::new());
    let degraded = builder.degraded;
    let document = builder.finish();

    debug!(
        "event=markup_deserialize module=codec status=ok blocks={} degraded={} duration_us={}",
        document.blocks.len(),
        degraded,
        started_at.elapsed().as_micros()
    );
    Ok(document)
}

/// Block currently receiving inline content.
struct OpenBlock {
    block: Block,
    /// `true` for a recognized block element, `false` for an implicit
    /// paragraph wrapping stray top-level inline content.
    explicit: bool,
}

struct TreeBuilder<'r> {
    rules: &'r RuleTable,
    blocks: Vec<Block>,
    open: Option<OpenBlock>,
    degraded: usize,
}

impl<'r> TreeBuilder<'r> {
    fn new(rules: &'r RuleTable) -> Self {
        Self {
            rules,
            blocks: Vec::new(),
            open: None,
            degraded: 0,
        }
    }

    fn walk(&mut self, nodes: &[MarkupNode], marks: &MarkSet) {
        for node in nodes {
            match node {
                MarkupNode::Text(text) => self.push_text(text, marks),
                MarkupNode::Element(element) => self.visit(element, marks),
            }
        }
    }

    fn visit(&mut self, element: &MarkupElement, marks: &MarkSet) {
        match self.rules.recognize(element) {
            Recognition::Matched(Descriptor::Block { kind, class_name }) => {
                if self.open.as_ref().is_some_and(|open| open.explicit) {
                    debug!(
                        "event=markup_deserialize module=codec status=flatten tag={}",
                        element.tag
                    );
                    self.walk(&element.children, marks);
                    return;
                }
                self.close_block();
                let mut block = Block::with_children(class_name, Vec::new());
                block.kind = kind;
                self.open = Some(OpenBlock {
                    block,
                    explicit: true,
                });
                self.walk(&element.children, marks);
                self.close_block();
            }
            Recognition::Matched(Descriptor::Void(void)) => self.push_void(void),
            Recognition::Matched(Descriptor::Mark(mark)) => {
                let marks = marks.with(mark);
                self.walk(&element.children, &marks);
            }
            Recognition::Malformed { kind, reason } => {
                self.degraded += 1;
                warn!(
                    "event=markup_deserialize module=codec status=degraded tag={} reason={}",
                    element.tag, reason
                );
                if kind != DescriptorKind::Void {
                    self.walk(&element.children, marks);
                }
            }
            Recognition::NotApplicable => self.walk(&element.children, marks),
        }
    }

    fn push_text(&mut self, text: &str, marks: &MarkSet) {
        if text.is_empty() {
            return;
        }
        if self.open.is_none() && text.trim().is_empty() {
            return;
        }
        let children = self.children_mut();
        let leaf = Leaf::marked(text, marks.clone());
        match children.last_mut() {
            Some(Inline::Text(run)) => run.leaves.push(leaf),
            _ => children.push(Inline::Text(TextRun::from_leaves(vec![leaf]))),
        }
    }

    fn push_void(&mut self, void: InlineVoid) {
        self.children_mut().push(Inline::Void(void));
    }

    fn children_mut(&mut self) -> &mut Vec<Inline> {
        let open = self.open.get_or_insert_with(|| OpenBlock {
            block: Block::with_children(None, Vec::new()),
            explicit: false,
        });
        &mut open.block.children
    }

    fn close_block(&mut self) {
        if let Some(open) = self.open.take() {
            self.blocks.push(open.block);
        }
    }

    fn finish(mut self) -> Document {
        self.close_block();
        Document::from_blocks(self.blocks).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::{deserialize, deserialize_or_default};
    use crate::codec::CodecError;
    use crate::model::document::{Block, Document, Inline, InlineVoid, Leaf, TextRun};
    use crate::model::mark::{EmphasisLevel, Mark, MarkSet, PitchLevel, VolumeLevel};

    fn run(leaves: Vec<Leaf>) -> Inline {
        Inline::Text(TextRun::from_leaves(leaves))
    }

    #[test]
    fn empty_input_yields_single_empty_paragraph() {
        let doc = deserialize("").unwrap();
        assert_eq!(doc, Document::empty());
        assert_eq!(deserialize("  \n ").unwrap(), Document::empty());
        assert_eq!(deserialize("<p></p>").unwrap(), Document::empty());
    }

    #[test]
    fn nested_marks_accumulate_on_one_leaf() {
        let doc = deserialize(
            r#"<span class="pitch" pitch="high"><span class="volume" volume="loud">hi</span></span>"#,
        )
        .unwrap();

        let expected_marks: MarkSet = vec![
            Mark::Pitch(PitchLevel::High),
            Mark::Volume(VolumeLevel::Loud),
        ]
        .into();
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(
            doc.blocks[0].children,
            vec![run(vec![Leaf::marked("hi", expected_marks)])]
        );
    }

    #[test]
    fn paragraph_keeps_class_and_interleaves_breaks() {
        let doc = deserialize(
            r#"<p class="intro">one<span class="break" time="3"><sup>3s</sup></span>two</p>"#,
        )
        .unwrap();

        assert_eq!(
            doc.blocks,
            vec![Block::with_children(
                Some("intro".to_string()),
                vec![
                    run(vec![Leaf::plain("one")]),
                    Inline::Void(InlineVoid::pause(3)),
                    run(vec![Leaf::plain("two")]),
                ],
            )]
        );
    }

    #[test]
    fn unrecognized_wrappers_pass_children_through() {
        let doc = deserialize(
            r#"<p><div class="shout"><strong class="emphasis" level="strong">x</strong>y</div></p>"#,
        )
        .unwrap();

        let strong: MarkSet = vec![Mark::Emphasis(EmphasisLevel::Strong)].into();
        assert_eq!(
            doc.blocks[0].children,
            vec![run(vec![Leaf::marked("x", strong), Leaf::plain("y")])]
        );
    }

    #[test]
    fn malformed_mark_degrades_to_plain_text() {
        let doc = deserialize(r#"<p><span class="pitch" pitch="shrill">x</span></p>"#).unwrap();
        assert_eq!(doc.blocks[0].children, vec![run(vec![Leaf::plain("x")])]);
    }

    #[test]
    fn malformed_break_is_skipped_with_its_label() {
        let doc = deserialize(r#"<p>a<span class="break"><sup>?s</sup></span>b</p>"#).unwrap();
        assert_eq!(doc.blocks[0].children, vec![run(vec![Leaf::plain("ab")])]);
    }

    #[test]
    fn stray_top_level_content_gets_an_implicit_paragraph() {
        let doc = deserialize("\n<p>a</p>loose <p>b</p>\n").unwrap();
        let texts: Vec<String> = doc.blocks.iter().map(Block::text).collect();
        assert_eq!(texts, vec!["a", "loose ", "b"]);
    }

    #[test]
    fn nested_paragraphs_are_flattened() {
        let doc = deserialize("<p>a<p>b</p>c</p>").unwrap();
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].text(), "abc");
    }

    #[test]
    fn parse_failure_is_an_error_and_loads_fall_back() {
        let err = deserialize("<p><span>broken</p>").unwrap_err();
        assert!(matches!(err, CodecError::Markup(_)));

        assert_eq!(
            deserialize_or_default(Some("<p><span>broken</p>")),
            Document::empty()
        );
        assert_eq!(deserialize_or_default(None), Document::empty());
    }
}
