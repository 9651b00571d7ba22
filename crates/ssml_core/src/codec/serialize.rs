//! Document tree -> persisted markup.
//!
//! # Responsibility
//! - Mirror the deserializer through the rule table's `produce` side.
//!
//! # Invariants
//! - Mark wrappers nest outermost-first in canonical mark order.
//! - Output re-parses into an equal normalized document.

use super::{CodecError, CodecResult};
use crate::markup::{write_markup, MarkupNode};
use crate::model::document::{Block, Document, Inline, Leaf};
use crate::rules::{RuleTable, Target, DEFAULT_RULES};
use log::debug;

/// Serializes a document with the default rule table.
pub fn serialize(document: &Document) -> CodecResult<String> {
    serialize_with(&DEFAULT_RULES, document)
}

/// Serializes a document with a caller-provided rule table.
pub fn serialize_with(rules: &RuleTable, document: &Document) -> CodecResult<String> {
    let nodes = serialize_markup_with(rules, document)?;
    let markup = write_markup(&nodes)?;
    debug!(
        "event=markup_serialize module=codec status=ok blocks={} bytes={}",
        document.blocks.len(),
        markup.len()
    );
    Ok(markup)
}

/// Renders a document to a markup tree with the default rule table.
pub fn serialize_markup(document: &Document) -> CodecResult<Vec<MarkupNode>> {
    serialize_markup_with(&DEFAULT_RULES, document)
}

fn serialize_markup_with(rules: &RuleTable, document: &Document) -> CodecResult<Vec<MarkupNode>> {
    document
        .blocks
        .iter()
        .map(|block| render_block(rules, block))
        .collect()
}

fn render_block(rules: &RuleTable, block: &Block) -> CodecResult<MarkupNode> {
    let mut children = Vec::new();
    for child in &block.children {
        match child {
            Inline::Void(void) => {
                let rendered = rules
                    .produce(Target::Void(void), &[])
                    .ok_or(CodecError::Unrepresentable(void.kind_str()))?;
                children.push(MarkupNode::Element(rendered));
            }
            Inline::Text(run) => {
                for leaf in run.leaves.iter().filter(|leaf| !leaf.text.is_empty()) {
                    children.push(render_leaf(rules, leaf)?);
                }
            }
        }
    }

    let element = rules
        .produce(Target::Block(block), &children)
        .ok_or(CodecError::Unrepresentable(block.kind.as_str()))?;
    Ok(MarkupNode::Element(element))
}

fn render_leaf(rules: &RuleTable, leaf: &Leaf) -> CodecResult<MarkupNode> {
    let mut node = MarkupNode::Text(leaf.text.clone());
    for mark in leaf.marks.iter().rev() {
        let wrapper = rules
            .produce(Target::Mark(mark), std::slice::from_ref(&node))
            .ok_or(CodecError::Unrepresentable(mark.kind().as_str()))?;
        node = MarkupNode::Element(wrapper);
    }
    Ok(node)
}
