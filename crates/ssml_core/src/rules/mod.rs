//! Bidirectional rule table between markup elements and document nodes.
//!
//! # Responsibility
//! - Own the only mapping between markup shape (tag + class label +
//!   attributes) and document shape (block, inline void, mark).
//! - Serve both conversion directions so they cannot drift apart.
//!
//! # Invariants
//! - Rules are consulted in a fixed order: block/void rule before mark rule.
//! - Vocabulary lookups are exact, case-insensitive matches.
//! - The block/void vocabulary and the mark vocabulary are disjoint.
//! - `produce` output for a node is always recognized back as the same node.

use crate::markup::{MarkupElement, MarkupNode};
use crate::model::document::{Block, BlockKind, BreakSpec, InlineVoid};
use crate::model::mark::{Mark, MarkKind};
use once_cell::sync::Lazy;

/// Class label marking an inline pause element.
pub const BREAK_LABEL: &str = "break";
/// Attribute holding a pause length in whole seconds.
pub const BREAK_TIME_ATTRIBUTE: &str = "time";

/// Process-wide rule table in default precedence order.
pub static DEFAULT_RULES: Lazy<RuleTable> = Lazy::new(RuleTable::standard);

/// Node or mark recognized from one markup element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Block {
        kind: BlockKind,
        class_name: Option<String>,
    },
    Void(InlineVoid),
    Mark(Mark),
}

/// Which part of the vocabulary a descriptor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Block,
    Void,
    Mark,
}

/// Result of offering one element to a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    Matched(Descriptor),
    /// Vocabulary matched but required attributes are missing or invalid.
    Malformed {
        kind: DescriptorKind,
        reason: String,
    },
    NotApplicable,
}

/// Document-side value a rule may render.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Block(&'a Block),
    Void(&'a InlineVoid),
    Mark(&'a Mark),
}

/// Node shape recognized by tag and class label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Paragraph,
    Break,
}

/// Block/void vocabulary lookup.
///
/// `p` is a paragraph whatever its class; `span`/`br` are pauses only when
/// labelled `break`.
pub fn classify_node(tag: &str, class_label: Option<&str>) -> Option<NodeKind> {
    let is_break = class_label.is_some_and(|label| label.trim().eq_ignore_ascii_case(BREAK_LABEL));
    match tag.trim().to_ascii_lowercase().as_str() {
        "p" => Some(NodeKind::Paragraph),
        "span" | "br" if is_break => Some(NodeKind::Break),
        _ => None,
    }
}

/// Markup tag used for each node kind.
pub fn render_node_tag(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Paragraph => "p",
        NodeKind::Break => "span",
    }
}

/// Mark vocabulary lookup by class label.
pub fn classify_mark(class_label: &str) -> Option<MarkKind> {
    MarkKind::parse_label(class_label)
}

/// Class label used for each mark kind; inverse of `classify_mark`.
pub fn render_mark_label(kind: MarkKind) -> &'static str {
    kind.as_str()
}

/// Markup tag used for each mark kind.
pub fn render_mark_tag(kind: MarkKind) -> &'static str {
    match kind {
        MarkKind::Emphasis => "strong",
        _ => "span",
    }
}

/// Attribute carrying a mark's payload, plus older spellings still read.
fn mark_value_attributes(kind: MarkKind) -> &'static [&'static str] {
    match kind {
        MarkKind::Emphasis => &["level", "emphasis"],
        MarkKind::Substitute => &["alias", "sub"],
        MarkKind::Cardinal => &["cardinal"],
        MarkKind::Ordinal => &["ordinal"],
        MarkKind::Characters => &["characters"],
        MarkKind::Pitch => &["pitch"],
        MarkKind::Volume => &["volume"],
        MarkKind::Rate => &["rate"],
    }
}

/// One bidirectional conversion rule.
pub trait Rule: Send + Sync {
    /// Short rule name for diagnostics.
    fn name(&self) -> &'static str;

    /// Decides whether `element` encodes something this rule owns.
    fn recognize(&self, element: &MarkupElement) -> Recognition;

    /// Renders `target` around its already rendered `children`.
    ///
    /// Void elements have no document children; their rendered label is
    /// produced here and `children` is ignored.
    fn produce(&self, target: Target<'_>, children: &[MarkupNode]) -> Option<MarkupElement>;
}

/// Paragraph blocks and pause voids.
#[derive(Debug, Default)]
pub struct NodeRule;

impl Rule for NodeRule {
    fn name(&self) -> &'static str {
        "node"
    }

    fn recognize(&self, element: &MarkupElement) -> Recognition {
        let label = element.class_label();
        match classify_node(&element.tag, label.as_deref()) {
            Some(NodeKind::Paragraph) => Recognition::Matched(Descriptor::Block {
                kind: BlockKind::Paragraph,
                class_name: element.attribute("class").map(str::to_string),
            }),
            Some(NodeKind::Break) => match parse_break(element) {
                Ok(pause) => Recognition::Matched(Descriptor::Void(InlineVoid::Break(pause))),
                Err(reason) => Recognition::Malformed {
                    kind: DescriptorKind::Void,
                    reason,
                },
            },
            None => Recognition::NotApplicable,
        }
    }

    fn produce(&self, target: Target<'_>, children: &[MarkupNode]) -> Option<MarkupElement> {
        match target {
            Target::Block(block) => {
                let mut element = MarkupElement::new(render_node_tag(NodeKind::Paragraph));
                if let Some(class_name) = &block.class_name {
                    element = element.with_attribute("class", class_name.as_str());
                }
                Some(element.with_children(children.to_vec()))
            }
            Target::Void(InlineVoid::Break(pause)) => {
                // The <sup> label is what the editing surface displays; the
                // deserializer never descends into void content.
                let label = MarkupElement::new("sup")
                    .with_children(vec![MarkupNode::Text(format!("{}s", pause.seconds))]);
                Some(
                    MarkupElement::new(render_node_tag(NodeKind::Break))
                        .with_attribute("class", BREAK_LABEL)
                        .with_attribute(BREAK_TIME_ATTRIBUTE, pause.seconds.to_string())
                        .with_children(vec![MarkupNode::Element(label)]),
                )
            }
            Target::Mark(_) => None,
        }
    }
}

fn parse_break(element: &MarkupElement) -> Result<BreakSpec, String> {
    let raw = element
        .attribute(BREAK_TIME_ATTRIBUTE)
        .ok_or_else(|| format!("break is missing `{BREAK_TIME_ATTRIBUTE}`"))?;
    let trimmed = raw.trim();
    let seconds = trimmed
        .strip_suffix('s')
        .unwrap_or(trimmed)
        .parse::<u32>()
        .map_err(|_| format!("break `{BREAK_TIME_ATTRIBUTE}` is not whole seconds: `{raw}`"))?;
    Ok(BreakSpec { seconds })
}

/// Class-labelled mark wrappers.
#[derive(Debug, Default)]
pub struct MarkRule;

impl Rule for MarkRule {
    fn name(&self) -> &'static str {
        "mark"
    }

    fn recognize(&self, element: &MarkupElement) -> Recognition {
        let Some(kind) = element.class_label().as_deref().and_then(classify_mark) else {
            return Recognition::NotApplicable;
        };

        let value = mark_value_attributes(kind)
            .iter()
            .find_map(|name| element.attribute(name));
        match Mark::parse(kind, value) {
            Ok(mark) => Recognition::Matched(Descriptor::Mark(mark)),
            Err(err) => Recognition::Malformed {
                kind: DescriptorKind::Mark,
                reason: err.to_string(),
            },
        }
    }

    fn produce(&self, target: Target<'_>, children: &[MarkupNode]) -> Option<MarkupElement> {
        let Target::Mark(mark) = target else {
            return None;
        };
        let kind = mark.kind();
        let attribute = mark_value_attributes(kind)[0];
        Some(
            MarkupElement::new(render_mark_tag(kind))
                .with_attribute("class", render_mark_label(kind))
                .with_attribute(attribute, mark.value_string())
                .with_children(children.to_vec()),
        )
    }
}

/// Ordered rule list consulted by the codec.
pub struct RuleTable {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleTable {
    /// Node rule first, then mark rule.
    pub fn standard() -> Self {
        Self::with_rules(vec![Box::new(NodeRule), Box::new(MarkRule)])
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// First rule that does not answer `NotApplicable` decides.
    pub fn recognize(&self, element: &MarkupElement) -> Recognition {
        self.rules
            .iter()
            .map(|rule| rule.recognize(element))
            .find(|recognition| *recognition != Recognition::NotApplicable)
            .unwrap_or(Recognition::NotApplicable)
    }

    /// First rule that owns `target` renders it around `children`.
    pub fn produce(&self, target: Target<'_>, children: &[MarkupNode]) -> Option<MarkupElement> {
        self.rules
            .iter()
            .find_map(|rule| rule.produce(target, children))
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard()
    }
}
