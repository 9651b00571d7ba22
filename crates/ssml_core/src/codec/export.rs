//! Document tree -> speech markup.
//!
//! # Responsibility
//! - Flatten a document into a `<speak>` string for a text-to-speech engine.
//!
//! # Invariants
//! - Output is `<speak>` wrapping one `<p>` per block.
//! - Prosody marks share one `<prosody>` element, always outermost.
//! - Wrapping marks nest inside prosody in canonical mark order.
//! - Editing metadata (block classes, void labels) is never emitted.

use crate::model::document::{Document, Inline, InlineVoid, Leaf};
use crate::model::mark::Mark;
use log::debug;
use quick_xml::escape::{escape, partial_escape};

/// Exports a document as speech markup.
///
/// Marks are validated at construction, so every document renders.
pub fn export_ssml(document: &Document) -> String {
    let mut out = String::from("<speak>");
    for block in &document.blocks {
        out.push_str("<p>");
        for child in &block.children {
            match child {
                Inline::Void(InlineVoid::Break(pause)) => {
                    out.push_str(&format!(r#"<break time="{}s"/>"#, pause.seconds));
                }
                Inline::Text(run) => {
                    for leaf in &run.leaves {
                        write_leaf(&mut out, leaf);
                    }
                }
            }
        }
        out.push_str("</p>");
    }
    out.push_str("</speak>");

    debug!(
        "event=ssml_export module=codec status=ok blocks={} bytes={}",
        document.blocks.len(),
        out.len()
    );
    out
}

fn write_leaf(out: &mut String, leaf: &Leaf) {
    let text = partial_escape(&leaf.text);
    if leaf.marks.is_empty() {
        out.push_str(&text);
        return;
    }

    let mut prosody: Vec<String> = Vec::new();
    let mut opening = String::new();
    let mut closing: Vec<&'static str> = Vec::new();

    for mark in &leaf.marks {
        match mark {
            Mark::Emphasis(level) => {
                opening.push_str(&format!(r#"<emphasis level="{}">"#, level.as_str()));
                closing.push("</emphasis>");
            }
            Mark::Cardinal | Mark::Ordinal | Mark::Characters => {
                opening.push_str(&format!(
                    r#"<say-as interpret-as="{}">"#,
                    mark.kind().as_str()
                ));
                closing.push("</say-as>");
            }
            Mark::Substitute(alias) => {
                let alias = escape_attribute(alias.as_str());
                opening.push_str(&format!(r#"<sub alias="{alias}">"#));
                closing.push("</sub>");
            }
            Mark::Pitch(level) => prosody.push(format!(r#"pitch="{}""#, level.as_str())),
            Mark::Volume(level) => prosody.push(format!(r#"volume="{}""#, level.as_str())),
            Mark::Rate(rate) => prosody.push(format!(r#"rate="{}%""#, rate.get())),
        }
    }

    if !prosody.is_empty() {
        out.push_str(&format!("<prosody {}>", prosody.join(" ")));
    }
    out.push_str(&opening);
    out.push_str(&text);
    for tag in closing.iter().rev() {
        out.push_str(tag);
    }
    if !prosody.is_empty() {
        out.push_str("</prosody>");
    }
}

/// Escapes an attribute value so it survives attribute-value normalization:
/// tabs and line breaks become character references instead of spaces.
fn escape_attribute(value: &str) -> String {
    let escaped = escape(value);
    if !escaped.contains(['\n', '\r', '\t']) {
        return escaped.into_owned();
    }
    let mut out = String::with_capacity(escaped.len() + 8);
    for ch in escaped.chars() {
        match ch {
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::export_ssml;
    use crate::model::document::{Block, Document, Inline, InlineVoid, Leaf, TextRun};
    use crate::model::mark::{
        Alias, EmphasisLevel, Mark, MarkSet, PitchLevel, RatePercent, VolumeLevel,
    };

    fn single_leaf(leaf: Leaf) -> Document {
        Document::from_blocks(vec![Block::with_children(
            None,
            vec![Inline::Text(TextRun::from_leaves(vec![leaf]))],
        )])
    }

    #[test]
    fn exports_plain_paragraph() {
        assert_eq!(
            export_ssml(&single_leaf(Leaf::plain("hello"))),
            "<speak><p>hello</p></speak>"
        );
    }

    #[test]
    fn exports_empty_document() {
        assert_eq!(export_ssml(&Document::empty()), "<speak><p></p></speak>");
    }

    #[test]
    fn exports_break_between_text() {
        let doc = Document::from_blocks(vec![Block::with_children(
            Some("ignored".to_string()),
            vec![
                Inline::Text(TextRun::from_leaves(vec![Leaf::plain("wait")])),
                Inline::Void(InlineVoid::pause(3)),
                Inline::Text(TextRun::from_leaves(vec![Leaf::plain("go")])),
            ],
        )]);
        assert_eq!(
            export_ssml(&doc),
            r#"<speak><p>wait<break time="3s"/>go</p></speak>"#
        );
    }

    #[test]
    fn prosody_wraps_emphasis() {
        let marks: MarkSet = vec![
            Mark::Pitch(PitchLevel::High),
            Mark::Emphasis(EmphasisLevel::Strong),
        ]
        .into();
        assert_eq!(
            export_ssml(&single_leaf(Leaf::marked("x", marks))),
            r#"<speak><p><prosody pitch="high"><emphasis level="strong">x</emphasis></prosody></p></speak>"#
        );
    }

    #[test]
    fn prosody_attributes_share_one_element() {
        let marks: MarkSet = vec![
            Mark::Rate(RatePercent::new(150).unwrap()),
            Mark::Volume(VolumeLevel::XSoft),
            Mark::Pitch(PitchLevel::Low),
        ]
        .into();
        assert_eq!(
            export_ssml(&single_leaf(Leaf::marked("y", marks))),
            r#"<speak><p><prosody pitch="low" volume="x-soft" rate="150%">y</prosody></p></speak>"#
        );
    }

    #[test]
    fn wrapping_marks_nest_in_canonical_order() {
        let marks: MarkSet = vec![
            Mark::Substitute(Alias::new("World Wide Web Consortium").unwrap()),
            Mark::Characters,
            Mark::Emphasis(EmphasisLevel::Reduced),
        ]
        .into();
        assert_eq!(
            export_ssml(&single_leaf(Leaf::marked("W3C", marks))),
            concat!(
                "<speak><p>",
                r#"<emphasis level="reduced"><say-as interpret-as="characters">"#,
                r#"<sub alias="World Wide Web Consortium">W3C</sub></say-as></emphasis>"#,
                "</p></speak>"
            )
        );
    }

    #[test]
    fn alias_keeps_line_breaks_and_tabs() {
        let marks: MarkSet = vec![Mark::Substitute(Alias::new(" x\ny\r\tz ").unwrap())].into();
        assert_eq!(
            export_ssml(&single_leaf(Leaf::marked("w", marks))),
            r#"<speak><p><sub alias=" x&#10;y&#13;&#9;z ">w</sub></p></speak>"#
        );
    }

    #[test]
    fn escapes_text_and_alias() {
        let marks: MarkSet = vec![Mark::Substitute(Alias::new("\"and\"").unwrap())].into();
        let doc = Document::from_blocks(vec![Block::with_children(
            None,
            vec![Inline::Text(TextRun::from_leaves(vec![
                Leaf::plain("a < b "),
                Leaf::marked("&", marks),
            ]))],
        )]);
        assert_eq!(
            export_ssml(&doc),
            r#"<speak><p>a &lt; b <sub alias="&quot;and&quot;">&amp;</sub></p></speak>"#
        );
    }
}
