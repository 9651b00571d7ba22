//! Generic markup tree used for persisted HTML-shaped content.
//!
//! # Responsibility
//! - Parse markup fragments into an owned element/text tree.
//! - Write element/text trees back to markup with proper escaping.
//!
//! # Invariants
//! - Attribute order is preserved in both directions.
//! - Written elements are never self-closed, so output stays valid HTML.
//! - Unparseable input is reported, never partially returned.

use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type MarkupResult<T> = Result<T, MarkupError>;

/// Markup read/write errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    /// Input is not well-formed markup.
    Malformed { position: u64, message: String },
    /// Input ended while elements were still open.
    Unclosed(String),
    /// Writer backend failure.
    Write(String),
}

impl MarkupError {
    fn malformed(position: u64, err: impl Display) -> Self {
        Self::Malformed {
            position,
            message: err.to_string(),
        }
    }

    fn write(err: impl Display) -> Self {
        Self::Write(err.to_string())
    }
}

impl Display for MarkupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { position, message } => {
                write!(f, "malformed markup at byte {position}: {message}")
            }
            Self::Unclosed(tag) => write!(f, "markup ended with unclosed element `<{tag}>`"),
            Self::Write(message) => write!(f, "failed to write markup: {message}"),
        }
    }
}

impl Error for MarkupError {}

/// One node of a markup fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(String),
}

/// Markup element with ordered attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupElement {
    /// Lower-cased tag name.
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl MarkupElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute append.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_children(mut self, children: Vec<MarkupNode>) -> Self {
        self.children = children;
        self
    }

    /// Attribute lookup; names compare case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Trimmed, lower-cased `class` attribute, when non-blank.
    pub fn class_label(&self) -> Option<String> {
        self.attribute("class")
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
    }

    /// Concatenated descendant text.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[MarkupNode], out: &mut String) {
    for node in nodes {
        match node {
            MarkupNode::Text(text) => out.push_str(text),
            MarkupNode::Element(element) => collect_text(&element.children, out),
        }
    }
}

/// HTML void elements; they never have content or an end tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Parses a markup fragment. Several top-level nodes are allowed.
///
/// Input is read the way browsers save it: HTML named entities, unquoted or
/// valueless and duplicate attributes, bare void elements and end tags in
/// any letter case are accepted. For duplicate attributes the first wins.
/// Comments, declarations and processing instructions are dropped.
///
/// # Errors
/// - `Malformed` for mismatched tags, unknown entities or attribute syntax.
/// - `Unclosed` when input ends inside an element.
pub fn parse_markup(input: &str) -> MarkupResult<Vec<MarkupNode>> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(false);
    // End tags are matched below, case-insensitively.
    reader.config_mut().check_end_names = false;

    let mut roots: Vec<MarkupNode> = Vec::new();
    let mut open: Vec<MarkupElement> = Vec::new();

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|err| MarkupError::malformed(position, err))?;
        match event {
            Event::Start(start) => {
                let element = element_from_start(&reader, &start, position)?;
                if is_void_tag(&element.tag) {
                    attach(&mut open, &mut roots, MarkupNode::Element(element));
                } else {
                    open.push(element);
                }
            }
            Event::Empty(start) => {
                let element = element_from_start(&reader, &start, position)?;
                attach(&mut open, &mut roots, MarkupNode::Element(element));
            }
            Event::End(end) => {
                let name = std::str::from_utf8(end.name().as_ref())
                    .map_err(|err| MarkupError::malformed(position, err))?
                    .to_ascii_lowercase();
                let matches_open = open.last().is_some_and(|element| element.tag == name);
                if !matches_open && is_void_tag(&name) {
                    continue;
                }
                if !matches_open {
                    return Err(MarkupError::malformed(
                        position,
                        format!("closing tag `</{name}>` does not match the open element"),
                    ));
                }
                if let Some(element) = open.pop() {
                    attach(&mut open, &mut roots, MarkupNode::Element(element));
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape_with(resolve_html5_entity)
                    .map_err(|err| MarkupError::malformed(position, err))?;
                attach_text(&mut open, &mut roots, &text);
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                let text = std::str::from_utf8(&bytes)
                    .map_err(|err| MarkupError::malformed(position, err))?;
                attach_text(&mut open, &mut roots, text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(element) = open.last() {
        return Err(MarkupError::Unclosed(element.tag.clone()));
    }
    Ok(roots)
}

fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

fn element_from_start(
    reader: &Reader<&[u8]>,
    start: &BytesStart<'_>,
    position: u64,
) -> MarkupResult<MarkupElement> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|err| MarkupError::malformed(position, err))?
        .to_ascii_lowercase();
    let mut element = MarkupElement::new(name);

    let mut attributes = start.html_attributes();
    attributes.with_checks(false);
    for attr in attributes {
        let attr = attr.map_err(|err| MarkupError::malformed(position, err))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| MarkupError::malformed(position, err))?
            .to_string();
        if element.attribute(&key).is_some() {
            continue;
        }
        let value = attr
            .decode_and_unescape_value_with(reader.decoder(), resolve_html5_entity)
            .map_err(|err| MarkupError::malformed(position, err))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(open: &mut [MarkupElement], roots: &mut Vec<MarkupNode>, node: MarkupNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn attach_text(open: &mut [MarkupElement], roots: &mut Vec<MarkupNode>, text: &str) {
    if text.is_empty() {
        return;
    }
    let siblings = match open.last_mut() {
        Some(parent) => &mut parent.children,
        None => roots,
    };
    // Entity and CDATA boundaries split text events; keep one node per run.
    if let Some(MarkupNode::Text(previous)) = siblings.last_mut() {
        previous.push_str(text);
        return;
    }
    siblings.push(MarkupNode::Text(text.to_string()));
}

/// Writes nodes as markup.
///
/// Text and attribute values are escaped; childless elements are written as
/// explicit start/end pairs.
pub fn write_markup(nodes: &[MarkupNode]) -> MarkupResult<String> {
    let mut writer = Writer::new(Vec::new());
    write_nodes(&mut writer, nodes)?;
    String::from_utf8(writer.into_inner()).map_err(MarkupError::write)
}

fn write_nodes(writer: &mut Writer<Vec<u8>>, nodes: &[MarkupNode]) -> MarkupResult<()> {
    for node in nodes {
        match node {
            MarkupNode::Text(text) => {
                if text.is_empty() {
                    continue;
                }
                writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(MarkupError::write)?;
            }
            MarkupNode::Element(element) => {
                let mut start = BytesStart::new(element.tag.as_str());
                for (key, value) in &element.attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                writer
                    .write_event(Event::Start(start))
                    .map_err(MarkupError::write)?;
                write_nodes(writer, &element.children)?;
                writer
                    .write_event(Event::End(BytesEnd::new(element.tag.as_str())))
                    .map_err(MarkupError::write)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_markup, write_markup, MarkupElement, MarkupError, MarkupNode};

    #[test]
    fn parses_nested_elements_with_attributes() {
        let nodes =
            parse_markup(r#"<p class="Intro"><span class="pitch" pitch="high">hi</span> there</p>"#)
                .unwrap();

        assert_eq!(nodes.len(), 1);
        let MarkupNode::Element(paragraph) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(paragraph.tag, "p");
        assert_eq!(paragraph.attribute("CLASS"), Some("Intro"));
        assert_eq!(paragraph.class_label().as_deref(), Some("intro"));
        assert_eq!(paragraph.text_content(), "hi there");
    }

    #[test]
    fn unescapes_entities_into_one_text_node() {
        let nodes = parse_markup("<p>a &amp; b &lt;c&gt;</p>").unwrap();
        let MarkupNode::Element(paragraph) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(
            paragraph.children,
            vec![MarkupNode::Text("a & b <c>".to_string())]
        );
    }

    #[test]
    fn accepts_html_style_attributes() {
        let nodes = parse_markup("<span class=break time=3 hidden></span>").unwrap();
        let MarkupNode::Element(span) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(span.attribute("time"), Some("3"));
        assert_eq!(span.attribute("hidden"), Some(""));
    }

    #[test]
    fn rejects_mismatched_and_unclosed_tags() {
        assert!(matches!(
            parse_markup("<p><span>x</p></span>"),
            Err(MarkupError::Malformed { .. })
        ));
        assert!(parse_markup("<p>open").is_err());
    }

    #[test]
    fn accepts_markup_saved_by_browsers() {
        let nodes = parse_markup(
            r#"<P class="a" class="b">x&nbsp;y<br>z</p><span class="break" time="2"><br></span>"#,
        )
        .unwrap();
        assert_eq!(nodes.len(), 2);
        let MarkupNode::Element(paragraph) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(paragraph.tag, "p");
        assert_eq!(paragraph.attributes, vec![("class".to_string(), "a".to_string())]);
        assert_eq!(
            paragraph.children,
            vec![
                MarkupNode::Text("x\u{a0}y".to_string()),
                MarkupNode::Element(MarkupElement::new("br")),
                MarkupNode::Text("z".to_string()),
            ]
        );
    }

    #[test]
    fn ignores_end_tags_of_void_elements() {
        let nodes = parse_markup("<p>a<br></br>b</p>").unwrap();
        let MarkupNode::Element(paragraph) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(paragraph.text_content(), "ab");
        assert_eq!(paragraph.children.len(), 3);
    }

    #[test]
    fn rejects_unknown_entities() {
        assert!(matches!(
            parse_markup("<p>&bogus;</p>"),
            Err(MarkupError::Malformed { .. })
        ));
    }

    #[test]
    fn skips_comments() {
        let nodes = parse_markup("<!-- saved --><p>x</p>").unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn writes_escaped_markup_without_self_closing() {
        let element = MarkupElement::new("p")
            .with_attribute("class", "a\"b")
            .with_children(vec![MarkupNode::Text("x < y & z".to_string())]);
        let empty = MarkupElement::new("p");

        let written = write_markup(&[
            MarkupNode::Element(element),
            MarkupNode::Element(empty),
        ])
        .unwrap();

        assert_eq!(written, r#"<p class="a&quot;b">x &lt; y &amp; z</p><p></p>"#);
    }
}
