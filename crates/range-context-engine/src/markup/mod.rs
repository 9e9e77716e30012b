//! # Markup codec
//!
//! A small XHTML-like reader and writer for single-rooted fragments such as
//! `<p>12<b class="x">34</b><br/></p>`. It exists to build trees for tests,
//! benchmarks and the command line, not to be a conforming HTML parser:
//!
//! - attributes must be double quoted;
//! - `<name/>` is an empty element;
//! - entity references in text and attribute values are decoded;
//! - comments, doctypes and processing instructions are rejected.

mod markers;

pub use markers::{extract_markers, insert_markers, render_with_markers};

use std::sync::OnceLock;

use regex::Regex;

use crate::error::MarkupError;
use crate::tree::{Document, NodeId, NodeKind};

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r#"<(/?)([A-Za-z][A-Za-z0-9:_-]*)((?:\s+[^\s=/>"]+\s*=\s*"[^"]*")*)\s*(/?)>"#)
            .expect("Invalid tag regex")
    })
}

fn attribute_regex() -> &'static Regex {
    static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    ATTRIBUTE.get_or_init(|| {
        Regex::new(r#"([^\s=/>"]+)\s*=\s*"([^"]*)""#).expect("Invalid attribute regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Open {
        name: &'a str,
        attributes: Vec<(String, String)>,
        self_closing: bool,
        at: usize,
    },
    Close {
        name: &'a str,
        at: usize,
    },
    /// Raw text, entities not yet decoded.
    Text {
        raw: &'a str,
        at: usize,
    },
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token<'_>>, MarkupError> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for caps in tag_regex().captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&mut tokens, input, last, whole.start())?;
        let name = caps.get(2).map_or("", |m| m.as_str());
        if caps.get(1).is_some_and(|m| !m.as_str().is_empty()) {
            tokens.push(Token::Close {
                name,
                at: whole.start(),
            });
        } else {
            let attributes = caps.get(3).map_or_else(Vec::new, |m| {
                attribute_regex()
                    .captures_iter(m.as_str())
                    .map(|a| {
                        (
                            a[1].to_string(),
                            html_escape::decode_html_entities(&a[2]).into_owned(),
                        )
                    })
                    .collect()
            });
            tokens.push(Token::Open {
                name,
                attributes,
                self_closing: caps.get(4).is_some_and(|m| !m.as_str().is_empty()),
                at: whole.start(),
            });
        }
        last = whole.end();
    }
    push_text(&mut tokens, input, last, input.len())?;
    Ok(tokens)
}

fn push_text<'a>(
    tokens: &mut Vec<Token<'a>>,
    input: &'a str,
    from: usize,
    to: usize,
) -> Result<(), MarkupError> {
    let raw = &input[from..to];
    if let Some(pos) = raw.find('<') {
        return Err(MarkupError::StrayAngleBracket(from + pos));
    }
    if !raw.is_empty() {
        tokens.push(Token::Text { raw, at: from });
    }
    Ok(())
}

/// Incremental tree construction shared by the plain and the marker-aware
/// readers.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    doc: Document,
    open: Vec<NodeId>,
    root: Option<NodeId>,
}

impl TreeBuilder {
    pub(crate) fn current(&self) -> Option<NodeId> {
        self.open.last().copied()
    }

    pub(crate) fn doc(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub(crate) fn open(
        &mut self,
        name: &str,
        attributes: Vec<(String, String)>,
        at: usize,
    ) -> Result<(), MarkupError> {
        let node = self.doc.create_element_with_attributes(name, attributes);
        match self.current() {
            Some(parent) => self.doc.append_child(parent, node)?,
            None if self.root.is_some() => return Err(MarkupError::OutsideRoot(at)),
            None => self.root = Some(node),
        }
        self.open.push(node);
        Ok(())
    }

    pub(crate) fn close(&mut self, name: &str, at: usize) -> Result<(), MarkupError> {
        match self.current() {
            Some(top) if self.doc.name(top) == Some(name) => {
                self.open.pop();
                Ok(())
            }
            _ => Err(MarkupError::UnexpectedClose {
                found: name.to_string(),
                at,
            }),
        }
    }

    /// Append decoded `text` to the open element. With `merge`, text
    /// directly following a text leaf extends that leaf instead.
    pub(crate) fn text(
        &mut self,
        text: &str,
        at: usize,
        merge: bool,
    ) -> Result<Option<NodeId>, MarkupError> {
        let Some(parent) = self.current() else {
            if text.trim().is_empty() {
                return Ok(None);
            }
            return Err(MarkupError::OutsideRoot(at));
        };
        if merge
            && let Some(last) = self.doc.last_child(parent)
            && let Some(existing) = self.doc.text(last)
        {
            let joined = format!("{existing}{text}");
            self.doc.set_text(last, joined)?;
            return Ok(Some(last));
        }
        let leaf = self.doc.create_text(text);
        self.doc.append_child(parent, leaf)?;
        Ok(Some(leaf))
    }

    pub(crate) fn finish(self) -> Result<(Document, NodeId), MarkupError> {
        if let Some(&unclosed) = self.open.last() {
            let name = self.doc.name(unclosed).unwrap_or_default().to_string();
            return Err(MarkupError::Unclosed(name));
        }
        let root = self.root.ok_or(MarkupError::Empty)?;
        Ok((self.doc, root))
    }
}

/// Parse a single-rooted fragment.
pub fn parse_fragment(input: &str) -> Result<(Document, NodeId), MarkupError> {
    let mut builder = TreeBuilder::default();
    for token in tokenize(input)? {
        match token {
            Token::Open {
                name,
                attributes,
                self_closing,
                at,
            } => {
                builder.open(name, attributes, at)?;
                if self_closing {
                    builder.close(name, at)?;
                }
            }
            Token::Close { name, at } => builder.close(name, at)?,
            Token::Text { raw, at } => {
                builder.text(&html_escape::decode_html_entities(raw), at, false)?;
            }
        }
    }
    builder.finish()
}

/// Serialize the subtree rooted at `node`.
pub fn to_xhtml(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, node, &mut out);
    out
}

fn write_node(doc: &Document, node: NodeId, out: &mut String) {
    match doc.kind(node) {
        NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
        NodeKind::Element { name, attributes } => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
            out.push('>');
            for &child in doc.children(node) {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::plain("<p>Some text.</p>")]
    #[case::nested("<p>12<b>34<i>5</i></b>6</p>")]
    #[case::attributes(r#"<div class="a b" data-x="1"><span id="s">x</span></div>"#)]
    #[case::empty_element("<p>a<br></br>b</p>")]
    #[case::escaped("<p>a &lt; b &amp;&amp; c &gt; d</p>")]
    fn serializing_a_parsed_fragment_reproduces_it(#[case] input: &str) {
        let (doc, root) = parse_fragment(input).unwrap();
        assert_eq!(to_xhtml(&doc, root), input);
    }

    #[test]
    fn self_closing_elements_are_empty() {
        let (doc, root) = parse_fragment("<p>a<br/>b</p>").unwrap();
        assert_eq!(doc.child_count(root), 3);
        assert_eq!(to_xhtml(&doc, root), "<p>a<br></br>b</p>");
    }

    #[test]
    fn entities_are_decoded() {
        let (doc, root) = parse_fragment(r#"<p title="&quot;q&quot;">&#233;t&eacute;</p>"#).unwrap();
        assert_eq!(doc.text_content(root), "été");
        assert_eq!(doc.attributes(root)[0].1, "\"q\"");
    }

    #[test]
    fn whitespace_is_kept_inside_and_dropped_outside() {
        let (doc, root) = parse_fragment("\n<p> <b>x</b> </p>\n").unwrap();
        assert_eq!(doc.child_count(root), 3);
        assert_eq!(to_xhtml(&doc, root), "<p> <b>x</b> </p>");
    }

    #[rstest]
    #[case::mismatched("<p><b>x</i></p>")]
    #[case::unclosed("<p><b>x</b>")]
    #[case::two_roots("<p>a</p><p>b</p>")]
    #[case::text_outside("x<p>a</p>")]
    #[case::stray_bracket("<p>a < b</p>")]
    #[case::comment("<p><!-- no --></p>")]
    #[case::empty("   ")]
    fn malformed_fragments_are_rejected(#[case] input: &str) {
        assert!(parse_fragment(input).is_err());
    }
}
