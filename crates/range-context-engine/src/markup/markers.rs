//! Range markers inside fragments.
//!
//! `{` and `}` mark container-relative boundaries: the point between the
//! surrounding nodes. `[` and `]` mark text-relative boundaries: a char
//! offset inside the adjacent text leaf. So `<p>12{34</p>` has its start at
//! `(p, 1)` between two leaves, while `<p>12[34</p>` has it at `("1234", 2)`.

use crate::boundary::{BoundaryPoint, Range};
use crate::error::{FixtureFormatError, Result};
use crate::markup::{Token, TreeBuilder, to_xhtml, tokenize};
use crate::tree::{Document, NodeId};

type FixtureResult<T> = std::result::Result<T, FixtureFormatError>;

#[derive(Debug, Default)]
struct MarkerState {
    start: Option<BoundaryPoint>,
    end: Option<BoundaryPoint>,
    /// The next text must start a new leaf.
    split: bool,
}

/// Parse a fragment containing one start and one end marker.
pub fn extract_markers(input: &str) -> FixtureResult<(Document, NodeId, Range)> {
    let mut builder = TreeBuilder::default();
    let mut state = MarkerState::default();
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
            Token::Text { raw, at } => read_text(&mut builder, &mut state, raw, at)?,
        }
    }
    let (doc, root) = builder.finish()?;
    let start = state.start.ok_or(FixtureFormatError::MissingMarker("start"))?;
    let end = state.end.ok_or(FixtureFormatError::MissingMarker("end"))?;
    let range = Range::new(&doc, start, end)?;
    Ok((doc, root, range))
}

fn read_text(
    builder: &mut TreeBuilder,
    state: &mut MarkerState,
    raw: &str,
    at: usize,
) -> FixtureResult<()> {
    let mut piece_start = 0;
    for (i, c) in raw.char_indices() {
        if !matches!(c, '{' | '}' | '[' | ']') {
            continue;
        }
        flush(builder, state, &raw[piece_start..i], at + piece_start)?;
        piece_start = i + c.len_utf8();

        let Some(parent) = builder.current() else {
            return Err(FixtureFormatError::MarkerOutsideRoot(c));
        };
        let point = if matches!(c, '{' | '}') {
            state.split = true;
            BoundaryPoint::new(parent, builder.doc().child_count(parent))
        } else {
            text_point(builder, state, parent)?
        };
        let is_start = matches!(c, '{' | '[');
        if !is_start && state.start.is_none() {
            return Err(FixtureFormatError::EndBeforeStart(c));
        }
        let slot = if is_start { &mut state.start } else { &mut state.end };
        if slot.is_some() {
            return Err(FixtureFormatError::DuplicateMarker(c));
        }
        *slot = Some(point);
    }
    flush(builder, state, &raw[piece_start..], at + piece_start)
}

fn flush(
    builder: &mut TreeBuilder,
    state: &mut MarkerState,
    raw: &str,
    at: usize,
) -> FixtureResult<()> {
    if raw.is_empty() {
        return Ok(());
    }
    let text = html_escape::decode_html_entities(raw);
    builder.text(&text, at, !state.split)?;
    state.split = false;
    Ok(())
}

/// The end of the preceding text leaf, or offset 0 of a fresh (possibly
/// empty) leaf that the following text will extend.
fn text_point(
    builder: &mut TreeBuilder,
    state: &mut MarkerState,
    parent: NodeId,
) -> FixtureResult<BoundaryPoint> {
    let doc = builder.doc_mut();
    let previous = doc.last_child(parent).filter(|&n| doc.is_text(n));
    let leaf = match previous {
        Some(leaf) if !state.split => leaf,
        _ => {
            let leaf = doc.create_text("");
            doc.append_child(parent, leaf)?;
            leaf
        }
    };
    state.split = false;
    Ok(BoundaryPoint::new(leaf, doc.text_len(leaf)))
}

/// Materialize both boundaries of `range` as marker characters: `[`/`]`
/// spliced into text leaves, `{`/`}` as new leaves between nodes.
///
/// The range no longer means anything afterwards.
pub fn insert_markers(doc: &mut Document, range: &Range) -> Result<()> {
    // End first, so the start offset stays valid when both share a container.
    insert_marker(doc, range.end(), ']', '}')?;
    insert_marker(doc, range.start(), '[', '{')
}

fn insert_marker(
    doc: &mut Document,
    point: BoundaryPoint,
    in_text: char,
    between: char,
) -> Result<()> {
    point.validate(doc)?;
    if let Some(text) = doc.text(point.node) {
        let at = text
            .char_indices()
            .nth(point.offset)
            .map_or(text.len(), |(byte, _)| byte);
        let mut marked = text.to_string();
        marked.insert(at, in_text);
        return doc.set_text(point.node, marked);
    }
    let marker = doc.create_text(between.to_string());
    let reference = doc.child(point.node, point.offset);
    doc.insert_before(point.node, marker, reference)
}

/// Serialize `node` with the boundaries of `range` shown as markers,
/// leaving `doc` untouched.
pub fn render_with_markers(doc: &Document, node: NodeId, range: &Range) -> Result<String> {
    let mut marked = doc.clone();
    insert_markers(&mut marked, range)?;
    Ok(to_xhtml(&marked, node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn braces_sit_between_leaves() {
        let (doc, root, range) = extract_markers("<p>12{34<b>x</b>56}78</p>").unwrap();
        assert_eq!(doc.child_count(root), 5);
        assert_eq!(range.start(), BoundaryPoint::new(root, 1));
        assert_eq!(range.end(), BoundaryPoint::new(root, 4));
    }

    #[test]
    fn brackets_sit_inside_one_leaf() {
        let (doc, root, range) = extract_markers("<p>12[34]56</p>").unwrap();
        let leaf = doc.child(root, 0).unwrap();
        assert_eq!(doc.child_count(root), 1);
        assert_eq!(doc.text(leaf), Some("123456"));
        assert_eq!(range.start(), BoundaryPoint::new(leaf, 2));
        assert_eq!(range.end(), BoundaryPoint::new(leaf, 4));
    }

    #[test]
    fn bracket_after_an_element_starts_the_next_leaf() {
        let (doc, root, range) = extract_markers("<p><b>x</b>[y]</p>").unwrap();
        let leaf = doc.child(root, 1).unwrap();
        assert_eq!(doc.text(leaf), Some("y"));
        assert_eq!(range.start(), BoundaryPoint::new(leaf, 0));
        assert_eq!(range.end(), BoundaryPoint::new(leaf, 1));
    }

    #[test]
    fn empty_bracket_range_is_collapsed() {
        let (_, _, range) = extract_markers("<p>a[]b</p>").unwrap();
        assert!(range.collapsed());
    }

    #[rstest]
    #[case::braces("<p>12{34<b>Some text.</b>56}78</p>")]
    #[case::brackets("<p><b>12[34</b>5]6</p>")]
    #[case::mixed("<div><p>a[b</p>}<i>c</i></div>")]
    #[case::nested_empty("<p><b>{</b>x}</p>")]
    fn rendering_restores_the_fixture(#[case] fixture: &str) {
        let (doc, root, range) = extract_markers(fixture).unwrap();
        assert_eq!(render_with_markers(&doc, root, &range).unwrap(), fixture);
    }

    #[test]
    fn rendering_leaves_the_document_alone() {
        let (doc, root, range) = extract_markers("<p>a[b]c</p>").unwrap();
        render_with_markers(&doc, root, &range).unwrap();
        assert_eq!(to_xhtml(&doc, root), "<p>abc</p>");
    }

    #[rstest]
    #[case::missing_start("<p>a}b</p>")]
    #[case::missing_end("<p>a{b</p>")]
    #[case::duplicate("<p>{a{b}</p>")]
    #[case::outside_root("{<p>a</p>}")]
    #[case::reversed("<p>a]b[c</p>")]
    fn bad_markers_are_rejected(#[case] fixture: &str) {
        assert!(extract_markers(fixture).is_err());
    }

    #[test]
    fn reversed_markers_name_the_problem() {
        assert_eq!(
            extract_markers("<p>}a{</p>").unwrap_err(),
            FixtureFormatError::EndBeforeStart('}')
        );
    }
}
