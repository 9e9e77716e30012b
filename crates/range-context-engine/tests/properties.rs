//! Property tests for range formatting.
//!
//! Verifies, over random paragraphs of nested `<b>`, `<i>` and `<u>`:
//! Boundaries are picked among all the points naming each end of the span,
//! text-relative or between nodes at any level.
//!
//! 1. Normalizing boundaries twice changes nothing the second time
//! 2. An empty range leaves the tree untouched
//! 3. Rendering with markers and reading the result back is stable
//! 4. Applying a format twice equals applying it once
//! 5. Removing a freshly applied format restores the tree
//! 6. Formatting changes exactly the characters inside the range

use proptest::prelude::*;
use range_context_engine::{
    BoundaryPoint, Document, NodeId, Range, Strategy as Applied, extract_markers, format,
    normalize_range_boundaries, parse_fragment, render_with_markers, to_xhtml, unformat,
};

// ── Fixture generation ────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Fragment {
    Text(String),
    Element(&'static str, Vec<Fragment>),
}

impl Fragment {
    fn write(&self, out: &mut String) {
        match self {
            Fragment::Text(text) => out.push_str(text),
            Fragment::Element(tag, children) => {
                out.push_str(&format!("<{tag}>"));
                for child in children {
                    child.write(out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }

    fn text_len(&self) -> usize {
        match self {
            Fragment::Text(text) => text.chars().count(),
            Fragment::Element(_, children) => children.iter().map(Fragment::text_len).sum(),
        }
    }
}

fn arb_fragment(tags: &'static [&'static str]) -> impl Strategy<Value = Fragment> {
    let leaf = "[a-z]{1,3}".prop_map(Fragment::Text);
    leaf.prop_recursive(3, 24, 3, move |inner| {
        (
            proptest::sample::select(tags),
            prop::collection::vec(inner, 1..=3),
        )
            .prop_map(|(tag, children)| Fragment::Element(tag, children))
    })
}

/// A `<p>` fixture, a char span `start <= end` inside its text, and a choice
/// among the boundary points that name each end of the span.
#[derive(Debug, Clone)]
struct Case {
    markup: String,
    start: usize,
    end: usize,
    start_pick: usize,
    end_pick: usize,
}

fn arb_case(tags: &'static [&'static str]) -> impl Strategy<Value = Case> {
    prop::collection::vec(arb_fragment(tags), 1..=4).prop_flat_map(|children| {
        let mut markup = String::from("<p>");
        for child in &children {
            child.write(&mut markup);
        }
        markup.push_str("</p>");
        let len: usize = children.iter().map(Fragment::text_len).sum();
        (Just(markup), 0..=len, 0..=len, any::<usize>(), any::<usize>()).prop_map(
            |(markup, a, b, start_pick, end_pick)| Case {
                markup,
                start: a.min(b),
                end: a.max(b),
                start_pick,
                end_pick,
            },
        )
    })
}

const ALL_TAGS: &[&str] = &["b", "i", "u"];
const NO_BOLD: &[&str] = &["i", "u"];

// ── Helpers ───────────────────────────────────────────────────────────

fn leaves(doc: &Document, root: NodeId) -> Vec<NodeId> {
    doc.descendants_post_order(root)
        .into_iter()
        .filter(|&n| doc.is_text(n))
        .collect()
}

/// Every boundary point at char `offset`: the text point in each leaf
/// touching it, plus the container points between nodes that the offset
/// falls on, up through ancestors it is the first or last position of.
fn points_at(doc: &Document, root: NodeId, offset: usize) -> Vec<BoundaryPoint> {
    let mut points = Vec::new();
    let mut seen = 0;
    for leaf in leaves(doc, root) {
        let len = doc.text_len(leaf);
        if (seen..=seen + len).contains(&offset) {
            points.push(BoundaryPoint::new(leaf, offset - seen));
        }
        for (edge, after) in [(seen, false), (seen + len, true)] {
            if edge != offset {
                continue;
            }
            let mut node = leaf;
            while let (Some(parent), Some(index)) = (doc.parent(node), doc.index_of(node)) {
                let point = BoundaryPoint::new(parent, index + usize::from(after));
                if !points.contains(&point) {
                    points.push(point);
                }
                let at_edge = if after {
                    index + 1 == doc.child_count(parent)
                } else {
                    index == 0
                };
                if !at_edge {
                    break;
                }
                node = parent;
            }
        }
        seen += len;
    }
    assert!(!points.is_empty(), "offset {offset} past the end of the text");
    points
}

fn point_at(doc: &Document, root: NodeId, offset: usize, pick: usize) -> BoundaryPoint {
    let points = points_at(doc, root, offset);
    points[pick % points.len()]
}

fn setup(case: &Case, start: usize, end: usize) -> (Document, NodeId, Range) {
    let (doc, root) = parse_fragment(&case.markup).unwrap();
    let a = point_at(&doc, root, start, case.start_pick);
    let b = point_at(&doc, root, end, case.end_pick);
    // Equal offsets can still name points in either tree order.
    let range = Range::new(&doc, a, b).or_else(|_| Range::new(&doc, b, a)).unwrap();
    (doc, root, range)
}

/// Whether each character has a `<b>` ancestor.
fn bold_profile(doc: &Document, root: NodeId) -> Vec<bool> {
    let mut profile = Vec::new();
    for leaf in leaves(doc, root) {
        let mut bold = false;
        let mut node = doc.parent(leaf);
        while let Some(n) = node {
            bold = bold || doc.has_name(n, "b");
            node = doc.parent(n);
        }
        profile.extend(std::iter::repeat_n(bold, doc.text_len(leaf)));
    }
    profile
}

// ── Properties ────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn normalization_is_idempotent(case in arb_case(ALL_TAGS)) {
        let (mut doc, root, mut range) = setup(&case, case.start, case.end);
        normalize_range_boundaries(&mut doc, &mut range).unwrap();
        prop_assert!(range.start().is_between_nodes(&doc));
        prop_assert!(range.end().is_between_nodes(&doc));
        let once = (range, leaves(&doc, root));
        normalize_range_boundaries(&mut doc, &mut range).unwrap();
        prop_assert_eq!((range, leaves(&doc, root)), once);
        prop_assert_eq!(to_xhtml(&doc, root), case.markup.clone());
    }

    #[test]
    fn empty_range_is_a_no_op(case in arb_case(ALL_TAGS)) {
        let (mut doc, root, mut range) = setup(&case, case.start, case.start);
        let leaves_before = leaves(&doc, root);
        prop_assert_eq!(format(&mut doc, &mut range, "b").unwrap(), Applied::Collapsed);
        prop_assert_eq!(unformat(&mut doc, &mut range, "b").unwrap(), Applied::Collapsed);
        prop_assert_eq!(leaves(&doc, root), leaves_before);
        prop_assert_eq!(to_xhtml(&doc, root), case.markup.clone());
    }

    #[test]
    fn markers_survive_a_round_trip(case in arb_case(ALL_TAGS)) {
        let (mut doc, root, mut range) = setup(&case, case.start, case.end);
        let rendered = render_with_markers(&doc, root, &range).unwrap();
        let (reread, reread_root, reread_range) = extract_markers(&rendered).unwrap();
        prop_assert_eq!(render_with_markers(&reread, reread_root, &reread_range).unwrap(), rendered);

        format(&mut doc, &mut range, "b").unwrap();
        let rendered = render_with_markers(&doc, root, &range).unwrap();
        let (reread, reread_root, reread_range) = extract_markers(&rendered).unwrap();
        prop_assert_eq!(render_with_markers(&reread, reread_root, &reread_range).unwrap(), rendered);
    }

    #[test]
    fn formatting_twice_equals_formatting_once(case in arb_case(ALL_TAGS)) {
        let (mut doc, root, mut range) = setup(&case, case.start, case.end);
        format(&mut doc, &mut range, "b").unwrap();
        let once = render_with_markers(&doc, root, &range).unwrap();
        format(&mut doc, &mut range, "b").unwrap();
        prop_assert_eq!(render_with_markers(&doc, root, &range).unwrap(), once);
    }

    #[test]
    fn removal_undoes_application(case in arb_case(NO_BOLD)) {
        let (mut doc, root, mut range) = setup(&case, case.start, case.end);
        format(&mut doc, &mut range, "b").unwrap();
        unformat(&mut doc, &mut range, "b").unwrap();
        prop_assert_eq!(to_xhtml(&doc, root), case.markup.clone());
    }

    #[test]
    fn formatting_is_scoped_to_the_range(case in arb_case(ALL_TAGS)) {
        for remove in [false, true] {
            let (mut doc, root, mut range) = setup(&case, case.start, case.end);
            let before = bold_profile(&doc, root);
            let boundaries = (range.start(), range.end());
            if remove {
                unformat(&mut doc, &mut range, "b").unwrap();
            } else {
                format(&mut doc, &mut range, "b").unwrap();
            }
            let after = bold_profile(&doc, root);
            prop_assert_eq!(after.len(), before.len());
            for (i, (was, is)) in before.iter().zip(&after).enumerate() {
                if (case.start..case.end).contains(&i) {
                    prop_assert_eq!(*is, !remove, "char {} of {} from {:?}", i, case.markup, boundaries);
                } else {
                    prop_assert_eq!(is, was, "char {} of {}", i, case.markup);
                }
            }
        }
    }
}
