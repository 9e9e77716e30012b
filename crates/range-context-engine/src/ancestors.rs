//! Ancestor walks bounded by a stop predicate.
//!
//! All walks terminate at the root of the tree: a root has no parent, so a
//! predicate that never matches yields the whole ancestor chain.

use crate::tree::{Document, NodeId};

/// Ancestors of `node` (excluding `node`), nearest first, stopping before the
/// first ancestor matching `stop`.
pub fn parents_until<F>(doc: &Document, node: NodeId, stop: F) -> Vec<NodeId>
where
    F: Fn(&Document, NodeId) -> bool,
{
    let mut parents = Vec::new();
    let mut parent = doc.parent(node);
    while let Some(p) = parent {
        if stop(doc, p) {
            break;
        }
        parents.push(p);
        parent = doc.parent(p);
    }
    parents
}

/// Like [`parents_until`] but also includes the matching ancestor, if the
/// walk stopped at one.
pub fn parents_until_incl<F>(doc: &Document, node: NodeId, stop: F) -> Vec<NodeId>
where
    F: Fn(&Document, NodeId) -> bool,
{
    let mut parents = parents_until(doc, node, stop);
    let topmost = parents.last().copied().unwrap_or(node);
    if let Some(parent) = doc.parent(topmost) {
        parents.push(parent);
    }
    parents
}

/// `[node, parent, grandparent, ..]` stopping before the first ancestor
/// matching `stop`. If `node` itself matches, the result is `[node]`.
pub fn path_from_incl_to_boundary<F>(doc: &Document, node: NodeId, stop: F) -> Vec<NodeId>
where
    F: Fn(&Document, NodeId) -> bool,
{
    if stop(doc, node) {
        return vec![node];
    }
    let mut path = vec![node];
    path.extend(parents_until(doc, node, stop));
    path
}

/// `[node, parent, ..]` up to and including the first ancestor matching
/// `stop`, or up to the root if none matches. If `node` itself matches, the
/// result is `[node]`.
pub fn path_from_incl_to_boundary_incl<F>(doc: &Document, node: NodeId, stop: F) -> Vec<NodeId>
where
    F: Fn(&Document, NodeId) -> bool,
{
    if stop(doc, node) {
        return vec![node];
    }
    let mut path = vec![node];
    path.extend(parents_until_incl(doc, node, stop));
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// `div > p > b > "x"`
    fn chain() -> (Document, [NodeId; 4]) {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let p = doc.create_element("p");
        let b = doc.create_element("b");
        let x = doc.create_text("x");
        doc.append_child(div, p).unwrap();
        doc.append_child(p, b).unwrap();
        doc.append_child(b, x).unwrap();
        (doc, [div, p, b, x])
    }

    #[test]
    fn parents_until_excludes_the_match() {
        let (doc, [div, p, b, x]) = chain();
        assert_eq!(parents_until(&doc, x, |d, n| d.has_name(n, "p")), vec![b]);
        assert_eq!(parents_until(&doc, x, |_, n| n == div), vec![b, p]);
    }

    #[test]
    fn parents_until_incl_includes_the_match() {
        let (doc, [_, p, b, x]) = chain();
        assert_eq!(
            parents_until_incl(&doc, x, |d, n| d.has_name(n, "p")),
            vec![b, p]
        );
    }

    #[rstest]
    #[case::exclusive(false)]
    #[case::inclusive(true)]
    fn walk_without_match_reaches_the_root(#[case] inclusive: bool) {
        let (doc, [div, p, b, x]) = chain();
        let never = |_: &Document, _: NodeId| false;
        let path = if inclusive {
            path_from_incl_to_boundary_incl(&doc, x, never)
        } else {
            path_from_incl_to_boundary(&doc, x, never)
        };
        assert_eq!(path, vec![x, b, p, div]);
    }

    #[test]
    fn path_stops_at_the_boundary() {
        let (doc, [div, p, b, x]) = chain();
        assert_eq!(path_from_incl_to_boundary(&doc, x, |_, n| n == p), vec![x, b]);
        assert_eq!(
            path_from_incl_to_boundary_incl(&doc, x, |_, n| n == p),
            vec![x, b, p]
        );
        assert_eq!(
            path_from_incl_to_boundary_incl(&doc, b, |_, n| n == div),
            vec![b, p, div]
        );
    }

    #[rstest]
    #[case::exclusive(false)]
    #[case::inclusive(true)]
    fn node_matching_itself_yields_only_the_node(#[case] inclusive: bool) {
        let (doc, [_, _, b, _]) = chain();
        let is_b = |d: &Document, n: NodeId| d.has_name(n, "b");
        let path = if inclusive {
            path_from_incl_to_boundary_incl(&doc, b, is_b)
        } else {
            path_from_incl_to_boundary(&doc, b, is_b)
        };
        assert_eq!(path, vec![b]);
    }
}
