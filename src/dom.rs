//! Read-only navigation over a parsed HTML tree.
//!
//! The extractor only needs a handful of capabilities from a node: what it is,
//! its children, and whether it carries a class. [`DomNode`] captures exactly
//! that, so extraction logic never touches `scraper` types directly.

use ego_tree::NodeRef;
use html5ever::local_name;
use scraper::Node;

/// What a node is, as far as text extraction cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Element(&'a str),
    Text(&'a str),
    Other,
}

pub trait DomNode<'a>: Copy + 'a {
    fn kind(&self) -> NodeKind<'a>;

    fn children(&self) -> impl Iterator<Item = Self> + 'a;

    /// Whether the node is an element whose `class` attribute contains `class`
    /// as one of its whitespace-separated tokens.
    fn has_class(&self, class: &str) -> bool;

    /// Whether the node is a forced line break (`<br>`).
    fn is_break(&self) -> bool;

    fn is_element(&self, tag: &str) -> bool {
        matches!(self.kind(), NodeKind::Element(name) if name.eq_ignore_ascii_case(tag))
    }
}

impl<'a> DomNode<'a> for NodeRef<'a, Node> {
    fn kind(&self) -> NodeKind<'a> {
        match self.value() {
            Node::Element(element) => NodeKind::Element(element.name()),
            Node::Text(text) => NodeKind::Text(&text.text),
            _ => NodeKind::Other,
        }
    }

    fn children(&self) -> impl Iterator<Item = Self> + 'a {
        NodeRef::children(self)
    }

    fn has_class(&self, class: &str) -> bool {
        self.value()
            .as_element()
            .is_some_and(|element| element.classes().any(|c| c == class))
    }

    fn is_break(&self) -> bool {
        self.value()
            .as_element()
            .is_some_and(|element| element.name.local == local_name!("br"))
    }
}

/// Preorder (document order) walk over a subtree, root included.
#[derive(Debug, Clone)]
pub struct Descendants<N> {
    stack: Vec<N>,
}

impl<'a, N: DomNode<'a>> Iterator for Descendants<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let node = self.stack.pop()?;
        let before = self.stack.len();
        self.stack.extend(node.children());
        self.stack[before..].reverse();
        Some(node)
    }
}

pub fn descendants<'a, N: DomNode<'a>>(root: N) -> Descendants<N> {
    Descendants { stack: vec![root] }
}

/// First node in document order (root included) matching `pred`.
pub fn find_first<'a, N, F>(root: N, mut pred: F) -> Option<N>
where
    N: DomNode<'a>,
    F: FnMut(&N) -> bool,
{
    descendants(root).find(|node| pred(node))
}

/// Every node in document order (root included) matching `pred`. Matches nested
/// inside other matches are returned too.
pub fn find_all<'a, N, F>(root: N, mut pred: F) -> Vec<N>
where
    N: DomNode<'a>,
    F: FnMut(&N) -> bool,
{
    descendants(root).filter(|node| pred(node)).collect()
}

/// Concatenates every text node under `node` verbatim, emitting `\n` for each
/// break element. Other elements contribute their text but not their tags.
pub fn flatten_text<'a, N: DomNode<'a>>(node: N) -> String {
    let mut out = String::new();
    for node in descendants(node) {
        if node.is_break() {
            out.push('\n');
        } else if let NodeKind::Text(text) = node.kind() {
            out.push_str(text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn names<'a>(nodes: impl IntoIterator<Item = NodeRef<'a, Node>>) -> Vec<String> {
        nodes
            .into_iter()
            .filter_map(|n| match n.kind() {
                NodeKind::Element(name) => Some(name.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn descendants_walk_in_document_order() {
        let html = Html::parse_fragment("<div><p><b>x</b></p><i>y</i></div><span></span>");
        let root = html.tree.root();
        assert_eq!(
            names(descendants(root)),
            vec!["html", "div", "p", "b", "i", "span"]
        );
    }

    #[test]
    fn find_all_includes_nested_matches() {
        let html = Html::parse_fragment(
            r#"<div class="a"><div class="a b"><p class="ab">x</p></div></div>"#,
        );
        let found = find_all(html.tree.root(), |n| n.has_class("a"));
        assert_eq!(found.len(), 2);
        assert!(found[1].has_class("b"));
    }

    #[test]
    fn find_first_returns_none_without_match() {
        let html = Html::parse_fragment("<p>nothing here</p>");
        assert!(find_first(html.tree.root(), |n| n.is_element("pre")).is_none());
    }

    #[test]
    fn flatten_text_turns_breaks_into_newlines() {
        let html = Html::parse_fragment("<pre>1 2<br>3 <span>4</span><br/>5</pre>");
        let pre = find_first(html.tree.root(), |n| n.is_element("pre")).unwrap();
        assert_eq!(flatten_text(pre), "1 2\n3 4\n5");
    }

    #[test]
    fn break_detection_ignores_other_elements() {
        let html = Html::parse_fragment("<pre><br><b>x</b><BR/><bR></pre>");
        let pre = find_first(html.tree.root(), |n| n.is_element("pre")).unwrap();
        let flags: Vec<bool> = pre.children().map(|c| c.is_break()).collect();
        assert_eq!(flags, vec![true, false, true, true]);
    }
}
