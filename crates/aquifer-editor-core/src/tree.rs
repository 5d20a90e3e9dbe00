//! Text-leaf walking over tree-shaped documents.
//!
//! Cursor placement needs the reverse of the offset map: given a visible
//! offset, find the text node and the offset inside it. Any document model
//! that can report node kinds, children and text content implements
//! [`TextTree`]; [`MarkupTree`] is an in-memory one parsed from markup.

use std::borrow::Cow;

use smol_str::SmolStr;

use crate::offset_map::decode_reference;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
}

/// A tree-shaped document with text leaves.
pub trait TextTree {
    type Node: Clone + PartialEq;

    fn root(&self) -> Self::Node;

    fn kind(&self, node: &Self::Node) -> NodeKind;

    fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;

    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Text of a text node. None for elements.
    fn text(&self, node: &Self::Node) -> Option<Cow<'_, str>>;
}

/// A caret position: a node and a char offset within it.
///
/// For text nodes the offset counts chars; for elements it counts children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPosition<N> {
    pub node: N,
    pub offset: usize,
}

fn text_len<T: TextTree>(tree: &T, node: &T::Node) -> usize {
    tree.text(node).map(|t| t.chars().count()).unwrap_or(0)
}

fn children<T: TextTree>(tree: &T, node: &T::Node) -> Vec<T::Node> {
    let mut out = Vec::new();
    let mut child = tree.first_child(node);
    while let Some(c) = child {
        child = tree.next_sibling(&c);
        out.push(c);
    }
    out
}

fn subtree_text_len<T: TextTree>(tree: &T, node: &T::Node) -> usize {
    let mut total = 0;
    let mut stack = vec![node.clone()];
    while let Some(n) = stack.pop() {
        match tree.kind(&n) {
            NodeKind::Text => total += text_len(tree, &n),
            NodeKind::Element => stack.extend(children(tree, &n)),
        }
    }
    total
}

/// Find the text leaf holding a visible offset.
///
/// Leaves are visited depth-first in document order. At a boundary between
/// two leaves the earlier leaf wins (end of its text). When the document is
/// shorter than the target the position is the end of the last leaf, and a
/// document with no text leaves yields `(root, 0)`.
pub fn locate_visible_offset<T: TextTree>(tree: &T, target: usize) -> TextPosition<T::Node> {
    let mut stack = vec![tree.root()];
    let mut accumulated = 0;
    let mut last_leaf: Option<(T::Node, usize)> = None;

    while let Some(node) = stack.pop() {
        match tree.kind(&node) {
            NodeKind::Text => {
                let len = text_len(tree, &node);
                if accumulated + len >= target {
                    return TextPosition {
                        node,
                        offset: target - accumulated,
                    };
                }
                accumulated += len;
                last_leaf = Some((node, len));
            }
            NodeKind::Element => {
                stack.extend(children(tree, &node).into_iter().rev());
            }
        }
    }

    match last_leaf {
        Some((node, len)) => {
            tracing::trace!(
                target: "aquifer::cursor",
                target_offset = target,
                content_len = accumulated,
                "offset past end of content, clamping to last text node"
            );
            TextPosition { node, offset: len }
        }
        None => TextPosition {
            node: tree.root(),
            offset: 0,
        },
    }
}

/// Visible offset of a caret position. None if the node is not in the tree.
pub fn visible_offset_of<T: TextTree>(tree: &T, position: &TextPosition<T::Node>) -> Option<usize> {
    let mut stack = vec![tree.root()];
    let mut accumulated = 0;

    while let Some(node) = stack.pop() {
        let kind = tree.kind(&node);
        if node == position.node {
            return Some(match kind {
                NodeKind::Text => accumulated + position.offset.min(text_len(tree, &node)),
                NodeKind::Element => {
                    accumulated
                        + children(tree, &node)
                            .iter()
                            .take(position.offset)
                            .map(|c| subtree_text_len(tree, c))
                            .sum::<usize>()
                }
            });
        }
        match kind {
            NodeKind::Text => accumulated += text_len(tree, &node),
            NodeKind::Element => stack.extend(children(tree, &node).into_iter().rev()),
        }
    }
    None
}

/// Index of a node in a [`MarkupTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    Element { name: SmolStr },
    Text(String),
}

#[derive(Debug, Clone)]
struct TreeNode {
    data: NodeData,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

/// Arena-backed document parsed from markup.
///
/// Parsing is lenient in the same way as the offset map: text between `<`
/// and `>` is a tag, stray closing tags are dropped and unclosed elements end
/// with their parent.
#[derive(Debug, Clone)]
pub struct MarkupTree {
    nodes: Vec<TreeNode>,
}

impl MarkupTree {
    pub fn parse(markup: &str) -> Self {
        let mut tree = Self {
            nodes: vec![TreeNode {
                data: NodeData::Element {
                    name: SmolStr::new_static("#root"),
                },
                first_child: None,
                last_child: None,
                next_sibling: None,
            }],
        };
        let mut open: Vec<(NodeId, SmolStr)> = vec![(NodeId(0), SmolStr::new_static("#root"))];
        let mut text = String::new();
        let mut rest = markup;

        while let Some(c) = rest.chars().next() {
            match c {
                '<' => {
                    let parent = open.last().map(|(id, _)| *id).unwrap_or(NodeId(0));
                    tree.flush_text(parent, &mut text);
                    let Some(close) = rest.find('>') else {
                        // Unterminated tag hides the rest, as in the offset map.
                        break;
                    };
                    let tag = &rest[1..close];
                    rest = &rest[close + 1..];
                    tree.apply_tag(tag, &mut open);
                }
                '&' => match decode_reference(rest) {
                    Some((len, decoded)) => {
                        text.push_str(&decoded);
                        rest = &rest[len..];
                    }
                    None => {
                        text.push('&');
                        rest = &rest[1..];
                    }
                },
                _ => {
                    text.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        }
        let parent = open.last().map(|(id, _)| *id).unwrap_or(NodeId(0));
        tree.flush_text(parent, &mut text);
        tree
    }

    fn apply_tag(&mut self, tag: &str, open: &mut Vec<(NodeId, SmolStr)>) {
        if tag.starts_with('!') || tag.starts_with('?') {
            return;
        }
        if let Some(closing) = tag.strip_prefix('/') {
            let name = element_name(closing);
            // Pop back to the matching element; ignore closers with no opener.
            if let Some(pos) = open.iter().rposition(|(_, n)| *n == name) {
                if pos > 0 {
                    open.truncate(pos);
                }
            }
            return;
        }
        let name = element_name(tag);
        if name.is_empty() {
            return;
        }
        let parent = open.last().map(|(id, _)| *id).unwrap_or(NodeId(0));
        let id = self.append(parent, NodeData::Element { name: name.clone() });
        let self_closing = tag.ends_with('/') || VOID_ELEMENTS.contains(&name.as_str());
        if !self_closing {
            open.push((id, name));
        }
    }

    fn flush_text(&mut self, parent: NodeId, text: &mut String) {
        if !text.is_empty() {
            self.append(parent, NodeData::Text(std::mem::take(text)));
        }
    }

    fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            data,
            first_child: None,
            last_child: None,
            next_sibling: None,
        });
        match self.nodes[parent.0].last_child {
            Some(prev) => self.nodes[prev.0].next_sibling = Some(id),
            None => self.nodes[parent.0].first_child = Some(id),
        }
        self.nodes[parent.0].last_child = Some(id);
        id
    }

    /// Element name of a node, None for text.
    pub fn element_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element { name } => Some(name),
            NodeData::Text(_) => None,
        }
    }

    /// Concatenated text of every leaf.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            match &self.nodes[node.0].data {
                NodeData::Text(t) => out.push_str(t),
                NodeData::Element { .. } => stack.extend(children(self, &node).into_iter().rev()),
            }
        }
        out
    }
}

fn element_name(tag: &str) -> SmolStr {
    let name: String = tag
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    SmolStr::new(name)
}

impl TextTree for MarkupTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn kind(&self, node: &NodeId) -> NodeKind {
        match self.nodes[node.0].data {
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
        }
    }

    fn first_child(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes[node.0].first_child
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes[node.0].next_sibling
    }

    fn text(&self, node: &NodeId) -> Option<Cow<'_, str>> {
        match &self.nodes[node.0].data {
            NodeData::Text(t) => Some(Cow::Borrowed(t)),
            NodeData::Element { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset_map::visible_text;

    fn leaf_text(tree: &MarkupTree, pos: &TextPosition<NodeId>) -> String {
        tree.text(&pos.node).map(|t| t.into_owned()).unwrap_or_default()
    }

    #[test]
    fn text_content_matches_offset_map() {
        let samples = [
            "plain",
            "<p>one</p><p>two <b>three</b></p>",
            "Tom &amp; <span class=\"mention\">@Jerry</span><br>x",
            "a < b > c",
            "<ul><li>x<li>y</ul>",
        ];
        for markup in samples {
            assert_eq!(MarkupTree::parse(markup).text_content(), visible_text(markup));
        }
    }

    #[test]
    fn locate_descends_into_elements() {
        let tree = MarkupTree::parse("Hello <span>@Jane</span> is here");
        let pos = locate_visible_offset(&tree, 8);
        assert_eq!(leaf_text(&tree, &pos), "@Jane");
        assert_eq!(pos.offset, 2);
    }

    #[test]
    fn boundary_prefers_earlier_leaf() {
        let tree = MarkupTree::parse("Hello <span>@Jane</span> is here");
        let pos = locate_visible_offset(&tree, 6);
        assert_eq!(leaf_text(&tree, &pos), "Hello ");
        assert_eq!(pos.offset, 6);
    }

    #[test]
    fn past_end_clamps_to_last_leaf() {
        let tree = MarkupTree::parse("<p>ab</p><p>cd</p>");
        let pos = locate_visible_offset(&tree, 99);
        assert_eq!(leaf_text(&tree, &pos), "cd");
        assert_eq!(pos.offset, 2);
    }

    #[test]
    fn empty_document_is_root() {
        let tree = MarkupTree::parse("<br>");
        let pos = locate_visible_offset(&tree, 3);
        assert_eq!(pos, TextPosition { node: tree.root(), offset: 0 });
    }

    #[test]
    fn void_and_unclosed_elements() {
        let tree = MarkupTree::parse("a<br>b<i>c");
        let root = tree.root();
        let kids = children(&tree, &root);
        assert_eq!(kids.len(), 4);
        assert_eq!(tree.element_name(kids[1]), Some("br"));
        assert_eq!(tree.element_name(kids[3]), Some("i"));
        assert_eq!(tree.text_content(), "abc");
    }

    #[test]
    fn visible_offset_round_trip() {
        let tree = MarkupTree::parse("<div>Hi <b>there</b>, <span>@Bo</span></div>");
        let len = tree.text_content().chars().count();
        for target in 0..=len {
            let pos = locate_visible_offset(&tree, target);
            assert_eq!(visible_offset_of(&tree, &pos), Some(target));
        }
    }

    #[test]
    fn element_positions_count_children() {
        let tree = MarkupTree::parse("ab<i>cd</i>ef");
        let root = tree.root();
        assert_eq!(
            visible_offset_of(&tree, &TextPosition { node: root, offset: 2 }),
            Some(4)
        );
        assert_eq!(
            visible_offset_of(&tree, &TextPosition { node: NodeId(99), offset: 0 }),
            None
        );
    }
}
