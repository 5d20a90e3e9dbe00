//! In-memory editable surface.

use crate::offset_map::MarkupMap;
use crate::platform::{EditableSurface, PlatformError};
use crate::tree::{MarkupTree, NodeId, TextPosition, locate_visible_offset, visible_offset_of};

/// An [`EditableSurface`] holding markup and a caret in memory.
///
/// The caret is kept as a tree position, the way a browser selection points
/// at a text node, and converted to visible offsets on demand. Editing helpers
/// mimic what a contenteditable element does with typed input.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    markup: String,
    tree: MarkupTree,
    caret: Option<TextPosition<NodeId>>,
    focused: bool,
}

impl MemorySurface {
    pub fn new(markup: impl Into<String>) -> Self {
        let markup = markup.into();
        Self {
            tree: MarkupTree::parse(&markup),
            markup,
            caret: None,
            focused: false,
        }
    }

    pub fn tree(&self) -> &MarkupTree {
        &self.tree
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Visible text as the user sees it.
    pub fn text(&self) -> String {
        self.tree.text_content()
    }

    /// Insert text at the caret (or at the end without one) and move the caret after it.
    ///
    /// Text lands after the preceding char and after any elements closing
    /// right behind it, so typing past a mention does not extend it.
    pub fn type_text(&mut self, text: &str) {
        let map = MarkupMap::new(&self.markup);
        let at = self.caret_or_end(&map);
        let mut byte = match at.checked_sub(1) {
            Some(prev) => map.chars()[prev].byte_range.end,
            None => 0,
        };
        while let Some(rest) = self.markup[byte..].strip_prefix("</") {
            match rest.find('>') {
                Some(close) => byte += close + 3,
                None => break,
            }
        }

        let mut markup = String::with_capacity(self.markup.len() + text.len());
        markup.push_str(&self.markup[..byte]);
        markup.push_str(&htmlize::escape_text(text));
        markup.push_str(&self.markup[byte..]);

        self.replace(markup, at + text.chars().count());
    }

    /// Delete the char before the caret. No-op at the start.
    pub fn backspace(&mut self) {
        let map = MarkupMap::new(&self.markup);
        let at = self.caret_or_end(&map);
        let Some(prev) = at.checked_sub(1) else {
            return;
        };
        let range = map.chars()[prev].byte_range.clone();

        let mut markup = self.markup.clone();
        markup.replace_range(range, "");
        self.replace(markup, prev);
    }

    fn caret_or_end(&self, map: &MarkupMap) -> usize {
        self.cursor_offset()
            .unwrap_or(map.visible_len())
            .min(map.visible_len())
    }

    fn replace(&mut self, markup: String, caret: usize) {
        self.tree = MarkupTree::parse(&markup);
        self.markup = markup;
        self.caret = Some(locate_visible_offset(&self.tree, caret));
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl EditableSurface for MemorySurface {
    fn markup(&self) -> String {
        self.markup.clone()
    }

    fn set_markup(&mut self, markup: &str) {
        self.markup = markup.to_string();
        self.tree = MarkupTree::parse(markup);
        self.caret = None;
    }

    fn cursor_offset(&self) -> Option<usize> {
        self.caret
            .as_ref()
            .and_then(|caret| visible_offset_of(&self.tree, caret))
    }

    fn set_cursor_offset(&mut self, offset: usize) -> Result<(), PlatformError> {
        let position = locate_visible_offset(&self.tree, offset);
        tracing::trace!(target: "aquifer::cursor", offset, ?position, "caret placed");
        self.caret = Some(position);
        Ok(())
    }

    fn focus(&mut self) -> Result<(), PlatformError> {
        self.focused = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_appends_and_escapes() {
        let mut surface = MemorySurface::default();
        surface.type_text("Tom & ");
        surface.type_text("Jerry");
        assert_eq!(surface.markup(), "Tom &amp; Jerry");
        assert_eq!(surface.text(), "Tom & Jerry");
        assert_eq!(surface.cursor_offset(), Some(11));
    }

    #[test]
    fn typing_at_caret() {
        let mut surface = MemorySurface::new("<b>ac</b>");
        surface.set_cursor_offset(1).unwrap();
        surface.type_text("b");
        assert_eq!(surface.markup(), "<b>abc</b>");
        assert_eq!(surface.cursor_offset(), Some(2));
    }

    #[test]
    fn typing_after_element_stays_outside() {
        let mut surface = MemorySurface::new("<span>@Bo</span>");
        surface.type_text("!");
        assert_eq!(surface.markup(), "<span>@Bo</span>!");
        assert_eq!(surface.cursor_offset(), Some(4));
    }

    #[test]
    fn backspace_removes_whole_entity() {
        let mut surface = MemorySurface::new("a&amp;b");
        surface.set_cursor_offset(2).unwrap();
        surface.backspace();
        assert_eq!(surface.markup(), "ab");
        assert_eq!(surface.cursor_offset(), Some(1));

        surface.set_cursor_offset(0).unwrap();
        surface.backspace();
        assert_eq!(surface.markup(), "ab");
    }

    #[test]
    fn set_markup_drops_caret() {
        let mut surface = MemorySurface::new("abc");
        surface.set_cursor_offset(2).unwrap();
        surface.set_markup("xyz");
        assert_eq!(surface.cursor_offset(), None);
    }

    #[test]
    fn caret_clamps_past_end() {
        let mut surface = MemorySurface::new("<p>one</p><p>two</p>");
        surface.set_cursor_offset(99).unwrap();
        assert_eq!(surface.cursor_offset(), Some(6));
    }

    #[test]
    fn focus_is_tracked() {
        let mut surface = MemorySurface::default();
        assert!(!surface.is_focused());
        surface.focus().unwrap();
        assert!(surface.is_focused());
    }
}
