//! Cursor context detection.
//!
//! On every key-up the engine asks whether the cursor sits inside a mention
//! that is already resolved (rendered as a styled element), at the end of a
//! mention still being typed, or neither.

use aquifer_common::AquiferError;

use crate::actions::Key;
use crate::offset_map::MarkupMap;
use crate::syntax::MentionSyntax;
use crate::types::{DetectedMention, Mention};

/// Classifies the cursor position against mention syntax.
#[derive(Debug, Clone, Default)]
pub struct MentionDetector {
    syntax: MentionSyntax,
}

impl MentionDetector {
    pub fn new(syntax: MentionSyntax) -> Self {
        Self { syntax }
    }

    pub fn from_config(config: aquifer_common::SyntaxConfig) -> Result<Self, AquiferError> {
        Ok(Self::new(MentionSyntax::new(config)?))
    }

    pub fn syntax(&self) -> &MentionSyntax {
        &self.syntax
    }

    /// Classify the cursor (a visible offset) within the markup.
    ///
    /// `key` is the key that moved the cursor, if any. Horizontal arrows
    /// moving into or out of a completed mention are navigation, not
    /// editing, and yield `None`.
    pub fn detect(
        &self,
        markup: &str,
        cursor: usize,
        key: Option<&Key>,
    ) -> Option<DetectedMention> {
        let map = MarkupMap::new(markup);
        self.detect_in(&map, markup, cursor, key)
    }

    /// [`detect`](Self::detect) with a prebuilt map.
    pub fn detect_in(
        &self,
        map: &MarkupMap,
        markup: &str,
        cursor: usize,
        key: Option<&Key>,
    ) -> Option<DetectedMention> {
        let cursor = cursor.min(map.visible_len());
        let completed = self.completed_mentions(map, markup);

        if let Some(mention) = completed.iter().find(|m| m.touches(cursor)) {
            if key.is_some_and(Key::is_horizontal_arrow) {
                tracing::trace!(
                    target: "aquifer::detect",
                    cursor,
                    mention = %mention.text,
                    "arrow navigation across completed mention"
                );
                return None;
            }
            return Some(DetectedMention::Completed(mention.clone()));
        }

        self.working_mention(map, &completed, cursor).map(DetectedMention::Working)
    }

    /// Every resolved mention element in the markup, in document order.
    ///
    /// Positions come from where each element actually sits, so two mentions
    /// with the same name get distinct ranges.
    pub fn completed_mentions(&self, map: &MarkupMap, markup: &str) -> Vec<Mention> {
        self.syntax
            .elements(markup)
            .map(|element| {
                let range = map.byte_range_to_visible(element.inner_range);
                let text: String = map.chars()[range.clone()].iter().map(|c| c.ch).collect();
                Mention::new(range.start, range.end, text)
            })
            .collect()
    }

    /// A mention being typed that ends at the cursor.
    ///
    /// A line break (`<br>` or a block element edge) counts as whitespace
    /// before the sigil and ends the run anywhere else.
    fn working_mention(
        &self,
        map: &MarkupMap,
        completed: &[Mention],
        cursor: usize,
    ) -> Option<Mention> {
        let chars = map.chars();
        let inside_completed = |i: usize| completed.iter().any(|m| m.range().contains(&i));
        let sigil = self.syntax.sigil();

        let mut i = cursor;
        let start = loop {
            if i == 0 {
                return None;
            }
            let idx = i - 1;
            if inside_completed(idx) {
                return None;
            }
            let c = chars[idx].ch;
            if c == sigil {
                let at_boundary =
                    idx == 0 || chars[idx].after_break || chars[idx - 1].ch.is_whitespace();
                if !at_boundary {
                    return None;
                }
                break idx;
            }
            if chars[idx].after_break {
                tracing::trace!(
                    target: "aquifer::detect",
                    cursor,
                    idx,
                    "line break inside mention"
                );
                return None;
            }
            if !self.syntax.is_mention_char(c) {
                return None;
            }
            i -= 1;
        };

        let tail: Vec<char> = chars[cursor.saturating_sub(2)..cursor]
            .iter()
            .map(|c| if c.ch == '\u{a0}' { ' ' } else { c.ch })
            .collect();
        if is_terminated(&tail) {
            tracing::trace!(target: "aquifer::detect", cursor, ?tail, "mention terminated");
            return None;
        }

        let text: String = chars[start..cursor].iter().map(|c| c.ch).collect();
        Some(Mention::new(start, cursor, text))
    }
}

/// Whether the chars just before the cursor end a mention.
///
/// A trailing space ends it too: the user typed past the name. Typing a
/// letter after it resumes the mention (`@Jane D`).
fn is_terminated(tail: &[char]) -> bool {
    if tail.iter().any(|c| matches!(c, '\n' | '\r' | '\t')) {
        return true;
    }
    if tail.last() == Some(&' ') {
        return true;
    }
    matches!(tail, [' ', ' '] | [' ', '.'] | ['.', ' '])
}
