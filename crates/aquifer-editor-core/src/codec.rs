//! Conversion between persisted text and display markup.
//!
//! Persisted text stores each mention as a token carrying the durable
//! candidate id and a cached name: `{@42|Jane Doe}`. Display markup shows it
//! as a styled element with the current name and no id. Loading resolves ids,
//! saving resolves names.

use aquifer_common::{AquiferError, UnresolvedMentionError};

use crate::candidates::{find_by_id, find_by_name};
use crate::offset_map::MarkupMap;
use crate::syntax::MentionSyntax;
use crate::types::{Candidate, Mention};

/// Render persisted text for the editable surface using the default syntax.
pub fn persisted_text_to_display_markup(text: &str, candidates: &[Candidate]) -> String {
    to_display_markup(MentionSyntax::default_ref(), text, candidates)
}

/// Convert editor markup back into persisted text using the default syntax.
pub fn display_markup_to_persisted_text(
    markup: &str,
    candidates: &[Candidate],
) -> Result<String, AquiferError> {
    to_persisted_text(MentionSyntax::default_ref(), markup, candidates)
}

/// Replace every token with a display element.
///
/// The candidate's current name wins; the cached name is used only when the
/// id no longer resolves. Everything outside tokens is copied as is.
pub fn to_display_markup(syntax: &MentionSyntax, text: &str, candidates: &[Candidate]) -> String {
    if !syntax.has_tokens(text) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + 32);
    let mut last = 0;
    for token in syntax.tokens(text) {
        out.push_str(&text[last..token.range.start]);
        let resolved = token.id.and_then(|id| find_by_id(candidates, id));
        let name = match resolved {
            Some(candidate) => candidate.display_name.as_str(),
            None => {
                tracing::debug!(
                    target: "aquifer::codec",
                    id = ?token.id,
                    cached = token.cached_name,
                    "mention id not in directory, using cached name"
                );
                token.cached_name
            }
        };
        out.push_str(&syntax.render_element(name));
        last = token.range.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Replace every display element with a token.
///
/// Names are matched exactly against the directory. A name nobody carries
/// is a data-integrity failure: saving it would silently drop the mention.
pub fn to_persisted_text(
    syntax: &MentionSyntax,
    markup: &str,
    candidates: &[Candidate],
) -> Result<String, AquiferError> {
    let mut out = String::with_capacity(markup.len());
    let mut last = 0;
    for element in syntax.elements(markup) {
        out.push_str(&markup[last..element.range.start]);
        let inner = htmlize::unescape(element.inner);
        let inner: &str = &inner;
        let name = inner.strip_prefix(syntax.sigil()).unwrap_or(inner);
        let Some(candidate) = find_by_name(candidates, name) else {
            tracing::error!(
                target: "aquifer::codec",
                name,
                "mention does not resolve to a candidate"
            );
            return Err(UnresolvedMentionError::new(name, markup, element.range).into());
        };
        out.push_str(&syntax.render_token(candidate.id, &candidate.display_name));
        last = element.range.end;
    }
    out.push_str(&markup[last..]);
    Ok(out)
}

/// Result of committing a candidate into a working mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResult {
    /// Persisted text with the new token and a trailing space.
    pub persisted_text: String,
    /// Display markup to put back on the surface.
    pub markup: String,
    /// Visible offset to restore the cursor to.
    pub cursor: usize,
}

/// Splice a candidate in place of the working mention.
///
/// The mention must still occupy `[start, end)` of the visible text and sit
/// at a word boundary. The text around it goes through the save path, so
/// other mentions in the markup have to resolve as well.
pub fn commit_selection(
    syntax: &MentionSyntax,
    markup: &str,
    mention: &Mention,
    candidate: &Candidate,
    candidates: &[Candidate],
) -> Result<CommitResult, AquiferError> {
    let map = MarkupMap::new(markup);
    let stale = |found: String| AquiferError::StaleMention {
        expected: mention.text.to_string(),
        found,
        start: mention.start,
        end: mention.end,
    };

    if mention.start > mention.end || mention.end > map.visible_len() {
        return Err(stale(String::new()));
    }
    let chars = map.chars();
    let found: String = chars[mention.range()].iter().map(|c| c.ch).collect();
    if found.as_str() != mention.text.as_str() || !found.starts_with(syntax.sigil()) {
        return Err(stale(found));
    }
    let preceded_by_space = match mention.start.checked_sub(1) {
        Some(prev) if chars[prev].ch.is_whitespace() || chars[mention.start].after_break => true,
        Some(_) => return Err(stale(found)),
        None => false,
    };
    let Some(span) = map.visible_to_byte_span(mention.range()) else {
        return Err(stale(found));
    };

    let before = to_persisted_text(syntax, &markup[..span.start], candidates)?;
    let after = to_persisted_text(syntax, &markup[span.end..], candidates)?;
    let token = syntax.render_token(candidate.id, &candidate.display_name);
    let persisted_text = format!("{before}{token} {after}");

    let name_len = candidate.display_name.chars().count();
    let mut cursor = mention.end - mention.char_len() + name_len + 1;
    if preceded_by_space {
        cursor += 1;
    }

    tracing::debug!(
        target: "aquifer::codec",
        mention = %mention.text,
        candidate = %candidate.id,
        cursor,
        "committed mention"
    );

    Ok(CommitResult {
        markup: to_display_markup(syntax, &persisted_text, candidates),
        persisted_text,
        cursor,
    })
}
