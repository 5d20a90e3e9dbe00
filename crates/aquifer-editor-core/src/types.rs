//! Core mention types: mentions found in the editor and directory candidates.
//!
//! All offsets are visible-character offsets (chars as the user sees them,
//! NOT markup or byte offsets).

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A mention in the editable surface, either being typed or already resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mention {
    /// Visible offset of the sigil (inclusive).
    pub start: usize,
    /// Visible offset after the last char (exclusive). For a working mention this is the cursor.
    pub end: usize,
    /// Matched text including the leading sigil, e.g. `@Jane`.
    pub text: SmolStr,
}

impl Mention {
    pub fn new(start: usize, end: usize, text: impl Into<SmolStr>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Length of the text in chars.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The text with its sigil stripped.
    pub fn query(&self) -> &str {
        let mut chars = self.text.chars();
        chars.next();
        chars.as_str()
    }

    /// Whether a cursor offset touches this mention. Both ends are inclusive.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Cursor context classification.
///
/// Detection returns `Option<DetectedMention>`; `None` means the cursor is
/// neither typing a mention nor inside a resolved one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetectedMention {
    /// A mention still being typed, ending at the cursor.
    Working(Mention),
    /// A resolved mention rendered as a styled element.
    Completed(Mention),
}

impl DetectedMention {
    pub fn mention(&self) -> &Mention {
        match self {
            Self::Working(m) | Self::Completed(m) => m,
        }
    }

    pub fn is_working(&self) -> bool {
        matches!(self, Self::Working(_))
    }
}

/// Durable identity of a directory candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub u64);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CandidateId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A directory entry that can be mentioned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: CandidateId,
    pub display_name: SmolStr,
    pub organization_id: u64,
}

impl Candidate {
    pub fn new(id: u64, display_name: impl Into<SmolStr>, organization_id: u64) -> Self {
        Self {
            id: CandidateId(id),
            display_name: display_name.into(),
            organization_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_query_strips_sigil() {
        let m = Mention::new(6, 9, "@Ja");
        assert_eq!(m.query(), "Ja");
        assert_eq!(m.char_len(), 3);
        assert_eq!(m.range(), 6..9);

        let lone = Mention::new(0, 1, "@");
        assert_eq!(lone.query(), "");
    }

    #[test]
    fn mention_touches_is_inclusive() {
        let m = Mention::new(0, 5, "@Jane");
        assert!(m.touches(0));
        assert!(m.touches(5));
        assert!(!m.touches(6));
    }

    #[test]
    fn candidate_wire_format() {
        let c: Candidate =
            serde_json::from_str(r#"{"id":42,"displayName":"Jane Doe","organizationId":1}"#)
                .unwrap();
        assert_eq!(c, Candidate::new(42, "Jane Doe", 1));
        assert_eq!(c.id.to_string(), "42");
    }
}
