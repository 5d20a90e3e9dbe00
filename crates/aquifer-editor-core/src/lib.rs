//! aquifer-editor-core: @-mentions for contenteditable-style editors, without DOM dependencies.
//!
//! This crate provides:
//! - `offset_map` - visible-char ↔ markup offsets, and `TextTree` caret lookup
//! - `MentionDetector` - tells a mention being typed from a resolved one under the cursor
//! - `codec` - persisted `{@id|name}` tokens ↔ display markup, plus the selection splice
//! - `MentionEngine<S>` - key handling, popup state and deferred cursor restoration
//!   over any `EditableSurface`

pub mod actions;
pub mod candidates;
pub mod codec;
pub mod detect;
pub mod engine;
pub mod offset_map;
pub mod platform;
pub mod surface;
pub mod syntax;
pub mod tree;
pub mod types;

pub use actions::{Key, KeyDisposition};
pub use aquifer_common::{AquiferError, EngineConfig, PopupConfig, Result, SyntaxConfig};
pub use candidates::CandidateDirectory;
pub use codec::{
    CommitResult, commit_selection, display_markup_to_persisted_text,
    persisted_text_to_display_markup, to_display_markup, to_persisted_text,
};
pub use detect::MentionDetector;
pub use engine::{MentionEngine, MountOptions, PopupState};
pub use offset_map::{
    MarkupMap, VisibleChar, map_markup_offset_to_visible_offset,
    map_visible_offset_to_markup_offset, visible_text,
};
pub use platform::{EditableSurface, PlatformError};
pub use smol_str::SmolStr;
pub use surface::MemorySurface;
pub use syntax::MentionSyntax;
pub use tree::{
    MarkupTree, NodeId, NodeKind, TextPosition, TextTree, locate_visible_offset, visible_offset_of,
};
pub use types::{Candidate, CandidateId, DetectedMention, Mention};
