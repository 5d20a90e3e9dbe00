//! Error types for the aquifer mention engine.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::ops::Range;
use std::path::PathBuf;

/// Convenience alias used across the aquifer crates.
pub type Result<T, E = AquiferError> = std::result::Result<T, E>;

/// Main error type for aquifer operations
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum AquiferError {
    /// A mention element in editor markup names nobody in the directory.
    #[error(transparent)]
    #[diagnostic(transparent)]
    UnresolvedMention(#[from] UnresolvedMentionError),

    /// A candidate was selected while no working mention was tracked.
    #[error("a candidate was selected but no working mention is being tracked")]
    #[diagnostic(
        code(aquifer::engine::no_working_mention),
        help("selection is only reachable while the popup is open for a working mention")
    )]
    NoWorkingMention,

    /// The tracked working mention no longer matches the editor text.
    #[error("working mention {expected:?} no longer matches the text at {start}..{end} (found {found:?})")]
    #[diagnostic(code(aquifer::engine::stale_mention))]
    StaleMention {
        expected: String,
        found: String,
        start: usize,
        end: usize,
    },

    /// Candidate id passed to a selection is not in the directory.
    #[error("candidate {0} is not in the directory")]
    #[diagnostic(code(aquifer::engine::unknown_candidate))]
    UnknownCandidate(u64),

    /// Mention syntax settings that cannot produce an unambiguous grammar.
    #[error("invalid mention syntax: {0}")]
    #[diagnostic(code(aquifer::config::syntax))]
    InvalidSyntax(String),

    /// Configuration loading or saving error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// Editable surface failure (cursor placement, focus)
    #[error("platform error: {0}")]
    #[diagnostic(code(aquifer::platform))]
    Platform(String),
}

/// A display mention whose name resolves to no candidate.
///
/// Carries the markup being saved so the report can point at the element.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[error("mention {name:?} does not match any candidate in the directory")]
#[diagnostic(
    code(aquifer::codec::unresolved_mention),
    help("the candidate directory is stale or does not belong to this content")
)]
pub struct UnresolvedMentionError {
    name: String,
    #[source_code]
    src: NamedSource<String>,
    #[label("no candidate with this name")]
    span: SourceSpan,
}

impl UnresolvedMentionError {
    /// `byte_range` is the element's byte range within `markup`.
    pub fn new(name: impl Into<String>, markup: &str, byte_range: Range<usize>) -> Self {
        Self {
            name: name.into(),
            src: NamedSource::new("markup", markup.to_owned()),
            span: byte_range.into(),
        }
    }

    /// The stripped display name that failed to resolve.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte span of the offending element in the source markup.
    pub fn span(&self) -> SourceSpan {
        self.span
    }
}

/// Configuration file errors
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to access {}", path.display())]
    #[diagnostic(code(aquifer::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(aquifer::config::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(aquifer::config::toml))]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    #[diagnostic(code(aquifer::config::toml))]
    TomlSer(#[from] toml::ser::Error),

    #[error("unsupported configuration format {0:?}")]
    #[diagnostic(
        code(aquifer::config::format),
        help("use a file with a .json or .toml extension")
    )]
    UnsupportedFormat(Option<String>),
}
