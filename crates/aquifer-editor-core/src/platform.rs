//! Platform abstraction for the element the engine is attached to.
//!
//! The engine never touches a DOM directly. A host implements
//! [`EditableSurface`] over its editable element (a contenteditable div in a
//! browser, a native text view, or [`MemorySurface`](crate::MemorySurface)
//! in tests) and the engine drives it through visible-char offsets.

use aquifer_common::AquiferError;

/// Error type for platform operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

impl From<PlatformError> for AquiferError {
    fn from(err: PlatformError) -> Self {
        AquiferError::Platform(err.0)
    }
}

/// An editable element holding display markup and a caret.
///
/// Offsets are visible-char offsets, the same coordinates the detector uses.
pub trait EditableSurface {
    /// Current markup of the element (`innerHTML` in a browser).
    fn markup(&self) -> String;

    /// Replace the element's content. The caret is lost, as when a browser
    /// element's `innerHTML` is assigned.
    fn set_markup(&mut self, markup: &str);

    /// Caret position, or None when the element has no caret.
    fn cursor_offset(&self) -> Option<usize>;

    /// Place a collapsed caret at a visible offset.
    ///
    /// Offsets past the end of the content clamp to the end.
    fn set_cursor_offset(&mut self, offset: usize) -> Result<(), PlatformError>;

    /// Give the element keyboard focus.
    fn focus(&mut self) -> Result<(), PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_error_converts() {
        let err: AquiferError = PlatformError::from("no selection").into();
        assert_eq!(err.to_string(), "platform error: no selection");
    }
}
