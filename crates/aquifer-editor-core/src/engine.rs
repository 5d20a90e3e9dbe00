//! Interaction controller.
//!
//! Owns the per-element state the mention feature needs between keystrokes:
//! the working mention, the popup, and one pending cursor restoration. Hosts
//! forward key events and call [`MentionEngine::run_deferred`] after their
//! next render pass.

use aquifer_common::{AquiferError, EngineConfig, PopupConfig};

use crate::actions::{Key, KeyDisposition};
use crate::candidates::CandidateDirectory;
use crate::codec::{self, CommitResult};
use crate::detect::MentionDetector;
use crate::platform::EditableSurface;
use crate::types::{Candidate, CandidateId, DetectedMention, Mention};

/// What the host hands the engine when attaching it to an element.
#[derive(Debug, Clone)]
pub struct MountOptions {
    /// Stored text with mention tokens.
    pub persisted_text: String,
    pub candidates: Vec<Candidate>,
    /// The acting user. Only candidates in their organization are offered.
    pub current_user: Candidate,
}

/// Suggestion popup as the host should render it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopupState {
    visible: bool,
    candidates: Vec<Candidate>,
    selected: usize,
}

impl PopupState {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Candidate> {
        self.candidates.get(self.selected)
    }

    fn show(&mut self, candidates: Vec<Candidate>) {
        self.visible = !candidates.is_empty();
        self.candidates = candidates;
        self.selected = 0;
    }

    fn hide(&mut self) {
        *self = Self::default();
    }

    fn move_selection(&mut self, forward: bool, wrap: bool) {
        let n = self.candidates.len();
        if n == 0 {
            return;
        }
        self.selected = match (forward, wrap) {
            (true, true) => (self.selected + 1) % n,
            (true, false) => (self.selected + 1).min(n - 1),
            (false, true) => (self.selected + n - 1) % n,
            (false, false) => self.selected.saturating_sub(1),
        };
    }
}

/// Mention handling for one editable element.
#[derive(Debug)]
pub struct MentionEngine<S: EditableSurface> {
    surface: S,
    detector: MentionDetector,
    directory: CandidateDirectory,
    popup_config: PopupConfig,
    working: Option<Mention>,
    popup: PopupState,
    pending_cursor: Option<usize>,
}

impl<S: EditableSurface> MentionEngine<S> {
    /// Render the persisted text into the surface and start tracking it.
    pub fn attach(
        surface: S,
        options: MountOptions,
        config: &EngineConfig,
    ) -> Result<Self, AquiferError> {
        let detector = MentionDetector::from_config(config.syntax.clone())?;
        let mut engine = Self {
            surface,
            detector,
            directory: CandidateDirectory::new(options.candidates, options.current_user),
            popup_config: config.popup.clone(),
            working: None,
            popup: PopupState::default(),
            pending_cursor: None,
        };

        let markup = codec::to_display_markup(
            engine.detector.syntax(),
            &options.persisted_text,
            engine.directory.candidates(),
        );
        engine.surface.set_markup(&markup);
        tracing::debug!(
            target: "aquifer::engine",
            candidates = engine.directory.candidates().len(),
            "attached"
        );
        Ok(engine)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The host's editing goes through here.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn popup(&self) -> &PopupState {
        &self.popup
    }

    pub fn working_mention(&self) -> Option<&Mention> {
        self.working.as_ref()
    }

    pub fn directory(&self) -> &CandidateDirectory {
        &self.directory
    }

    /// Cursor offset waiting for [`run_deferred`](Self::run_deferred).
    pub fn pending_cursor(&self) -> Option<usize> {
        self.pending_cursor
    }

    /// Key-down: the open popup takes Enter and the vertical arrows.
    ///
    /// Only while the cursor is still at the end of the working mention. A
    /// cursor moved elsewhere closes the popup and the key passes through.
    pub fn on_key_down(&mut self, key: &Key) -> Result<KeyDisposition, AquiferError> {
        if !self.popup.is_visible() || !key.is_popup_navigation() {
            return Ok(KeyDisposition::PassThrough);
        }
        let cursor = self.surface.cursor_offset();
        let moved_away = self
            .working
            .as_ref()
            .filter(|working| cursor.is_some_and(|c| c != working.end));
        if let Some(working) = moved_away {
            tracing::debug!(
                target: "aquifer::engine",
                ?key,
                ?cursor,
                mention = %working.text,
                "cursor left working mention, popup closed"
            );
            self.working = None;
            self.popup.hide();
            return Ok(KeyDisposition::PassThrough);
        }

        let wrap = self.popup_config.wrap_selection;
        match key {
            Key::ArrowDown => self.popup.move_selection(true, wrap),
            Key::ArrowUp => self.popup.move_selection(false, wrap),
            Key::Enter => {
                if let Some(id) = self.popup.selected().map(|c| c.id) {
                    self.select_candidate(id)?;
                }
            }
            _ => {}
        }
        tracing::trace!(
            target: "aquifer::engine",
            ?key,
            selected = self.popup.selected_index(),
            "popup key"
        );
        Ok(KeyDisposition::PreventDefault)
    }

    /// Key-up: classify the cursor and update the popup.
    pub fn on_key_up(&mut self, key: &Key) -> Result<Option<DetectedMention>, AquiferError> {
        if *key == Key::Escape {
            tracing::debug!(target: "aquifer::engine", "popup dismissed");
            self.popup.hide();
            return Ok(None);
        }
        // Already handled on key-down; detecting again would reset the selection.
        if self.popup.is_visible() && key.is_popup_navigation() {
            return Ok(None);
        }

        let detected = match self.surface.cursor_offset() {
            Some(cursor) => self.detector.detect(&self.surface.markup(), cursor, Some(key)),
            None => None,
        };

        match &detected {
            Some(DetectedMention::Working(mention)) => {
                let mut eligible: Vec<Candidate> =
                    self.directory.eligible(mention.query()).into_iter().cloned().collect();
                if let Some(max) = self.popup_config.max_candidates {
                    eligible.truncate(max);
                }
                tracing::debug!(
                    target: "aquifer::engine",
                    mention = %mention.text,
                    matches = eligible.len(),
                    "working mention"
                );
                self.popup.show(eligible);
                self.working = Some(mention.clone());
            }
            Some(DetectedMention::Completed(mention)) => {
                tracing::trace!(
                    target: "aquifer::engine",
                    mention = %mention.text,
                    "inside completed mention"
                );
            }
            None => {
                if self.working.take().is_some() {
                    tracing::debug!(target: "aquifer::engine", "working mention ended");
                }
                self.popup.hide();
            }
        }
        Ok(detected)
    }

    /// Commit a candidate into the working mention.
    ///
    /// Replaces the surface markup and schedules the cursor for the next
    /// [`run_deferred`](Self::run_deferred).
    pub fn select_candidate(&mut self, id: CandidateId) -> Result<CommitResult, AquiferError> {
        let Some(mention) = self.working.clone() else {
            tracing::error!(
                target: "aquifer::engine",
                %id,
                "candidate selected with no working mention"
            );
            return Err(AquiferError::NoWorkingMention);
        };
        let Some(candidate) = self.directory.get(id) else {
            tracing::error!(
                target: "aquifer::engine",
                %id,
                "selected candidate is not in the directory"
            );
            return Err(AquiferError::UnknownCandidate(id.0));
        };

        let result = codec::commit_selection(
            self.detector.syntax(),
            &self.surface.markup(),
            &mention,
            candidate,
            self.directory.candidates(),
        )?;

        self.surface.set_markup(&result.markup);
        self.schedule_cursor(result.cursor);
        self.working = None;
        self.popup.hide();
        Ok(result)
    }

    /// Focus the surface and restore the pending cursor, if any.
    pub fn run_deferred(&mut self) -> Result<(), AquiferError> {
        let Some(offset) = self.pending_cursor.take() else {
            return Ok(());
        };
        self.surface.focus()?;
        self.surface.set_cursor_offset(offset)?;
        tracing::trace!(target: "aquifer::engine", offset, "cursor restored");
        Ok(())
    }

    /// The surface content as persisted text. This is the save path.
    pub fn persisted_text(&self) -> Result<String, AquiferError> {
        codec::to_persisted_text(
            self.detector.syntax(),
            &self.surface.markup(),
            self.directory.candidates(),
        )
    }

    /// Stop tracking the element and hand it back.
    pub fn detach(mut self) -> S {
        self.working = None;
        self.popup.hide();
        if self.pending_cursor.take().is_some() {
            tracing::debug!(
                target: "aquifer::engine",
                "detached with a cursor restoration pending"
            );
        }
        tracing::debug!(target: "aquifer::engine", "detached");
        self.surface
    }

    fn schedule_cursor(&mut self, offset: usize) {
        if let Some(previous) = self.pending_cursor.replace(offset) {
            tracing::warn!(
                target: "aquifer::engine",
                previous,
                offset,
                "pending cursor restoration replaced before it ran"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;

    fn options(text: &str) -> MountOptions {
        MountOptions {
            persisted_text: text.to_string(),
            candidates: vec![
                Candidate::new(42, "Jane Doe", 1),
                Candidate::new(7, "Jane Smith", 1),
                Candidate::new(3, "Janet Other Org", 2),
            ],
            current_user: Candidate::new(1, "Me", 1),
        }
    }

    fn engine(text: &str, config: &EngineConfig) -> MentionEngine<MemorySurface> {
        MentionEngine::attach(MemorySurface::default(), options(text), config).unwrap()
    }

    fn type_and_release(engine: &mut MentionEngine<MemorySurface>, text: &str) {
        for c in text.chars() {
            engine.surface_mut().type_text(&c.to_string());
            engine.on_key_up(&Key::Character(c)).unwrap();
        }
    }

    #[test]
    fn popup_selection_clamps_by_default() {
        let mut engine = engine("", &EngineConfig::default());
        type_and_release(&mut engine, "@Ja");
        assert_eq!(engine.popup().candidates().len(), 2);

        assert_eq!(engine.on_key_down(&Key::ArrowUp).unwrap(), KeyDisposition::PreventDefault);
        assert_eq!(engine.popup().selected_index(), 0);
        engine.on_key_down(&Key::ArrowDown).unwrap();
        engine.on_key_down(&Key::ArrowDown).unwrap();
        assert_eq!(engine.popup().selected_index(), 1);
    }

    #[test]
    fn popup_selection_wraps_when_configured() {
        let mut config = EngineConfig::default();
        config.popup.wrap_selection = true;
        let mut engine = engine("", &config);
        type_and_release(&mut engine, "@Ja");

        engine.on_key_down(&Key::ArrowUp).unwrap();
        assert_eq!(engine.popup().selected_index(), 1);
        engine.on_key_down(&Key::ArrowDown).unwrap();
        assert_eq!(engine.popup().selected_index(), 0);
    }

    #[test]
    fn key_up_of_navigation_keeps_selection() {
        let mut engine = engine("", &EngineConfig::default());
        type_and_release(&mut engine, "@Ja");
        engine.on_key_down(&Key::ArrowDown).unwrap();
        engine.on_key_up(&Key::ArrowDown).unwrap();
        assert_eq!(engine.popup().selected().map(|c| c.id), Some(CandidateId(7)));
    }

    #[test]
    fn typing_resets_selection() {
        let mut engine = engine("", &EngineConfig::default());
        type_and_release(&mut engine, "@Ja");
        engine.on_key_down(&Key::ArrowDown).unwrap();
        assert_eq!(engine.popup().selected_index(), 1);

        type_and_release(&mut engine, "n");
        assert_eq!(engine.popup().candidates().len(), 2);
        assert_eq!(engine.popup().selected_index(), 0);
    }

    #[test]
    fn max_candidates_truncates() {
        let mut config = EngineConfig::default();
        config.popup.max_candidates = Some(1);
        let mut engine = engine("", &config);
        type_and_release(&mut engine, "@J");
        assert_eq!(engine.popup().candidates().len(), 1);
    }

    #[test]
    fn keys_pass_through_without_popup() {
        let mut engine = engine("", &EngineConfig::default());
        assert_eq!(engine.on_key_down(&Key::Enter).unwrap(), KeyDisposition::PassThrough);
        type_and_release(&mut engine, "@Zed");
        assert!(!engine.popup().is_visible());
        assert_eq!(engine.on_key_down(&Key::ArrowDown).unwrap(), KeyDisposition::PassThrough);
    }

    #[test]
    fn escape_hides_popup() {
        let mut engine = engine("", &EngineConfig::default());
        type_and_release(&mut engine, "@Ja");
        assert!(engine.popup().is_visible());
        assert_eq!(engine.on_key_up(&Key::Escape).unwrap(), None);
        assert!(!engine.popup().is_visible());
    }

    #[test]
    fn select_without_working_mention_is_an_error() {
        let mut engine = engine("plain", &EngineConfig::default());
        let err = engine.select_candidate(CandidateId(42)).unwrap_err();
        assert!(matches!(err, AquiferError::NoWorkingMention));
    }

    #[test]
    fn select_unknown_candidate_is_an_error() {
        let mut engine = engine("", &EngineConfig::default());
        type_and_release(&mut engine, "@Ja");
        let err = engine.select_candidate(CandidateId(1000)).unwrap_err();
        assert!(matches!(err, AquiferError::UnknownCandidate(1000)));
    }

    #[test]
    fn invalid_syntax_fails_attach() {
        let mut config = EngineConfig::default();
        config.syntax.token_close = config.syntax.token_open;
        let result = MentionEngine::attach(MemorySurface::default(), options(""), &config);
        assert!(result.is_err());
    }

    #[test]
    fn run_deferred_without_pending_is_noop() {
        let mut engine = engine("hi", &EngineConfig::default());
        engine.run_deferred().unwrap();
        assert!(!engine.surface().is_focused());
    }

    #[test]
    fn detach_returns_surface() {
        let mut engine = engine("{@42|Jane Doe}", &EngineConfig::default());
        type_and_release(&mut engine, " @Ja");
        let surface = engine.detach();
        assert!(surface.markup().starts_with(r#"<span class="mention">@Jane Doe</span>"#));
    }
}
