// SPDX-License-Identifier: GPL-3.0-or-later

use log::{debug, trace};

use crate::composition::{self, Composition, CompositionFlags, StringKind, build_composition};
use crate::geometry::{Range, Rect};
use crate::imm::{CandidateForm, CompositionAction, ImmBackend, InputContext};
use crate::language::{CaretAnchor, LangId, PositioningPolicy};

/// Keeps the IME composition of one off-screen rendered window in sync with
/// the input method manager.
///
/// All methods must be called from the thread that owns the window.
pub struct ImeHandler<B: ImmBackend> {
    backend: B,
    input_language: LangId,
    is_composing: bool,
    cursor_index: Option<u32>,
    composition_range: Range,
    composition_bounds: Vec<Rect>,
    system_caret: bool,
}

impl<B: ImmBackend> ImeHandler<B> {
    pub fn new(backend: B) -> ImeHandler<B> {
        ImeHandler {
            backend,
            input_language: LangId::USER_DEFAULT,
            is_composing: false,
            cursor_index: None,
            composition_range: Range::default(),
            composition_bounds: Vec::new(),
            system_caret: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn input_language(&self) -> LangId {
        self.input_language
    }

    pub fn is_composing(&self) -> bool {
        self.is_composing
    }

    pub fn cursor_index(&self) -> Option<u32> {
        self.cursor_index
    }

    pub fn composition_range(&self) -> Range {
        self.composition_range
    }

    pub fn composition_bounds(&self) -> &[Rect] {
        &self.composition_bounds
    }

    pub fn has_system_caret(&self) -> bool {
        self.system_caret
    }

    fn policy(&self) -> PositioningPolicy {
        PositioningPolicy::for_language(self.input_language)
    }

    /// Refreshes the input language from the active keyboard layout, falling
    /// back to en-US.
    pub fn set_input_language(&mut self) {
        self.input_language = self
            .backend
            .keyboard_layout_name()
            .and_then(|klid| LangId::from_layout_name(&klid))
            .unwrap_or(LangId::EN_US);
        debug!("input language = {:#06x}", self.input_language.0);
    }

    pub fn enable_ime(&mut self) {
        self.backend.associate_default_context();
    }

    /// Commits any pending composition, then detaches the input context.
    pub fn disable_ime(&mut self) {
        self.cleanup_composition();
        self.destroy_ime_window();
        self.backend.disassociate_context();
    }

    /// Creates the temporary system caret for languages whose IMEs position
    /// the candidate window from GetCaretPos.
    pub fn create_ime_window(&mut self) {
        if self.policy().system_caret && !self.system_caret {
            self.system_caret = self.backend.create_caret();
            if !self.system_caret {
                debug!("unable to create system caret");
            }
        }
    }

    pub fn destroy_ime_window(&mut self) {
        if self.system_caret {
            self.backend.destroy_caret();
            self.system_caret = false;
        }
    }

    /// Completes the ongoing composition, e.g. when the window is
    /// deactivated while composing.
    pub fn cleanup_composition(&mut self) {
        self.end_composition(CompositionAction::Complete);
    }

    /// Discards the ongoing composition.
    pub fn cancel_ime(&mut self) {
        self.end_composition(CompositionAction::Cancel);
    }

    fn end_composition(&mut self, action: CompositionAction) {
        if !self.is_composing {
            return;
        }
        if let Some(context) = self.backend.input_context() {
            context.notify_composition(action);
        }
        self.reset_composition();
    }

    pub fn reset_composition(&mut self) {
        self.is_composing = false;
        self.cursor_index = None;
    }

    /// Reads the committed string of a WM_IME_COMPOSITION.
    pub fn get_result(&self, flags: CompositionFlags) -> Option<String> {
        let context = self.backend.input_context()?;
        read_string(&context, flags, StringKind::Result)
    }

    /// Reads the composition string of a WM_IME_COMPOSITION together with its
    /// underlines and caret offset. Marks the handler as composing on success.
    pub fn get_composition(&mut self, flags: CompositionFlags) -> Option<Composition> {
        let composition = {
            let context = self.backend.input_context()?;
            let text = read_string(&context, flags, StringKind::Composition)?;
            let attributes = flags
                .contains(CompositionFlags::COMPATTR)
                .then(|| context.attributes())
                .flatten();
            let clauses = flags
                .contains(CompositionFlags::COMPCLAUSE)
                .then(|| context.clauses())
                .flatten();
            let start = composition::composition_start(flags, || context.cursor_position());
            build_composition(text, start, attributes.as_deref(), clauses.as_deref())
        };
        self.is_composing = true;
        Some(composition)
    }

    pub fn update_caret_position(&mut self, index: u32) {
        self.cursor_index = Some(index);
        self.move_ime_window();
    }

    pub(crate) fn set_cursor_index(&mut self, index: Option<u32>) {
        self.cursor_index = index;
        self.move_ime_window();
    }

    /// Replaces the composition range and its per-character bounds.
    pub fn change_composition_range(&mut self, range: Range, bounds: Vec<Rect>) {
        self.composition_range = range;
        self.composition_bounds = bounds;
        self.move_ime_window();
    }

    /// The character rectangle the caret is on, if the renderer told us
    /// about it.
    pub fn caret_rect(&self) -> Option<Rect> {
        let range_start = self.composition_range.from;
        let mut location = self.cursor_index.unwrap_or(range_start);
        if location >= range_start {
            location -= range_start;
        }
        let location = usize::try_from(location).ok()?;
        self.composition_bounds.get(location).copied()
    }

    /// Moves the candidate window, and the system caret if there is one, to
    /// the caret rectangle.
    pub fn move_ime_window(&mut self) {
        if !self.backend.has_focus() {
            return;
        }
        let Some(rc) = self.caret_rect() else {
            trace!(
                "no bounds for caret {:?} in {:?}",
                self.cursor_index, self.composition_range
            );
            return;
        };
        let Some(context) = self.backend.input_context() else {
            return;
        };
        let policy = self.policy();
        if policy.candidate_position {
            context.set_candidate_window(CandidateForm::Position(rc.top_left()));
        }
        if self.system_caret {
            let position = match policy.caret_anchor {
                CaretAnchor::TopLeft => rc.top_left(),
                CaretAnchor::BottomLeft => rc.bottom_left(),
            };
            self.backend.set_caret_position(position);
        }
        let rc = rc.offset_y(policy.exclude_offset_y);
        context.set_candidate_window(CandidateForm::exclude(rc));
    }
}

impl<B: ImmBackend> Drop for ImeHandler<B> {
    fn drop(&mut self) {
        self.destroy_ime_window();
    }
}

fn read_string(
    context: &impl InputContext,
    flags: CompositionFlags,
    kind: StringKind,
) -> Option<String> {
    if !flags.contains(kind.flag()) {
        return None;
    }
    context.string(kind).filter(|text| !text.is_empty())
}
