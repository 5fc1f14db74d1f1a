// SPDX-License-Identifier: GPL-3.0-or-later

//! The input method manager as seen from the handler.
//!
//! [`ImmBackend`] covers window-level calls. Context-level calls go through
//! an [`InputContext`], which is only obtainable from
//! [`ImmBackend::input_context`] and gives the native handle back when
//! dropped.

use crate::composition::StringKind;
use crate::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionAction {
    /// NI_COMPOSITIONSTR / CPS_COMPLETE
    Complete,
    /// NI_COMPOSITIONSTR / CPS_CANCEL
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateForm {
    /// CFS_CANDIDATEPOS
    Position(Point),
    /// CFS_EXCLUDE: the candidate window must not cover `area`.
    Exclude { position: Point, area: Rect },
}

impl CandidateForm {
    pub const fn exclude(area: Rect) -> CandidateForm {
        CandidateForm::Exclude {
            position: area.top_left(),
            area,
        }
    }
}

pub trait InputContext {
    /// Reads the composition or result string. `None` when the IME reports no
    /// data.
    fn string(&self, kind: StringKind) -> Option<String>;
    /// GCS_COMPATTR, one byte per UTF-16 code unit.
    fn attributes(&self) -> Option<Vec<u8>>;
    /// GCS_COMPCLAUSE offsets, including the leading 0 and trailing length.
    fn clauses(&self) -> Option<Vec<u32>>;
    /// GCS_CURSORPOS
    fn cursor_position(&self) -> i32;
    fn notify_composition(&self, action: CompositionAction);
    fn set_candidate_window(&self, form: CandidateForm);
}

pub trait ImmBackend {
    type Context<'a>: InputContext
    where
        Self: 'a;

    /// Whether the window owning this backend has keyboard focus.
    fn has_focus(&self) -> bool;
    /// The KLID of the active keyboard layout, e.g. `00000411`.
    fn keyboard_layout_name(&self) -> Option<String>;
    /// Acquires the window's input context. `None` when no context is
    /// associated.
    fn input_context(&self) -> Option<Self::Context<'_>>;
    fn associate_default_context(&self);
    fn disassociate_context(&self);
    /// Returns whether a caret was created.
    fn create_caret(&self) -> bool;
    fn destroy_caret(&self);
    fn set_caret_position(&self, position: Point);
}
