// SPDX-License-Identifier: GPL-3.0-or-later

//! Recording input method manager for tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::composition::StringKind;
use crate::geometry::Point;
use crate::imm::{CandidateForm, CompositionAction, ImmBackend, InputContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    AcquireContext,
    ReleaseContext,
    Notify(CompositionAction),
    SetCandidateWindow(CandidateForm),
    Associate,
    Disassociate,
    CreateCaret,
    DestroyCaret,
    SetCaretPos(Point),
}

#[derive(Debug)]
pub(crate) struct MockImm {
    focus: Cell<bool>,
    context_available: Cell<bool>,
    caret_available: Cell<bool>,
    layout: RefCell<Option<String>>,
    composition_string: RefCell<Option<String>>,
    result_string: RefCell<Option<String>>,
    attributes: RefCell<Option<Vec<u8>>>,
    clauses: RefCell<Option<Vec<u32>>>,
    cursor_position: Cell<i32>,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl Default for MockImm {
    fn default() -> Self {
        MockImm {
            focus: Cell::new(true),
            context_available: Cell::new(true),
            caret_available: Cell::new(true),
            layout: RefCell::default(),
            composition_string: RefCell::default(),
            result_string: RefCell::default(),
            attributes: RefCell::default(),
            clauses: RefCell::default(),
            cursor_position: Cell::new(0),
            calls: Rc::default(),
        }
    }
}

impl MockImm {
    pub(crate) fn set_focus(&self, focus: bool) {
        self.focus.set(focus);
    }
    pub(crate) fn set_context_available(&self, available: bool) {
        self.context_available.set(available);
    }
    pub(crate) fn set_caret_available(&self, available: bool) {
        self.caret_available.set(available);
    }
    pub(crate) fn set_layout(&self, klid: Option<&str>) {
        *self.layout.borrow_mut() = klid.map(String::from);
    }
    pub(crate) fn set_composition_string(&self, text: Option<&str>) {
        *self.composition_string.borrow_mut() = text.map(String::from);
    }
    pub(crate) fn set_result_string(&self, text: Option<&str>) {
        *self.result_string.borrow_mut() = text.map(String::from);
    }
    pub(crate) fn set_attributes(&self, attributes: Option<Vec<u8>>) {
        *self.attributes.borrow_mut() = attributes;
    }
    pub(crate) fn set_clauses(&self, clauses: Option<Vec<u32>>) {
        *self.clauses.borrow_mut() = clauses;
    }
    pub(crate) fn set_cursor_position(&self, position: i32) {
        self.cursor_position.set(position);
    }

    pub(crate) fn take_calls(&self) -> Vec<Call> {
        self.calls.take()
    }

    /// Shared call log that outlives the mock.
    pub(crate) fn calls_handle(&self) -> Rc<RefCell<Vec<Call>>> {
        Rc::clone(&self.calls)
    }

    /// Every acquired context was released.
    pub(crate) fn contexts_balanced(&self) -> bool {
        let calls = self.calls.borrow();
        let acquired = calls.iter().filter(|c| **c == Call::AcquireContext).count();
        let released = calls.iter().filter(|c| **c == Call::ReleaseContext).count();
        acquired == released
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

pub(crate) struct MockContext<'a> {
    imm: &'a MockImm,
}

impl Drop for MockContext<'_> {
    fn drop(&mut self) {
        self.imm.record(Call::ReleaseContext);
    }
}

impl InputContext for MockContext<'_> {
    fn string(&self, kind: StringKind) -> Option<String> {
        match kind {
            StringKind::Composition => self.imm.composition_string.borrow().clone(),
            StringKind::Result => self.imm.result_string.borrow().clone(),
        }
    }

    fn attributes(&self) -> Option<Vec<u8>> {
        self.imm.attributes.borrow().clone()
    }

    fn clauses(&self) -> Option<Vec<u32>> {
        self.imm.clauses.borrow().clone()
    }

    fn cursor_position(&self) -> i32 {
        self.imm.cursor_position.get()
    }

    fn notify_composition(&self, action: CompositionAction) {
        self.imm.record(Call::Notify(action));
    }

    fn set_candidate_window(&self, form: CandidateForm) {
        self.imm.record(Call::SetCandidateWindow(form));
    }
}

impl ImmBackend for MockImm {
    type Context<'a> = MockContext<'a>;

    fn has_focus(&self) -> bool {
        self.focus.get()
    }

    fn keyboard_layout_name(&self) -> Option<String> {
        self.layout.borrow().clone()
    }

    fn input_context(&self) -> Option<MockContext<'_>> {
        if !self.context_available.get() {
            return None;
        }
        self.record(Call::AcquireContext);
        Some(MockContext { imm: self })
    }

    fn associate_default_context(&self) {
        self.record(Call::Associate);
    }

    fn disassociate_context(&self) {
        self.record(Call::Disassociate);
    }

    fn create_caret(&self) -> bool {
        self.record(Call::CreateCaret);
        self.caret_available.get()
    }

    fn destroy_caret(&self) {
        self.record(Call::DestroyCaret);
    }

    fn set_caret_position(&self, position: Point) {
        self.record(Call::SetCaretPos(position));
    }
}
