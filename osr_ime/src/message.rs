// SPDX-License-Identifier: GPL-3.0-or-later

//! Routes IME window messages through the handler to the renderer.

use log::debug;

use crate::composition::{Composition, CompositionFlags};
use crate::handler::ImeHandler;
use crate::imm::ImmBackend;

/// IME related window messages, already decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImeMessage {
    /// WM_IME_SETCONTEXT
    SetContext,
    /// WM_IME_STARTCOMPOSITION
    StartComposition,
    /// WM_IME_COMPOSITION
    Composition(CompositionFlags),
    /// WM_IME_ENDCOMPOSITION
    EndComposition,
    /// WM_INPUTLANGCHANGE
    InputLanguageChanged,
    /// WM_SETFOCUS
    FocusGained,
    /// WM_KILLFOCUS
    FocusLost,
}

/// The renderer side of the composition.
pub trait CompositionSink {
    fn set_composition(&mut self, composition: &Composition);
    fn commit_text(&mut self, text: &str);
    fn cancel_composition(&mut self);
}

impl<B: ImmBackend> ImeHandler<B> {
    pub fn handle_message(&mut self, message: ImeMessage, sink: &mut impl CompositionSink) {
        match message {
            ImeMessage::SetContext => {
                self.create_ime_window();
                self.move_ime_window();
            }
            ImeMessage::StartComposition => {
                self.create_ime_window();
                self.move_ime_window();
                self.reset_composition();
            }
            ImeMessage::Composition(flags) => self.on_composition(flags, sink),
            ImeMessage::EndComposition => self.on_cancel_composition(sink),
            ImeMessage::InputLanguageChanged | ImeMessage::FocusGained => {
                self.set_input_language();
            }
            ImeMessage::FocusLost => {
                self.cleanup_composition();
                self.destroy_ime_window();
            }
        }
    }

    fn on_composition(&mut self, flags: CompositionFlags, sink: &mut impl CompositionSink) {
        if let Some(text) = self.get_result(flags) {
            debug!("commit {} UTF-16 units", text.encode_utf16().count());
            sink.commit_text(&text);
            self.reset_composition();
            // Japanese IMEs send GCS_RESULTSTR and GCS_COMPSTR together; keep
            // reading.
        }
        match self.get_composition(flags) {
            Some(composition) => {
                sink.set_composition(&composition);
                // The caret sits right after the character it follows. The
                // cursor index is absolute in the host text.
                let caret = composition
                    .start
                    .checked_sub(1)
                    .map(|offset| self.composition_range().from.saturating_add(offset));
                self.set_cursor_index(caret);
            }
            None => self.on_cancel_composition(sink),
        }
    }

    fn on_cancel_composition(&mut self, sink: &mut impl CompositionSink) {
        sink.cancel_composition();
        self.reset_composition();
        self.destroy_ime_window();
    }
}

#[cfg(test)]
mod tests {
    use super::{CompositionSink, ImeMessage};
    use crate::composition::{ATTR_INPUT, Composition, CompositionFlags};
    use crate::geometry::{Point, Range, Rect};
    use crate::handler::ImeHandler;
    use crate::imm::{CandidateForm, CompositionAction};
    use crate::testing::{Call, MockImm};

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Set(String, Range),
        Commit(String),
        Cancel,
    }

    #[derive(Default)]
    struct RecordingSink(Vec<Event>);

    impl CompositionSink for RecordingSink {
        fn set_composition(&mut self, composition: &Composition) {
            self.0
                .push(Event::Set(composition.text.clone(), composition.selection()));
        }
        fn commit_text(&mut self, text: &str) {
            self.0.push(Event::Commit(text.to_string()));
        }
        fn cancel_composition(&mut self) {
            self.0.push(Event::Cancel);
        }
    }

    fn japanese() -> ImeHandler<MockImm> {
        let imm = MockImm::default();
        imm.set_layout(Some("00000411"));
        let mut handler = ImeHandler::new(imm);
        handler.handle_message(ImeMessage::InputLanguageChanged, &mut RecordingSink::default());
        handler
    }

    #[test]
    fn start_composition_creates_caret_and_resets() {
        let mut handler = japanese();
        let mut sink = RecordingSink::default();
        handler.handle_message(ImeMessage::StartComposition, &mut sink);
        assert!(handler.has_system_caret());
        assert!(!handler.is_composing());
        assert_eq!(None, handler.cursor_index());
        assert!(sink.0.is_empty());
    }

    #[test]
    fn composition_update() {
        let mut handler = japanese();
        let mut sink = RecordingSink::default();
        handler.change_composition_range(
            Range::new(0, 3),
            (0..3).map(|i| Rect::new(i * 12, 40, 12, 18)).collect(),
        );
        let imm = handler.backend();
        imm.set_composition_string(Some("にほん"));
        imm.set_attributes(Some(vec![ATTR_INPUT; 3]));
        imm.set_cursor_position(3);
        imm.take_calls();

        handler.handle_message(
            ImeMessage::Composition(
                CompositionFlags::COMPSTR
                    | CompositionFlags::COMPATTR
                    | CompositionFlags::CURSORPOS,
            ),
            &mut sink,
        );
        assert_eq!(vec![Event::Set("にほん".into(), Range::new(3, 6))], sink.0);
        assert!(handler.is_composing());
        assert_eq!(Some(2), handler.cursor_index());
        let calls = handler.backend().take_calls();
        assert!(calls.contains(&Call::SetCandidateWindow(CandidateForm::exclude(
            Rect::new(24, 40, 12, 18)
        ))));
    }

    #[test]
    fn caret_is_absolute_in_text() {
        let mut handler = japanese();
        let mut sink = RecordingSink::default();
        handler.change_composition_range(
            Range::new(2, 6),
            (0..4).map(|i| Rect::new(i * 10, 40, 10, 18)).collect(),
        );
        let imm = handler.backend();
        imm.set_composition_string(Some("にほんご"));
        imm.set_cursor_position(4);
        imm.take_calls();

        handler.handle_message(
            ImeMessage::Composition(CompositionFlags::COMPSTR | CompositionFlags::CURSORPOS),
            &mut sink,
        );
        assert_eq!(Some(5), handler.cursor_index());
        assert_eq!(Some(Rect::new(30, 40, 10, 18)), handler.caret_rect());
        let calls = handler.backend().take_calls();
        assert!(calls.contains(&Call::SetCandidateWindow(CandidateForm::exclude(
            Rect::new(30, 40, 10, 18)
        ))));
    }

    #[test]
    fn caret_at_start_uses_range_start() {
        let mut handler = japanese();
        let mut sink = RecordingSink::default();
        handler.update_caret_position(7);
        handler.backend().set_composition_string(Some("a"));
        handler.handle_message(ImeMessage::Composition(CompositionFlags::COMPSTR), &mut sink);
        assert_eq!(None, handler.cursor_index());
    }

    #[test]
    fn result_and_composition_together() {
        let mut handler = japanese();
        let mut sink = RecordingSink::default();
        let imm = handler.backend();
        imm.set_result_string(Some("日本"));
        imm.set_composition_string(Some("ご"));

        handler.handle_message(
            ImeMessage::Composition(CompositionFlags::RESULTSTR | CompositionFlags::COMPSTR),
            &mut sink,
        );
        assert_eq!(
            vec![
                Event::Commit("日本".into()),
                Event::Set("ご".into(), Range::new(0, 1)),
            ],
            sink.0
        );
        assert!(handler.is_composing());
    }

    #[test]
    fn result_only_cancels_composition() {
        let mut handler = japanese();
        let mut sink = RecordingSink::default();
        handler.handle_message(ImeMessage::StartComposition, &mut sink);
        handler.backend().set_result_string(Some("日本語"));

        handler.handle_message(ImeMessage::Composition(CompositionFlags::RESULTSTR), &mut sink);
        assert_eq!(vec![Event::Commit("日本語".into()), Event::Cancel], sink.0);
        assert!(!handler.is_composing());
        assert!(!handler.has_system_caret());
        assert!(handler.backend().contexts_balanced());
    }

    #[test]
    fn end_composition() {
        let mut handler = japanese();
        let mut sink = RecordingSink::default();
        handler.handle_message(ImeMessage::StartComposition, &mut sink);
        handler.backend().set_composition_string(Some("a"));
        handler.handle_message(ImeMessage::Composition(CompositionFlags::COMPSTR), &mut sink);
        handler.handle_message(ImeMessage::EndComposition, &mut sink);
        assert_eq!(Some(&Event::Cancel), sink.0.last());
        assert!(!handler.is_composing());
        assert!(!handler.has_system_caret());
    }

    #[test]
    fn focus_loss_completes_composition() {
        let mut handler = japanese();
        let mut sink = RecordingSink::default();
        handler.handle_message(ImeMessage::StartComposition, &mut sink);
        handler.backend().set_composition_string(Some("ab"));
        handler.handle_message(ImeMessage::Composition(CompositionFlags::COMPSTR), &mut sink);
        handler.backend().take_calls();

        handler.handle_message(ImeMessage::FocusLost, &mut sink);
        assert_eq!(
            vec![
                Call::AcquireContext,
                Call::Notify(CompositionAction::Complete),
                Call::ReleaseContext,
                Call::DestroyCaret,
            ],
            handler.backend().take_calls()
        );
        assert!(!handler.is_composing());
    }

    #[test]
    fn set_context_moves_caret() {
        let mut handler = japanese();
        handler.change_composition_range(Range::new(0, 1), vec![Rect::new(5, 6, 7, 8)]);
        handler.backend().take_calls();
        handler.handle_message(ImeMessage::SetContext, &mut RecordingSink::default());
        let calls = handler.backend().take_calls();
        assert_eq!(Call::CreateCaret, calls[0]);
        assert!(calls.contains(&Call::SetCaretPos(Point::new(5, 14))));
    }
}
