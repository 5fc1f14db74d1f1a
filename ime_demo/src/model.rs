// SPDX-License-Identifier: GPL-3.0-or-later

use osr_ime::{Composition, CompositionSink, Range};

/// What the demo "renderer" shows: committed text followed by the active
/// composition.
#[derive(Debug, Default)]
pub(crate) struct TextModel {
    committed: String,
    composition: Option<Composition>,
    /// High surrogate from a WM_CHAR still waiting for its low half.
    pending_high_surrogate: Option<u16>,
}

impl TextModel {
    pub(crate) fn composition(&self) -> Option<&Composition> {
        self.composition.as_ref()
    }

    /// Takes one UTF-16 unit as WM_CHAR delivers it. Characters outside the
    /// BMP arrive as two messages, one per surrogate.
    pub(crate) fn insert_utf16(&mut self, unit: u16) {
        if (0xD800..=0xDBFF).contains(&unit) {
            self.pending_high_surrogate = Some(unit);
            return;
        }
        let pending = self.pending_high_surrogate.take();
        for ch in char::decode_utf16(pending.into_iter().chain([unit])).filter_map(Result::ok) {
            self.insert_char(ch);
        }
    }

    pub(crate) fn insert_char(&mut self, ch: char) {
        match ch {
            '\u{8}' => {
                self.committed.pop();
            }
            '\r' => self.committed.push('\n'),
            ch if ch.is_control() => {}
            ch => self.committed.push(ch),
        }
    }

    /// The last line of text as UTF-16, the unit composition offsets use.
    ///
    /// Only the last line is drawn, so it is also what offsets are measured
    /// against.
    pub(crate) fn display_units(&self) -> Vec<u16> {
        let line = self.committed.rsplit('\n').next().unwrap_or_default();
        let mut units: Vec<u16> = line.encode_utf16().collect();
        if let Some(composition) = &self.composition {
            units.extend(composition.text.encode_utf16());
        }
        units
    }

    /// Where the composition sits inside [`TextModel::display_units`].
    pub(crate) fn composition_range(&self) -> Option<Range> {
        let composition = self.composition.as_ref()?;
        let line = self.committed.rsplit('\n').next().unwrap_or_default();
        let from = u32::try_from(line.encode_utf16().count()).ok()?;
        Some(Range::new(from, from.saturating_add(composition.utf16_len())))
    }
}

impl CompositionSink for TextModel {
    fn set_composition(&mut self, composition: &Composition) {
        self.composition = Some(composition.clone());
    }

    fn commit_text(&mut self, text: &str) {
        self.committed.push_str(text);
        self.composition = None;
    }

    fn cancel_composition(&mut self) {
        self.composition = None;
    }
}
