// SPDX-License-Identifier: GPL-3.0-or-later

//! Composition data as the renderer consumes it, and the conversion from the
//! raw IMM32 attribute and clause buffers.

use crate::geometry::Range;

/// Black, same as Blink.
pub const UNDERLINE_COLOR: u32 = 0xFF00_0000;
/// Transparent.
pub const UNDERLINE_BACKGROUND_COLOR: u32 = 0x0000_0000;

pub const ATTR_INPUT: u8 = 0x00;
pub const ATTR_TARGET_CONVERTED: u8 = 0x01;
pub const ATTR_CONVERTED: u8 = 0x02;
pub const ATTR_TARGET_NOTCONVERTED: u8 = 0x03;

bitflags::bitflags! {
    /// The lParam of WM_IME_COMPOSITION: which parts of the composition
    /// changed. Bit values are the IMM32 GCS_* and CS_* constants.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompositionFlags: u32 {
        const COMPSTR = 0x0008;
        const COMPATTR = 0x0010;
        const COMPCLAUSE = 0x0020;
        const CURSORPOS = 0x0080;
        const RESULTSTR = 0x0800;
        const NOMOVECARET = 0x4000;
    }
}

/// Which string to read from the input context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Composition,
    Result,
}

impl StringKind {
    pub const fn flag(self) -> CompositionFlags {
        match self {
            StringKind::Composition => CompositionFlags::COMPSTR,
            StringKind::Result => CompositionFlags::RESULTSTR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionUnderline {
    pub range: Range,
    pub color: u32,
    pub background_color: u32,
    pub thick: bool,
}

impl CompositionUnderline {
    pub const fn new(from: u32, to: u32, thick: bool) -> CompositionUnderline {
        CompositionUnderline {
            range: Range::new(from, to),
            color: UNDERLINE_COLOR,
            background_color: UNDERLINE_BACKGROUND_COLOR,
            thick,
        }
    }
}

/// An ongoing composition ready to hand to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub text: String,
    pub underlines: Vec<CompositionUnderline>,
    /// Caret offset within `text`.
    pub start: u32,
}

impl Composition {
    /// Length in UTF-16 code units, the unit IMM32 offsets are expressed in.
    pub fn utf16_len(&self) -> u32 {
        utf16_len(&self.text)
    }

    /// IMM32 has no non-empty selection inside a composition; the renderer
    /// gets the caret followed by the text length.
    pub fn selection(&self) -> Range {
        Range::new(self.start, self.start.saturating_add(self.utf16_len()))
    }
}

pub(crate) fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count().try_into().unwrap_or(u32::MAX)
}

fn is_target_attribute(attribute: u8) -> bool {
    attribute == ATTR_TARGET_CONVERTED || attribute == ATTR_TARGET_NOTCONVERTED
}

/// Finds the clause the user selected for conversion.
///
/// Returns `(start, end)`; both equal the stream length when nothing is
/// selected.
pub fn target_range(attributes: &[u8]) -> (u32, u32) {
    let start = attributes
        .iter()
        .position(|&attr| is_target_attribute(attr))
        .unwrap_or(attributes.len());
    let end = attributes[start..]
        .iter()
        .position(|&attr| !is_target_attribute(attr))
        .map_or(attributes.len(), |n| start + n);
    (
        start.try_into().unwrap_or(u32::MAX),
        end.try_into().unwrap_or(u32::MAX),
    )
}

/// One underline per adjacent pair of clause offsets; clauses inside the
/// target range get a thick underline.
pub fn clause_underlines(
    clauses: &[u32],
    target_start: u32,
    target_end: u32,
) -> Vec<CompositionUnderline> {
    clauses
        .windows(2)
        .map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            let thick = from >= target_start && to <= target_end;
            CompositionUnderline::new(from, to, thick)
        })
        .collect()
}

/// Underlines used when the IME reports no clause information.
pub fn default_underlines(
    length: u32,
    target_start: u32,
    target_end: u32,
) -> Vec<CompositionUnderline> {
    let mut underlines = Vec::with_capacity(3);
    if target_start > 0 {
        underlines.push(CompositionUnderline::new(0, target_start, false));
    }
    if target_end > target_start {
        underlines.push(CompositionUnderline::new(target_start, target_end, true));
    }
    if target_end < length {
        underlines.push(CompositionUnderline::new(target_end, length, false));
    }
    underlines
}

/// Caret offset for a composition update.
///
/// `cursor_pos` is only consulted when the flags carry GCS_CURSORPOS and do
/// not carry CS_NOMOVECARET.
pub fn composition_start(flags: CompositionFlags, cursor_pos: impl FnOnce() -> i32) -> u32 {
    if !flags.contains(CompositionFlags::NOMOVECARET)
        && flags.contains(CompositionFlags::CURSORPOS)
    {
        u32::try_from(cursor_pos()).unwrap_or(0)
    } else {
        0
    }
}

/// Builds the composition from the pieces of an update.
///
/// `attributes` and `clauses` are `None` when the flags don't carry them or
/// the IME returned nothing.
pub fn build_composition(
    text: String,
    start: u32,
    attributes: Option<&[u8]>,
    clauses: Option<&[u32]>,
) -> Composition {
    let length = utf16_len(&text);
    let (target_start, target_end) = match attributes {
        Some(attributes) if !attributes.is_empty() => target_range(attributes),
        _ => (length, length),
    };
    let mut underlines = clauses
        .map(|clauses| clause_underlines(clauses, target_start, target_end))
        .unwrap_or_default();
    if underlines.is_empty() {
        underlines = default_underlines(length, target_start, target_end);
    }
    Composition {
        text,
        underlines,
        start,
    }
}
