// SPDX-License-Identifier: GPL-3.0-or-later

//! IME composition handling for windows that host an off-screen rendered
//! browser.
//!
//! The renderer draws the composition itself, so the window has to read the
//! composition from IMM32, pass it on with its underlines, and keep the IME
//! candidate window next to the caret the renderer reports back.

pub mod composition;
pub mod geometry;
pub mod handler;
pub mod imm;
pub mod language;
pub mod message;
#[cfg(windows)]
pub mod win32;

#[cfg(test)]
mod testing;

pub use composition::{Composition, CompositionFlags, CompositionUnderline};
pub use geometry::{Point, Range, Rect};
pub use handler::ImeHandler;
pub use imm::{ImmBackend, InputContext};
pub use language::LangId;
pub use message::{CompositionSink, ImeMessage};
