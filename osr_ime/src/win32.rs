// SPDX-License-Identifier: GPL-3.0-or-later

//! IMM32 and User32 behind [`ImmBackend`].

use std::ffi::c_void;
use std::marker::PhantomData;

use log::{debug, warn};
use windows::Win32::Foundation::{HWND, LPARAM, POINT, RECT, WPARAM};
use windows::Win32::Globalization::HIMC;
use windows::Win32::UI::Input::Ime::{
    CANDIDATEFORM, CFS_CANDIDATEPOS, CFS_EXCLUDE, CPS_CANCEL, CPS_COMPLETE, GCS_COMPATTR,
    GCS_COMPCLAUSE, GCS_COMPSTR, GCS_CURSORPOS, GCS_RESULTSTR, IACE_DEFAULT,
    IME_COMPOSITION_STRING, ISC_SHOWUICOMPOSITIONWINDOW, ImmAssociateContextEx,
    ImmGetCompositionStringW, ImmGetContext, ImmNotifyIME, ImmReleaseContext,
    ImmSetCandidateWindow, NI_COMPOSITIONSTR,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{GetFocus, GetKeyboardLayoutNameW};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateCaret, DestroyCaret, SetCaretPos, WM_IME_COMPOSITION, WM_IME_ENDCOMPOSITION,
    WM_IME_SETCONTEXT, WM_IME_STARTCOMPOSITION, WM_INPUTLANGCHANGE, WM_KILLFOCUS, WM_SETFOCUS,
};
use windows_core::Result;

use crate::composition::{CompositionFlags, StringKind};
use crate::geometry::{Point, Rect};
use crate::imm::{CandidateForm, CompositionAction, ImmBackend, InputContext};
use crate::message::ImeMessage;

const KL_NAMELENGTH: usize = 9;

/// The input method manager of one window.
#[derive(Debug)]
pub struct Win32Imm {
    hwnd: HWND,
}

impl Win32Imm {
    pub fn new(hwnd: HWND) -> Win32Imm {
        Win32Imm { hwnd }
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }
}

/// An HIMC from ImmGetContext, released with ImmReleaseContext on drop.
pub struct ImcGuard<'a> {
    hwnd: HWND,
    himc: HIMC,
    _imm: PhantomData<&'a Win32Imm>,
}

impl Drop for ImcGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            if !ImmReleaseContext(self.hwnd, self.himc).as_bool() {
                warn!("ImmReleaseContext failed");
            }
        }
    }
}

impl ImcGuard<'_> {
    /// Size in bytes of a GCS_* buffer, excluding the terminating null.
    fn buffer_size(&self, index: IME_COMPOSITION_STRING) -> Option<usize> {
        let size = unsafe { ImmGetCompositionStringW(self.himc, index, None, 0) };
        usize::try_from(size).ok().filter(|&size| size > 0)
    }

    fn read_buffer<T: Copy + Default>(&self, index: IME_COMPOSITION_STRING) -> Option<Vec<T>> {
        let size = self.buffer_size(index)?;
        let mut buffer = vec![T::default(); size.div_ceil(size_of::<T>())];
        let byte_len = u32::try_from(buffer.len() * size_of::<T>()).ok()?;
        let read = unsafe {
            ImmGetCompositionStringW(
                self.himc,
                index,
                Some(buffer.as_mut_ptr().cast::<c_void>()),
                byte_len,
            )
        };
        let read = usize::try_from(read).ok().filter(|&read| read > 0)?;
        buffer.truncate(read / size_of::<T>());
        Some(buffer)
    }
}

impl InputContext for ImcGuard<'_> {
    fn string(&self, kind: StringKind) -> Option<String> {
        let index = match kind {
            StringKind::Composition => GCS_COMPSTR,
            StringKind::Result => GCS_RESULTSTR,
        };
        let buffer = self.read_buffer::<u16>(index)?;
        Some(String::from_utf16_lossy(&buffer))
    }

    fn attributes(&self) -> Option<Vec<u8>> {
        self.read_buffer::<u8>(GCS_COMPATTR)
    }

    fn clauses(&self) -> Option<Vec<u32>> {
        self.read_buffer::<u32>(GCS_COMPCLAUSE)
    }

    fn cursor_position(&self) -> i32 {
        unsafe { ImmGetCompositionStringW(self.himc, GCS_CURSORPOS, None, 0) }
    }

    fn notify_composition(&self, action: CompositionAction) {
        let index = match action {
            CompositionAction::Complete => CPS_COMPLETE,
            CompositionAction::Cancel => CPS_CANCEL,
        };
        unsafe {
            if !ImmNotifyIME(self.himc, NI_COMPOSITIONSTR, index, 0).as_bool() {
                debug!("ImmNotifyIME({action:?}) failed");
            }
        }
    }

    fn set_candidate_window(&self, form: CandidateForm) {
        let candidate_form = match form {
            CandidateForm::Position(position) => CANDIDATEFORM {
                dwIndex: 0,
                dwStyle: CFS_CANDIDATEPOS,
                ptCurrentPos: to_point(position),
                rcArea: RECT::default(),
            },
            CandidateForm::Exclude { position, area } => CANDIDATEFORM {
                dwIndex: 0,
                dwStyle: CFS_EXCLUDE,
                ptCurrentPos: to_point(position),
                rcArea: to_rect(area),
            },
        };
        unsafe {
            if !ImmSetCandidateWindow(self.himc, &candidate_form).as_bool() {
                debug!("ImmSetCandidateWindow({form:?}) failed");
            }
        }
    }
}

impl ImmBackend for Win32Imm {
    type Context<'a> = ImcGuard<'a>;

    fn has_focus(&self) -> bool {
        unsafe { GetFocus() == self.hwnd }
    }

    fn keyboard_layout_name(&self) -> Option<String> {
        active_layout_name()
            .inspect_err(|error| debug!("GetKeyboardLayoutNameW failed: {error}"))
            .ok()
    }

    fn input_context(&self) -> Option<ImcGuard<'_>> {
        let himc = unsafe { ImmGetContext(self.hwnd) };
        if himc.is_invalid() {
            return None;
        }
        Some(ImcGuard {
            hwnd: self.hwnd,
            himc,
            _imm: PhantomData,
        })
    }

    fn associate_default_context(&self) {
        unsafe {
            if !ImmAssociateContextEx(self.hwnd, HIMC::default(), IACE_DEFAULT).as_bool() {
                debug!("ImmAssociateContextEx(IACE_DEFAULT) failed");
            }
        }
    }

    fn disassociate_context(&self) {
        unsafe {
            if !ImmAssociateContextEx(self.hwnd, HIMC::default(), 0).as_bool() {
                debug!("ImmAssociateContextEx(0) failed");
            }
        }
    }

    fn create_caret(&self) -> bool {
        unsafe { CreateCaret(self.hwnd, None, 1, 1) }
            .inspect_err(|error| debug!("CreateCaret failed: {error}"))
            .is_ok()
    }

    fn destroy_caret(&self) {
        if let Err(error) = unsafe { DestroyCaret() } {
            debug!("DestroyCaret failed: {error}");
        }
    }

    fn set_caret_position(&self, position: Point) {
        if let Err(error) = unsafe { SetCaretPos(position.x, position.y) } {
            debug!("SetCaretPos failed: {error}");
        }
    }
}

fn active_layout_name() -> Result<String> {
    let mut klid = [0u16; KL_NAMELENGTH];
    unsafe { GetKeyboardLayoutNameW(&mut klid)? };
    let len = klid.iter().position(|&c| c == 0).unwrap_or(klid.len());
    Ok(String::from_utf16_lossy(&klid[..len]))
}

fn to_point(point: Point) -> POINT {
    POINT {
        x: point.x,
        y: point.y,
    }
}

fn to_rect(rect: Rect) -> RECT {
    RECT {
        left: rect.x,
        top: rect.y,
        right: rect.right(),
        bottom: rect.bottom(),
    }
}

/// Decodes the window messages the handler cares about.
pub fn decode_message(msg: u32, _wparam: WPARAM, lparam: LPARAM) -> Option<ImeMessage> {
    let message = match msg {
        WM_IME_SETCONTEXT => ImeMessage::SetContext,
        WM_IME_STARTCOMPOSITION => ImeMessage::StartComposition,
        WM_IME_COMPOSITION => {
            ImeMessage::Composition(CompositionFlags::from_bits_retain(lparam.0 as u32))
        }
        WM_IME_ENDCOMPOSITION => ImeMessage::EndComposition,
        WM_INPUTLANGCHANGE => ImeMessage::InputLanguageChanged,
        WM_SETFOCUS => ImeMessage::FocusGained,
        WM_KILLFOCUS => ImeMessage::FocusLost,
        _ => return None,
    };
    Some(message)
}

/// The lParam to pass on to DefWindowProc for WM_IME_SETCONTEXT. The host
/// draws the composition itself, the IME only shows its candidate window.
pub fn set_context_lparam(lparam: LPARAM) -> LPARAM {
    LPARAM(lparam.0 & !(ISC_SHOWUICOMPOSITIONWINDOW as isize))
}
