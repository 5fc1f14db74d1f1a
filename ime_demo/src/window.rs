// SPDX-License-Identifier: GPL-3.0-or-later

use std::cell::RefCell;

use anyhow::{Context, Result, bail};
use log::{debug, info};
use osr_ime::win32::{Win32Imm, decode_message, set_context_lparam};
use osr_ime::{ImeHandler, ImeMessage, Range, Rect};
use windows::Win32::Foundation::{COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, SIZE, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CreatePen, DEFAULT_GUI_FONT, DeleteObject, EndPaint, GetDC, GetStockObject,
    GetTextExtentPoint32W, HDC, InvalidateRect, LineTo, MoveToEx, PAINTSTRUCT, PS_SOLID,
    ReleaseDC, SelectObject, TextOutW,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, CreateWindowExW, DefWindowProcW, DispatchMessageW,
    GetMessageW, IDC_IBEAM, LoadCursorW, MSG, PostQuitMessage, RegisterClassExW, SW_SHOW,
    ShowWindow, TranslateMessage, WINDOW_EX_STYLE, WM_CHAR, WM_DESTROY, WM_IME_COMPOSITION,
    WM_IME_SETCONTEXT, WM_IME_STARTCOMPOSITION, WM_PAINT, WNDCLASSEXW, WS_OVERLAPPEDWINDOW,
};
use windows_core::{PCWSTR, w};

use crate::model::TextModel;

const CLASS_NAME: PCWSTR = w!("OsrImeDemoWindow");
const MARGIN: i32 = 16;

struct Demo {
    handler: ImeHandler<Win32Imm>,
    model: TextModel,
}

thread_local! {
    static DEMO: RefCell<Option<Demo>> = const { RefCell::new(None) };
}

impl Demo {
    fn new(hwnd: HWND) -> Demo {
        let mut handler = ImeHandler::new(Win32Imm::new(hwnd));
        handler.set_input_language();
        handler.enable_ime();
        Demo {
            handler,
            model: TextModel::default(),
        }
    }

    fn hwnd(&self) -> HWND {
        self.handler.backend().hwnd()
    }

    fn on_ime_message(&mut self, message: ImeMessage) {
        self.handler.handle_message(message, &mut self.model);
        if let ImeMessage::Composition(_) | ImeMessage::EndComposition = message {
            self.report_bounds();
            invalidate(self.hwnd());
        }
    }

    fn on_char(&mut self, unit: u16) {
        self.model.insert_utf16(unit);
        invalidate(self.hwnd());
    }

    /// Plays the renderer's part: tell the handler where each composing
    /// character was laid out.
    fn report_bounds(&mut self) {
        let Some(range) = self.model.composition_range() else {
            return;
        };
        let hwnd = self.hwnd();
        let units = self.model.display_units();
        let bounds = with_dc(hwnd, |hdc| character_bounds(hdc, &units, range));
        debug!("composition {range:?}, {} rects", bounds.len());
        self.handler.change_composition_range(range, bounds);
    }

    fn paint(&self, hdc: HDC) {
        let units = self.model.display_units();
        unsafe {
            SelectObject(hdc, GetStockObject(DEFAULT_GUI_FONT));
            let _ = TextOutW(hdc, MARGIN, MARGIN, &units);
        }
        let (Some(composition), Some(range)) =
            (self.model.composition(), self.model.composition_range())
        else {
            return;
        };
        let bounds = character_bounds(hdc, &units, range);
        for underline in &composition.underlines {
            let first = bounds.get(underline.range.from as usize);
            let last = underline
                .range
                .to
                .checked_sub(1)
                .and_then(|i| bounds.get(i as usize));
            let (Some(first), Some(last)) = (first, last) else {
                continue;
            };
            let width = if underline.thick { 2 } else { 1 };
            let y = first.bottom() - width;
            unsafe {
                let pen = CreatePen(PS_SOLID, width, COLORREF(underline.color & 0x00FF_FFFF));
                let previous = SelectObject(hdc, pen.into());
                let _ = MoveToEx(hdc, first.x + 1, y, None);
                let _ = LineTo(hdc, last.right() - 1, y);
                SelectObject(hdc, previous);
                let _ = DeleteObject(pen.into());
            }
        }
    }
}

/// One rectangle per UTF-16 unit of `range`, in client coordinates.
fn character_bounds(hdc: HDC, units: &[u16], range: Range) -> Vec<Rect> {
    let extent = |end: usize| {
        let mut size = SIZE::default();
        let end = end.min(units.len());
        unsafe {
            SelectObject(hdc, GetStockObject(DEFAULT_GUI_FONT));
            let _ = GetTextExtentPoint32W(hdc, &units[..end], &mut size);
        }
        size
    };
    (range.from..range.to)
        .map(|i| {
            let before = extent(i as usize);
            let after = extent(i as usize + 1);
            Rect::new(
                MARGIN + before.cx,
                MARGIN,
                after.cx - before.cx,
                after.cy.max(before.cy),
            )
        })
        .collect()
}

fn with_dc<T>(hwnd: HWND, f: impl FnOnce(HDC) -> T) -> T {
    unsafe {
        let hdc = GetDC(Some(hwnd));
        let result = f(hdc);
        ReleaseDC(Some(hwnd), hdc);
        result
    }
}

fn invalidate(hwnd: HWND) {
    unsafe {
        let _ = InvalidateRect(Some(hwnd), None, true);
    }
}

/// Runs `f` on the demo state unless it is already borrowed further up the
/// stack, which happens when IMM32 sends messages synchronously.
fn with_demo<T>(f: impl FnOnce(&mut Demo) -> T) -> Option<T> {
    DEMO.with(|cell| {
        let mut demo = cell.try_borrow_mut().ok()?;
        demo.as_mut().map(f)
    })
}

unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_PAINT => {
            let mut ps = PAINTSTRUCT::default();
            let hdc = unsafe { BeginPaint(hwnd, &mut ps) };
            with_demo(|demo| demo.paint(hdc));
            let _ = unsafe { EndPaint(hwnd, &ps) };
            return LRESULT(0);
        }
        WM_CHAR => {
            with_demo(|demo| demo.on_char(wparam.0 as u16));
            return LRESULT(0);
        }
        WM_DESTROY => {
            if let Some(mut demo) = DEMO.with_borrow_mut(Option::take) {
                demo.handler.disable_ime();
            }
            unsafe { PostQuitMessage(0) };
            return LRESULT(0);
        }
        _ => {}
    }
    if let Some(message) = decode_message(msg, wparam, lparam) {
        let handled = with_demo(|demo| demo.on_ime_message(message)).is_some();
        match msg {
            WM_IME_SETCONTEXT => {
                return unsafe { DefWindowProcW(hwnd, msg, wparam, set_context_lparam(lparam)) };
            }
            // The composition is drawn here and the result already committed.
            WM_IME_STARTCOMPOSITION | WM_IME_COMPOSITION if handled => return LRESULT(0),
            _ => {}
        }
    }
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

fn register_class(hinstance: HINSTANCE) -> Result<()> {
    let wc = WNDCLASSEXW {
        cbSize: size_of::<WNDCLASSEXW>() as u32,
        style: CS_HREDRAW | CS_VREDRAW,
        lpfnWndProc: Some(wnd_proc),
        hInstance: hinstance,
        hCursor: unsafe { LoadCursorW(None, IDC_IBEAM) }.context("failed to load cursor")?,
        lpszClassName: CLASS_NAME,
        ..Default::default()
    };
    if unsafe { RegisterClassExW(&wc) } == 0 {
        bail!("failed to register window class");
    }
    Ok(())
}

pub(crate) fn run() -> Result<()> {
    let hinstance: HINSTANCE = unsafe { GetModuleHandleW(None) }
        .context("failed to get module handle")?
        .into();
    register_class(hinstance)?;
    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            CLASS_NAME,
            w!("IME composition demo"),
            WS_OVERLAPPEDWINDOW,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            640,
            200,
            None,
            None,
            Some(hinstance),
            None,
        )
    }
    .context("failed to create window")?;
    DEMO.with_borrow_mut(|demo| *demo = Some(Demo::new(hwnd)));
    info!("demo window created");

    unsafe {
        let _ = ShowWindow(hwnd, SW_SHOW);
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
    Ok(())
}
