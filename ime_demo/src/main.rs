// SPDX-License-Identifier: GPL-3.0-or-later

//! A window that plays the off-screen renderer for `osr_ime`: it draws the
//! composition itself and reports character bounds back to the handler.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::Result;

#[cfg(windows)]
mod logging;
#[cfg(any(windows, test))]
mod model;
#[cfg(windows)]
mod window;

#[cfg(windows)]
fn main() -> Result<()> {
    let _logger = logging::init_logger()?;
    window::run()
}

#[cfg(not(windows))]
fn main() -> Result<()> {
    anyhow::bail!("ime_demo needs the Windows input method manager")
}
