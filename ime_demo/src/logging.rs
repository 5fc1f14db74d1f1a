// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::Result;

use anyhow::Context;
use flexi_logger::{Logger, LoggerHandle, WriteMode, writers::LogWriter};
use log::Log;

/// Forwards records to the debugger output, readable with DebugView.
pub(crate) struct WinDbgLogWriter;

impl LogWriter for WinDbgLogWriter {
    fn write(&self, _now: &mut flexi_logger::DeferredNow, record: &log::Record) -> Result<()> {
        win_dbg_logger::DEBUGGER_LOGGER.log(record);
        Ok(())
    }
    fn flush(&self) -> Result<()> {
        win_dbg_logger::DEBUGGER_LOGGER.flush();
        Ok(())
    }
}

/// Starts logging at `info`, or at the level `RUST_LOG` asks for.
pub(crate) fn init_logger() -> anyhow::Result<LoggerHandle> {
    Logger::try_with_env_or_str("info")
        .and_then(|logger| {
            logger
                .log_to_writer(Box::new(WinDbgLogWriter))
                .write_mode(WriteMode::Direct)
                .start()
        })
        .context("failed to start logger")
}
