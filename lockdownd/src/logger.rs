// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal [log] backend writing to stderr.
//!
//! Writing to stderr needs no new file descriptor,
//! so logging keeps working after all reductions.

use anyhow::{self as ah, format_err as err};
use log::{Level, LevelFilter, Log, Metadata, Record};

const CRITICAL_TARGET: &str = "lockdown::critical";

struct StderrLogger;

fn tag(record: &Record) -> &'static str {
    if record.target() == CRITICAL_TARGET {
        return "CRITICAL";
    }
    match record.level() {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("lockdownd {}: {}", tag(record), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// Install the stderr logger.
pub fn init(debug: bool) -> ah::Result<()> {
    log::set_logger(&LOGGER).map_err(|e| err!("Install logger: {e}"))?;
    log::set_max_level(if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    Ok(())
}


// vim: ts=4 sw=4 expandtab
