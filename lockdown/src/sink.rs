// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Destination of the messages emitted during setup.
pub trait LogSink: Send + Sync {
    fn info(&self, msg: &str);
    fn critical(&self, msg: &str);
}

/// Forwards to the [log] facade.
///
/// Critical messages are logged at error level with the target
/// `lockdown::critical`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogFacade;

impl LogSink for LogFacade {
    fn info(&self, msg: &str) {
        log::info!("{msg}");
    }

    fn critical(&self, msg: &str) {
        log::error!(target: "lockdown::critical", "{msg}");
    }
}

// vim: ts=4 sw=4 expandtab
