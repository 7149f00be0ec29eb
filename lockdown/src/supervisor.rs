// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Setup supervision.
//!
//! A [Security] handle is created at startup. If the daemon does not
//! declare its setup complete before the deadline, the process is
//! terminated with [SETUP_TIMEOUT_EXIT_CODE]. A daemon that never
//! reaches its privilege reduction code thus crashes instead of
//! running with full privileges.

use crate::sink::LogSink;
use std::{sync::Arc, time::Duration};
use tokio::{runtime::Handle, task::JoinHandle, time};

/// Exit code of a process that did not complete its setup in time.
pub const SETUP_TIMEOUT_EXIT_CODE: i32 = 232;

/// Default deadline for [Security::setup_complete].
pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(20);

/// Process termination.
pub trait ProcessControl: Send + Sync {
    fn exit(&self, code: i32);
}

/// Terminates the real process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExitProcess;

impl ProcessControl for ExitProcess {
    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

/// Setup supervisor handle.
///
/// Dropping the handle does not dismiss the supervisor.
/// Only [Security::setup_complete] does.
#[must_use = "the process is terminated unless setup_complete() is called"]
pub struct Security {
    setup_complete: bool,
    log: Arc<dyn LogSink>,
    watchdog: Option<JoinHandle<()>>,
}

impl Security {
    /// Arm the supervisor with the [DEFAULT_SETUP_TIMEOUT].
    pub fn new(log: Arc<dyn LogSink>, ctl: Arc<dyn ProcessControl>, scheduler: &Handle) -> Self {
        Self::with_timeout(log, ctl, scheduler, DEFAULT_SETUP_TIMEOUT)
    }

    /// Arm the supervisor with an explicit deadline.
    pub fn with_timeout(
        log: Arc<dyn LogSink>,
        ctl: Arc<dyn ProcessControl>,
        scheduler: &Handle,
        timeout: Duration,
    ) -> Self {
        let watchdog_log = Arc::clone(&log);
        let watchdog = scheduler.spawn(async move {
            time::sleep(timeout).await;
            watchdog_log.critical("Security::setup_complete() not called in time, exiting");
            ctl.exit(SETUP_TIMEOUT_EXIT_CODE);
        });
        log::debug!("Setup supervisor armed with a deadline of {timeout:?}");
        Self {
            setup_complete: false,
            log,
            watchdog: Some(watchdog),
        }
    }

    /// Declare the setup complete and dismiss the supervisor.
    ///
    /// Further calls have no effect.
    pub fn setup_complete(&mut self) {
        if self.setup_complete {
            return;
        }
        self.setup_complete = true;
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
        self.log.info("Setup complete");
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete
    }
}


// vim: ts=4 sw=4 expandtab
