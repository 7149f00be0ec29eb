// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The supervisor terminates the real process.
//! Each scenario runs in a re-executed child process.

use lockdown::{ExitProcess, LogFacade, Security, SETUP_TIMEOUT_EXIT_CODE};
use std::{
    env,
    process::{Command, Stdio},
    sync::Arc,
    time::Duration,
};
use tokio::{runtime, time};

const CHILD_ENV: &str = "LOCKDOWN_TEST_SUPERVISOR_CHILD";

fn child(scenario: &str) {
    let rt = runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let mut sec = Security::with_timeout(
        Arc::new(LogFacade),
        Arc::new(ExitProcess),
        rt.handle(),
        Duration::from_millis(100),
    );
    match scenario {
        "timeout" => {
            rt.block_on(async { time::sleep(Duration::from_secs(10)).await });
            // Not reached. The supervisor exits first.
            std::process::exit(1);
        }
        "dropped" => {
            drop(sec);
            rt.block_on(async { time::sleep(Duration::from_secs(10)).await });
            std::process::exit(1);
        }
        "complete" => {
            sec.setup_complete();
            rt.block_on(async { time::sleep(Duration::from_millis(500)).await });
        }
        other => panic!("Unknown scenario {other}"),
    }
}

fn run(scenario: &str) -> Option<i32> {
    Command::new(env::current_exe().unwrap())
        .env(CHILD_ENV, scenario)
        .stdin(Stdio::null())
        .status()
        .unwrap()
        .code()
}

fn main() {
    if let Ok(scenario) = env::var(CHILD_ENV) {
        child(&scenario);
        return;
    }

    assert_eq!(run("timeout"), Some(SETUP_TIMEOUT_EXIT_CODE));
    assert_eq!(run("dropped"), Some(SETUP_TIMEOUT_EXIT_CODE));
    assert_eq!(run("complete"), Some(0));
}

// vim: ts=4 sw=4 expandtab
