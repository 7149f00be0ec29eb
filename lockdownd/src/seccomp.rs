// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use lockdown::{SeccompAction as Action, SeccompAllow as Allow, SeccompSandbox};
use lockdown_conf::Seccomp;

/// Everything the status service needs after setup and on shutdown.
const ALLOW_LIST: [Allow; 11] = [
    Allow::Mmap,
    Allow::Mprotect,
    // Permissions probe: effective UID.
    Allow::GetUidGid,
    // Permissions probe: stdin duplication (F_DUPFD_CLOEXEC).
    // Runtime shutdown uses further fcntl commands.
    Allow::Fcntl { op: None },
    // Permissions probe: seccomp mode.
    Allow::Prctl,
    Allow::Read,
    Allow::Write,
    Allow::Recv,
    Allow::Send,
    Allow::Signal,
    Allow::Futex,
];

/// The sandbox for the configured `seccomp` mode.
///
/// The sandbox is also used for probing if seccomp is off.
pub fn sandbox(seccomp: Seccomp) -> SeccompSandbox {
    let action = match seccomp {
        Seccomp::Kill => Action::Kill,
        Seccomp::Log | Seccomp::Off => Action::Log,
    };
    SeccompSandbox::new(&ALLOW_LIST, action)
}


// vim: ts=4 sw=4 expandtab
