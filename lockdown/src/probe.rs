// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{host::Host, reduce::can_open_files, sandbox::Sandbox};

/// Observed privilege state of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Permissions {
    /// New file descriptors are refused.
    pub no_open_files: bool,
    /// The kernel offers a syscall filter facility.
    pub seccomp_exists: bool,
    /// A syscall filter is enforced on this process.
    pub seccomp_enforcing: bool,
    /// Effective UID.
    pub uid: u32,
}

impl std::fmt::Display for Permissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "no_open_files={} seccomp_exists={} seccomp_enforcing={} uid={}",
            self.no_open_files, self.seccomp_exists, self.seccomp_enforcing, self.uid
        )
    }
}

/// Take a snapshot of the current privilege state.
///
/// This only reads state and may be called at any time.
pub fn check_permissions(host: &dyn Host, sandbox: &dyn Sandbox) -> Permissions {
    Permissions {
        no_open_files: !can_open_files(host),
        seccomp_exists: sandbox.exists(),
        seccomp_enforcing: sandbox.is_working(),
        uid: host.effective_uid(),
    }
}


// vim: ts=4 sw=4 expandtab
