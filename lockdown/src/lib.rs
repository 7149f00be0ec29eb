// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Privilege reduction for network daemons.
//!
//! A daemon usually starts as root to bind its sockets.
//! This crate reduces such a process to the authority it needs
//! for normal operation and verifies that each reduction took effect:
//!
//! - [drop_to_user] switches the user and group identity,
//!   optionally keeping `CAP_NET_ADMIN` ([NetAdminStash]).
//! - [forbid_new_files] and [forbid_new_processes] lower the
//!   corresponding resource limits to zero.
//! - [jail] confines the filesystem view with `chroot(2)`.
//! - [install_syscall_filter] installs a seccomp filter.
//!
//! [ReductionRequest::apply] runs all of them in a safe order.
//! [check_permissions] reports the resulting state and
//! [Security] terminates the process if the setup is never completed.

#[cfg(not(any(target_os = "linux", target_os = "android")))]
std::compile_error!("lockdown does not support non-Linux platforms.");

mod capability;
mod error;
mod host;
mod probe;
mod reduce;
mod request;
mod sandbox;
mod sink;
mod supervisor;
#[cfg(test)]
mod testing;
mod user;

pub use crate::{
    capability::{CapabilityStash, NetAdminStash},
    error::{FailureKind, ReduceError},
    host::{Host, Limit, SystemHost},
    probe::{check_permissions, Permissions},
    reduce::{drop_to_user, forbid_new_files, forbid_new_processes, install_syscall_filter, jail},
    request::{ReductionRequest, TargetUser},
    sandbox::{Sandbox, SeccompSandbox},
    sink::{LogFacade, LogSink},
    supervisor::{
        ExitProcess, ProcessControl, Security, DEFAULT_SETUP_TIMEOUT, SETUP_TIMEOUT_EXIT_CODE,
    },
    user::{lookup_group, lookup_user, LookupStatus, UserRecord},
};

/// Re-export of the filter building blocks used by [SeccompSandbox].
pub use lockdown_seccomp::{Action as SeccompAction, Allow as SeccompAllow};

// vim: ts=4 sw=4 expandtab
