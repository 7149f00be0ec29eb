// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The process-wide operating system state touched by the reducers.
//!
//! Every call returns its own [Errno] so that callers never have to
//! consult a shared error state after the fact.

use nix::{
    errno::Errno,
    sys::resource::{setrlimit, Resource},
    unistd::{self, getegid, geteuid, Gid, Uid},
};
use std::{io, os::fd::AsFd as _, path::Path};

/// Resource limit that can be lowered to zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Limit {
    /// Number of open file descriptors (`RLIMIT_NOFILE`).
    OpenFiles,
    /// Number of processes of the real user (`RLIMIT_NPROC`).
    Processes,
}

impl Limit {
    fn resource(self) -> Resource {
        match self {
            Self::OpenFiles => Resource::RLIMIT_NOFILE,
            Self::Processes => Resource::RLIMIT_NPROC,
        }
    }
}

/// Identity, resource limit and filesystem root operations of the process.
pub trait Host {
    /// Replace the supplementary group list by the single group `gid`.
    fn set_groups(&self, gid: u32) -> Result<(), Errno>;
    fn set_gid(&self, gid: u32) -> Result<(), Errno>;
    fn set_uid(&self, uid: u32) -> Result<(), Errno>;
    fn effective_uid(&self) -> u32;
    fn effective_gid(&self) -> u32;
    /// Set the soft and the hard limit.
    fn set_limit(&self, limit: Limit, soft: u64, hard: u64) -> Result<(), Errno>;
    /// Duplicate the standard input descriptor and close the duplicate right away.
    fn dup_stdin(&self) -> Result<(), Errno>;
    fn chdir(&self, path: &Path) -> Result<(), Errno>;
    fn chroot(&self, path: &Path) -> Result<(), Errno>;
}

/// The real operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn set_groups(&self, gid: u32) -> Result<(), Errno> {
        unistd::setgroups(&[Gid::from_raw(gid)])
    }

    fn set_gid(&self, gid: u32) -> Result<(), Errno> {
        unistd::setgid(Gid::from_raw(gid))
    }

    fn set_uid(&self, uid: u32) -> Result<(), Errno> {
        unistd::setuid(Uid::from_raw(uid))
    }

    fn effective_uid(&self) -> u32 {
        geteuid().as_raw()
    }

    fn effective_gid(&self) -> u32 {
        getegid().as_raw()
    }

    fn set_limit(&self, limit: Limit, soft: u64, hard: u64) -> Result<(), Errno> {
        setrlimit(limit.resource(), soft as _, hard as _)
    }

    fn dup_stdin(&self) -> Result<(), Errno> {
        let stdin = io::stdin();
        let dup = stdin
            .as_fd()
            .try_clone_to_owned()
            .map_err(|e| Errno::from_raw(e.raw_os_error().unwrap_or(0)))?;
        drop(dup);
        Ok(())
    }

    fn chdir(&self, path: &Path) -> Result<(), Errno> {
        unistd::chdir(path)
    }

    fn chroot(&self, path: &Path) -> Result<(), Errno> {
        unistd::chroot(path)
    }
}


// vim: ts=4 sw=4 expandtab
