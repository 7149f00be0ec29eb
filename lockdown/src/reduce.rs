// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One-shot privilege reduction primitives.
//!
//! Each primitive is one-way. A failing primitive does not roll back
//! whatever it already changed.

use crate::{
    capability::CapabilityStash,
    error::ReduceError,
    host::{Host, Limit},
    sandbox::Sandbox,
    sink::LogSink,
};
use std::path::Path;

/// Check whether the process can still allocate a file descriptor.
pub(crate) fn can_open_files(host: &dyn Host) -> bool {
    host.dup_stdin().is_ok()
}

/// Switch the process to `uid` and, if given, to `gid`.
///
/// With `keep_net_admin` the switch is bracketed by the hooks of `stash`,
/// so that `CAP_NET_ADMIN` survives it.
///
/// If `gid` is given, the supplementary groups are replaced by `gid`.
/// This needs `CAP_SETGID`, even if `gid` is already the current group.
///
/// The UID result is verified before the GID result.
/// A process that still runs as the old UID is the more severe failure.
pub fn drop_to_user(
    host: &dyn Host,
    stash: &mut dyn CapabilityStash,
    uid: u32,
    gid: Option<u32>,
    keep_net_admin: bool,
) -> Result<(), ReduceError> {
    if keep_net_admin {
        stash.pre_switch().map_err(ReduceError::Capability)?;
    }

    let mut gid_errno = None;
    if let Some(gid) = gid {
        gid_errno = host
            .set_groups(gid)
            .and_then(|_| host.set_gid(gid))
            .err();
    }
    let uid_errno = host.set_uid(uid).err();

    if keep_net_admin {
        stash.post_switch().map_err(ReduceError::Capability)?;
    }

    if let Some(errno) = uid_errno {
        return Err(ReduceError::SetUid(errno));
    }
    let effective = host.effective_uid();
    if effective != uid {
        return Err(ReduceError::UidNotApplied {
            requested: uid,
            effective,
        });
    }
    if let Some(errno) = gid_errno {
        return Err(ReduceError::SetGid(errno));
    }
    if let Some(gid) = gid {
        let effective = host.effective_gid();
        if effective != gid {
            return Err(ReduceError::GidNotApplied {
                requested: gid,
                effective,
            });
        }
    }

    log::info!("Switched to uid {uid}, gid {}", host.effective_gid());
    Ok(())
}

/// Lower the open file limit to zero and prove that it took effect.
pub fn forbid_new_files(host: &dyn Host) -> Result<(), ReduceError> {
    host.dup_stdin().map_err(ReduceError::StdinUnusable)?;
    host.set_limit(Limit::OpenFiles, 0, 0)
        .map_err(ReduceError::FileLimit)?;
    if can_open_files(host) {
        return Err(ReduceError::FilesStillOpenable);
    }
    log::info!("Opening new files is forbidden");
    Ok(())
}

/// Lower the process limit of the real user to zero.
///
/// There is no side effect free way to probe process creation,
/// so this is not verified.
pub fn forbid_new_processes(host: &dyn Host) -> Result<(), ReduceError> {
    host.set_limit(Limit::Processes, 0, 0)
        .map_err(ReduceError::ProcessLimit)?;
    log::info!("Creating new processes is forbidden");
    Ok(())
}

/// Change into `root` and make it the filesystem root of the process.
pub fn jail(host: &dyn Host, root: &Path) -> Result<(), ReduceError> {
    host.chdir(root).map_err(|errno| ReduceError::Chdir {
        path: root.to_path_buf(),
        errno,
    })?;
    host.chroot(root).map_err(|errno| ReduceError::Chroot {
        path: root.to_path_buf(),
        errno,
    })?;
    log::info!("Jailed into {root:?}");
    Ok(())
}

/// Install the system call filter provided by `sandbox`.
pub fn install_syscall_filter(
    sandbox: &dyn Sandbox,
    log: &dyn LogSink,
) -> Result<(), ReduceError> {
    sandbox.drop_permissions(log).map_err(ReduceError::Sandbox)
}


// vim: ts=4 sw=4 expandtab
