// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use nix::errno::Errno;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [ReduceError].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The process was not in a state where the reduction can be verified.
    PreconditionViolated,
    /// The operating system rejected a call.
    SyscallFailed,
    /// A call reported success, but the state did not change.
    SilentNoOp,
    /// The capability stash or the sandbox failed.
    Collaborator,
}

/// Error of a privilege reduction step.
///
/// None of these are recoverable. The process is left in whatever
/// partially reduced state the failing step produced.
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("Unable to duplicate stdin [{0}]")]
    StdinUnusable(Errno),

    #[error("Failed to set UID [{0}]")]
    SetUid(Errno),

    #[error("Failed to set UID but seemed to succeed (requested {requested}, effective {effective})")]
    UidNotApplied { requested: u32, effective: u32 },

    #[error("Failed to set GID [{0}]")]
    SetGid(Errno),

    #[error("Failed to set GID but seemed to succeed (requested {requested}, effective {effective})")]
    GidNotApplied { requested: u32, effective: u32 },

    #[error("Failed to set open file limit to 0 [{0}]")]
    FileLimit(Errno),

    #[error("Still able to open files after limit set to 0")]
    FilesStillOpenable,

    #[error("Failed to set process limit to 0 [{0}]")]
    ProcessLimit(Errno),

    #[error("chdir({path:?}) -> [{errno}]")]
    Chdir { path: PathBuf, errno: Errno },

    #[error("chroot({path:?}) -> [{errno}]")]
    Chroot { path: PathBuf, errno: Errno },

    #[error("Keep CAP_NET_ADMIN: {0:#}")]
    Capability(anyhow::Error),

    #[error("Install syscall filter: {0:#}")]
    Sandbox(anyhow::Error),
}

impl ReduceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::StdinUnusable(_) => FailureKind::PreconditionViolated,
            Self::SetUid(_)
            | Self::SetGid(_)
            | Self::FileLimit(_)
            | Self::ProcessLimit(_)
            | Self::Chdir { .. }
            | Self::Chroot { .. } => FailureKind::SyscallFailed,
            Self::UidNotApplied { .. } | Self::GidNotApplied { .. } | Self::FilesStillOpenable => {
                FailureKind::SilentNoOp
            }
            Self::Capability(_) | Self::Sandbox(_) => FailureKind::Collaborator,
        }
    }
}


// vim: ts=4 sw=4 expandtab
