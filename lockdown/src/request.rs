// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    capability::CapabilityStash,
    error::ReduceError,
    host::Host,
    reduce::{drop_to_user, forbid_new_files, forbid_new_processes, install_syscall_filter, jail},
    sandbox::Sandbox,
    sink::LogSink,
};
use std::path::PathBuf;

/// The identity to switch to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetUser {
    pub uid: u32,
    /// `None` leaves the group identity unchanged.
    pub gid: Option<u32>,
    pub keep_net_admin: bool,
}

/// A complete privilege reduction profile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReductionRequest {
    pub user: Option<TargetUser>,
    pub chroot: Option<PathBuf>,
    pub no_files: bool,
    pub no_forks: bool,
    pub seccomp: bool,
}

impl ReductionRequest {
    /// Returns `true` if nothing would be reduced.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply all requested reductions.
    ///
    /// The jail comes first, because `chroot(2)` needs privileges the
    /// target user does not have. The process limit is applied after
    /// the user switch, because it counts processes of the real user.
    /// The syscall filter comes last, so the other steps are not filtered.
    pub fn apply(
        &self,
        host: &dyn Host,
        stash: &mut dyn CapabilityStash,
        sandbox: &dyn Sandbox,
        log: &dyn LogSink,
    ) -> Result<(), ReduceError> {
        if let Some(root) = &self.chroot {
            jail(host, root)?;
        }
        if let Some(user) = &self.user {
            drop_to_user(host, stash, user.uid, user.gid, user.keep_net_admin)?;
        }
        if self.no_files {
            forbid_new_files(host)?;
        }
        if self.no_forks {
            forbid_new_processes(host)?;
        }
        if self.seccomp {
            install_syscall_filter(sandbox, log)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ReductionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn yes_no(b: bool) -> &'static str {
            if b {
                "yes"
            } else {
                "no"
            }
        }

        match &self.chroot {
            Some(root) => writeln!(f, "chroot:        {}", root.display())?,
            None => writeln!(f, "chroot:        no")?,
        }
        match &self.user {
            Some(user) => {
                write!(f, "user:          uid {}", user.uid)?;
                match user.gid {
                    Some(gid) => writeln!(f, ", gid {gid}")?,
                    None => writeln!(f, ", gid unchanged")?,
                }
                writeln!(f, "keep-netadmin: {}", yes_no(user.keep_net_admin))?;
            }
            None => writeln!(f, "user:          unchanged")?,
        }
        writeln!(f, "nofiles:       {}", yes_no(self.no_files))?;
        writeln!(f, "noforks:       {}", yes_no(self.no_forks))?;
        write!(f, "seccomp:       {}", yes_no(self.seccomp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::FailureKind,
        probe::check_permissions,
        testing::{MockHost, MockSandbox, MockStash, RecordingLog},
    };
    use nix::errno::Errno;

    fn full_request() -> ReductionRequest {
        ReductionRequest {
            user: Some(TargetUser {
                uid: 65534,
                gid: Some(65534),
                keep_net_admin: true,
            }),
            chroot: Some("/var/empty".into()),
            no_files: true,
            no_forks: true,
            seccomp: true,
        }
    }

    #[test]
    fn test_apply_order() {
        let host = MockHost::new();
        let mut stash = MockStash::new(&host.journal);
        let sandbox = MockSandbox::new(&host.journal);
        let log = RecordingLog::default();

        full_request()
            .apply(&host, &mut stash, &sandbox, &log)
            .unwrap();

        assert_eq!(
            host.calls(),
            [
                "chdir /var/empty",
                "chroot /var/empty",
                "pre_switch",
                "set_groups 65534",
                "set_gid 65534",
                "set_uid 65534",
                "post_switch",
                "dup_stdin",
                "set_limit OpenFiles 0 0",
                "dup_stdin",
                "set_limit Processes 0 0",
                "drop_permissions",
            ]
        );

        let perm = check_permissions(&host, &sandbox);
        assert!(perm.no_open_files);
        assert!(perm.seccomp_enforcing);
        assert_eq!(perm.uid, 65534);
    }

    #[test]
    fn test_apply_empty() {
        let host = MockHost::new();
        let mut stash = MockStash::new(&host.journal);
        let sandbox = MockSandbox::new(&host.journal);
        let log = RecordingLog::default();

        let req = ReductionRequest::default();
        assert!(req.is_empty());
        assert!(!full_request().is_empty());
        req.apply(&host, &mut stash, &sandbox, &log).unwrap();
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_apply_stops_at_first_error() {
        let host = MockHost::new();
        host.fail("set_uid", Errno::EPERM);
        let mut stash = MockStash::new(&host.journal);
        let sandbox = MockSandbox::new(&host.journal);
        let log = RecordingLog::default();

        let e = full_request()
            .apply(&host, &mut stash, &sandbox, &log)
            .unwrap_err();
        assert_eq!(e.kind(), FailureKind::SyscallFailed);
        let calls = host.calls();
        assert_eq!(calls.last().unwrap(), "post_switch");
        assert!(!calls.iter().any(|c| c.starts_with("set_limit")));
        assert!(!sandbox.is_working());
    }

    #[test]
    fn test_apply_silent_file_limit() {
        let host = MockHost::new();
        host.ignore_limits.set(true);
        let mut stash = MockStash::new(&host.journal);
        let sandbox = MockSandbox::new(&host.journal);
        let log = RecordingLog::default();

        let req = ReductionRequest {
            no_files: true,
            seccomp: true,
            ..Default::default()
        };
        let e = req.apply(&host, &mut stash, &sandbox, &log).unwrap_err();
        assert_eq!(e.kind(), FailureKind::SilentNoOp);
        assert!(!host.calls().iter().any(|c| c == "drop_permissions"));
    }

    #[test]
    fn test_display() {
        let text = full_request().to_string();
        assert!(text.contains("chroot:        /var/empty"));
        assert!(text.contains("user:          uid 65534, gid 65534"));
        assert!(text.contains("keep-netadmin: yes"));
        assert!(text.ends_with("seccomp:       yes"));

        let text = ReductionRequest::default().to_string();
        assert!(text.contains("user:          unchanged"));
        assert!(text.contains("chroot:        no"));
    }
}

// vim: ts=4 sw=4 expandtab
