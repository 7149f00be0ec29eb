// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated host, stash, sandbox and log for the unit tests.

use crate::{
    capability::CapabilityStash,
    host::{Host, Limit},
    sandbox::Sandbox,
    sink::LogSink,
    supervisor::ProcessControl,
};
use anyhow::{self as ah, format_err as err};
use nix::errno::Errno;
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    path::Path,
    rc::Rc,
    sync::Mutex,
};

/// Ordered record of the calls made into the simulated collaborators.
pub type Journal = Rc<RefCell<Vec<String>>>;

pub struct MockHost {
    pub journal: Journal,
    pub euid: Cell<u32>,
    pub egid: Cell<u32>,
    /// Calls by name that fail with the given error.
    pub failures: RefCell<HashMap<&'static str, Errno>>,
    /// set_uid/set_gid report success but do not change anything.
    pub ignore_ids: Cell<bool>,
    /// set_limit reports success but does not change anything.
    pub ignore_limits: Cell<bool>,
    pub files_limited: Cell<bool>,
    pub forks_limited: Cell<bool>,
    pub stdin_closed: Cell<bool>,
    pub cwd: RefCell<String>,
    pub root: RefCell<String>,
}

impl MockHost {
    /// A simulated process running as root.
    pub fn new() -> Self {
        Self {
            journal: Rc::new(RefCell::new(vec![])),
            euid: Cell::new(0),
            egid: Cell::new(0),
            failures: RefCell::new(HashMap::new()),
            ignore_ids: Cell::new(false),
            ignore_limits: Cell::new(false),
            files_limited: Cell::new(false),
            forks_limited: Cell::new(false),
            stdin_closed: Cell::new(false),
            cwd: RefCell::new("/".to_string()),
            root: RefCell::new("/".to_string()),
        }
    }

    pub fn fail(&self, call: &'static str, errno: Errno) {
        self.failures.borrow_mut().insert(call, errno);
    }

    pub fn calls(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    fn call(&self, name: &'static str, desc: String) -> Result<(), Errno> {
        self.journal.borrow_mut().push(desc);
        match self.failures.borrow().get(name) {
            Some(errno) => Err(*errno),
            None => Ok(()),
        }
    }
}

impl Host for MockHost {
    fn set_groups(&self, gid: u32) -> Result<(), Errno> {
        self.call("set_groups", format!("set_groups {gid}"))
    }

    fn set_gid(&self, gid: u32) -> Result<(), Errno> {
        self.call("set_gid", format!("set_gid {gid}"))?;
        if !self.ignore_ids.get() {
            self.egid.set(gid);
        }
        Ok(())
    }

    fn set_uid(&self, uid: u32) -> Result<(), Errno> {
        self.call("set_uid", format!("set_uid {uid}"))?;
        if !self.ignore_ids.get() {
            self.euid.set(uid);
        }
        Ok(())
    }

    fn effective_uid(&self) -> u32 {
        self.euid.get()
    }

    fn effective_gid(&self) -> u32 {
        self.egid.get()
    }

    fn set_limit(&self, limit: Limit, soft: u64, hard: u64) -> Result<(), Errno> {
        self.call("set_limit", format!("set_limit {limit:?} {soft} {hard}"))?;
        if !self.ignore_limits.get() && soft == 0 {
            match limit {
                Limit::OpenFiles => self.files_limited.set(true),
                Limit::Processes => self.forks_limited.set(true),
            }
        }
        Ok(())
    }

    fn dup_stdin(&self) -> Result<(), Errno> {
        self.call("dup_stdin", "dup_stdin".to_string())?;
        if self.stdin_closed.get() {
            Err(Errno::EBADF)
        } else if self.files_limited.get() {
            Err(Errno::EMFILE)
        } else {
            Ok(())
        }
    }

    fn chdir(&self, path: &Path) -> Result<(), Errno> {
        self.call("chdir", format!("chdir {}", path.display()))?;
        *self.cwd.borrow_mut() = path.display().to_string();
        Ok(())
    }

    fn chroot(&self, path: &Path) -> Result<(), Errno> {
        self.call("chroot", format!("chroot {}", path.display()))?;
        *self.root.borrow_mut() = path.display().to_string();
        Ok(())
    }
}

pub struct MockStash {
    pub journal: Journal,
    pub fail_pre: bool,
    pub fail_post: bool,
}

impl MockStash {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Rc::clone(journal),
            fail_pre: false,
            fail_post: false,
        }
    }
}

impl CapabilityStash for MockStash {
    fn pre_switch(&mut self) -> ah::Result<()> {
        self.journal.borrow_mut().push("pre_switch".to_string());
        if self.fail_pre {
            return Err(err!("pre_switch failed"));
        }
        Ok(())
    }

    fn post_switch(&mut self) -> ah::Result<()> {
        self.journal.borrow_mut().push("post_switch".to_string());
        if self.fail_post {
            return Err(err!("post_switch failed"));
        }
        Ok(())
    }
}

pub struct MockSandbox {
    pub journal: Journal,
    pub exists: bool,
    pub working: Cell<bool>,
    pub fail: bool,
}

impl MockSandbox {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Rc::clone(journal),
            exists: true,
            working: Cell::new(false),
            fail: false,
        }
    }
}

impl Sandbox for MockSandbox {
    fn drop_permissions(&self, log: &dyn LogSink) -> ah::Result<()> {
        self.journal.borrow_mut().push("drop_permissions".to_string());
        if self.fail {
            return Err(err!("filter rejected"));
        }
        self.working.set(true);
        log.info("filter installed");
        Ok(())
    }

    fn exists(&self) -> bool {
        self.exists
    }

    fn is_working(&self) -> bool {
        self.working.get()
    }
}

/// Log sink that remembers every line.
#[derive(Default)]
pub struct RecordingLog {
    pub info: Mutex<Vec<String>>,
    pub critical: Mutex<Vec<String>>,
}

impl RecordingLog {
    pub fn critical_lines(&self) -> Vec<String> {
        self.critical.lock().unwrap().clone()
    }

    pub fn info_lines(&self) -> Vec<String> {
        self.info.lock().unwrap().clone()
    }
}

impl LogSink for RecordingLog {
    fn info(&self, msg: &str) {
        self.info.lock().unwrap().push(msg.to_string());
    }

    fn critical(&self, msg: &str) {
        self.critical.lock().unwrap().push(msg.to_string());
    }
}

/// Process control that records exit requests instead of exiting.
#[derive(Default)]
pub struct RecordingExit {
    pub codes: Mutex<Vec<i32>>,
}

impl RecordingExit {
    pub fn codes(&self) -> Vec<i32> {
        self.codes.lock().unwrap().clone()
    }
}

impl ProcessControl for RecordingExit {
    fn exit(&self, code: i32) {
        self.codes.lock().unwrap().push(code);
    }
}

// vim: ts=4 sw=4 expandtab
