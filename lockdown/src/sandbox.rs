// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::sink::LogSink;
use anyhow::{self as ah, format_err as err, Context as _};
use lockdown_seccomp::{
    seccomp_enforcing, seccomp_exists, seccomp_supported, Action, Allow, Filter,
};
use std::env::consts::ARCH;

/// Provider of the system call filter.
pub trait Sandbox {
    /// Build and install the filter.
    fn drop_permissions(&self, log: &dyn LogSink) -> ah::Result<()>;
    /// Does the kernel offer a filter facility?
    fn exists(&self) -> bool;
    /// Is a filter currently enforced on this process?
    fn is_working(&self) -> bool;
}

/// Seccomp allow-list sandbox.
#[derive(Clone, Debug)]
pub struct SeccompSandbox {
    allow: Vec<Allow>,
    action: Action,
}

impl SeccompSandbox {
    pub fn new(allow: &[Allow], action: Action) -> Self {
        Self {
            allow: allow.to_vec(),
            action,
        }
    }
}

impl Sandbox for SeccompSandbox {
    fn drop_permissions(&self, log: &dyn LogSink) -> ah::Result<()> {
        if !seccomp_supported() {
            return Err(err!("Seccomp filters are not supported on {ARCH}"));
        }
        if !seccomp_exists() {
            return Err(err!("The kernel does not support seccomp"));
        }
        Filter::compile(&self.allow, self.action)
            .context("Compile seccomp filter")?
            .install()
            .context("Install seccomp filter")?;
        log.info(&format!(
            "Seccomp filter installed ({} rules, deny action {:?})",
            self.allow.len(),
            self.action
        ));
        Ok(())
    }

    fn exists(&self) -> bool {
        seccomp_exists()
    }

    fn is_working(&self) -> bool {
        seccomp_enforcing()
    }
}

// vim: ts=4 sw=4 expandtab
