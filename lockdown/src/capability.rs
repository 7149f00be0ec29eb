// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Carry `CAP_NET_ADMIN` across a change of the user identity.
//!
//! A switch away from UID 0 clears all capabilities, unless the
//! process asked the kernel to keep them with `PR_SET_KEEPCAPS`.
//! Even then the effective set is cleared, so it must be restored
//! after the switch.

use anyhow::{self as ah, format_err as err, Context as _};
use caps::{CapSet, Capability, CapsHashSet};
use nix::sys::prctl;

/// Hooks that bracket a UID change.
pub trait CapabilityStash {
    /// Called before any identity change.
    fn pre_switch(&mut self) -> ah::Result<()>;
    /// Called after the UID change.
    fn post_switch(&mut self) -> ah::Result<()>;
}

/// Keeps `CAP_NET_ADMIN` and nothing else.
#[derive(Debug, Default)]
pub struct NetAdminStash;

impl NetAdminStash {
    pub fn new() -> Self {
        Self
    }
}

impl CapabilityStash for NetAdminStash {
    fn pre_switch(&mut self) -> ah::Result<()> {
        let permitted = caps::has_cap(None, CapSet::Permitted, Capability::CAP_NET_ADMIN)
            .context("Read permitted capabilities")?;
        if !permitted {
            return Err(err!("CAP_NET_ADMIN is not in the permitted set"));
        }
        prctl::set_keepcaps(true).context("Set PR_SET_KEEPCAPS")?;
        Ok(())
    }

    fn post_switch(&mut self) -> ah::Result<()> {
        let keep: CapsHashSet = [Capability::CAP_NET_ADMIN].into_iter().collect();
        caps::set(None, CapSet::Permitted, &keep).context("Reduce permitted capabilities")?;
        caps::set(None, CapSet::Effective, &keep).context("Restore effective capabilities")?;
        caps::clear(None, CapSet::Inheritable).context("Clear inheritable capabilities")?;
        prctl::set_keepcaps(false).context("Clear PR_SET_KEEPCAPS")?;

        let effective = caps::has_cap(None, CapSet::Effective, Capability::CAP_NET_ADMIN)
            .context("Read effective capabilities")?;
        if !effective {
            return Err(err!("CAP_NET_ADMIN was lost across the user switch"));
        }
        log::debug!("Kept CAP_NET_ADMIN across the user switch");
        Ok(())
    }
}


// vim: ts=4 sw=4 expandtab
