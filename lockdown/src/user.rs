// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{self as ah, format_err as err, Context as _};
use nix::unistd::{getuid, Group, User};

/// Outcome of a user database lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupStatus {
    Found,
    /// The database has no such entry.
    NotFound(String),
    /// The database could not be queried.
    SystemError(String),
}

impl LookupStatus {
    /// Human readable status. `"none"` if the user was found.
    pub fn message(&self) -> &str {
        match self {
            Self::Found => "none",
            Self::NotFound(msg) | Self::SystemError(msg) => msg,
        }
    }
}

/// A user database entry, or the reason why there is none.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub name: Option<String>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub status: LookupStatus,
}

impl UserRecord {
    fn failed(status: LookupStatus) -> Self {
        Self {
            name: None,
            uid: None,
            gid: None,
            status,
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == LookupStatus::Found
    }

    /// Get `(uid, gid)` of a found user.
    pub fn ids(&self) -> Option<(u32, u32)> {
        Some((self.uid?, self.gid?))
    }
}

impl std::fmt::Display for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.name, self.uid, self.gid) {
            (Some(name), Some(uid), Some(gid)) => {
                write!(f, "name={name} uid={uid} gid={gid} error=none")
            }
            _ => write!(f, "error={}", self.status.message()),
        }
    }
}

/// Look up a user by login name, or the current real user if no name is given.
///
/// This never fails. Lookup errors are reported in [UserRecord::status].
pub fn lookup_user(name: Option<&str>) -> UserRecord {
    let result = match name {
        Some(name) => User::from_name(name),
        None => User::from_uid(getuid()),
    };
    match result {
        Ok(Some(user)) => UserRecord {
            name: Some(user.name),
            uid: Some(user.uid.as_raw()),
            gid: Some(user.gid.as_raw()),
            status: LookupStatus::Found,
        },
        Ok(None) => {
            let who = match name {
                Some(name) => name.to_string(),
                None => format!("uid {}", getuid()),
            };
            UserRecord::failed(LookupStatus::NotFound(format!(
                "Could not find user [{who}]"
            )))
        }
        Err(e) => UserRecord::failed(LookupStatus::SystemError(format!(
            "Could not find user [{e}]"
        ))),
    }
}

/// Resolve a group name into a GID.
pub fn lookup_group(name: &str) -> ah::Result<u32> {
    let Some(group) = Group::from_name(name).context("Query group database")? else {
        return Err(err!("Group '{name}' not found"));
    };
    Ok(group.gid.as_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_root() {
        let root = lookup_user(Some("root"));
        assert_eq!(root.status, LookupStatus::Found);
        assert_eq!(root.status.message(), "none");
        assert_eq!(root.name.as_deref(), Some("root"));
        assert_eq!(root.uid, Some(0));
        assert_eq!(root.gid, Some(0));
        assert_eq!(root.ids(), Some((0, 0)));
        assert_eq!(root.to_string(), "name=root uid=0 gid=0 error=none");
    }

    #[test]
    fn test_lookup_missing() {
        let user = lookup_user(Some("no-such-user-xyzzy"));
        assert!(!user.is_found());
        assert!(user.status.message().starts_with("Could not find user"));
        assert_eq!(user.name, None);
        assert_eq!(user.uid, None);
        assert_eq!(user.gid, None);
        assert_eq!(user.ids(), None);
        assert!(user.to_string().starts_with("error=Could not find user"));
    }

    #[test]
    fn test_lookup_current() {
        let user = lookup_user(None);
        if user.is_found() {
            assert_eq!(user.uid, Some(getuid().as_raw()));
        } else {
            // Containers sometimes run with a UID that has no passwd entry.
            assert!(user.status.message().starts_with("Could not find user"));
        }
    }

    #[test]
    fn test_lookup_group() {
        assert_eq!(lookup_group("root").unwrap(), 0);
        assert!(lookup_group("no-such-group-xyzzy").is_err());
    }
}

// vim: ts=4 sw=4 expandtab
