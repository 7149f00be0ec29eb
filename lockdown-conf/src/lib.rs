// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate implements the configuration file parsing of `lockdownd`.
//!
//! The configuration decides which privilege reductions are applied
//! at daemon startup.
//! Defaults for a missing configuration file
//! or missing individual configuration entries are implemented here.

#![forbid(unsafe_code)]

mod ini;

use crate::ini::Ini;
use anyhow::{self as ah, format_err as err, Context as _};
use std::{
    net::{IpAddr, Ipv6Addr},
    path::{Path, PathBuf},
    time::Duration,
};

/// The default configuration path, relative to the install prefix.
const CONF_PATH: &str = "etc/lockdownd.conf";

/// Default UDP port of the status service.
pub const DEFAULT_PORT: u16 = 5999;

/// Default time the daemon has to finish its privilege reduction.
pub const DEFAULT_SETUP_TIMEOUT: u32 = 20;

/// Seccomp setting.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum Seccomp {
    /// Seccomp is disabled (default).
    #[default]
    Off,

    /// Seccomp is enabled with logging only.
    ///
    /// The event will be logged, if a syscall is called that is not allowed.
    /// See the Linux kernel logs for seccomp audit messages.
    Log,

    /// Seccomp is enabled with killing (recommended).
    ///
    /// The process will be killed, if a syscall is called that is not allowed.
    Kill,
}

impl std::fmt::Display for Seccomp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Self::Off => write!(f, "Off"),
            Self::Log => write!(f, "Logging only"),
            Self::Kill => write!(f, "Process killing"),
        }
    }
}

impl std::str::FromStr for Seccomp {
    type Err = ah::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim() {
            "off" => Ok(Self::Off),
            "log" => Ok(Self::Log),
            "kill" => Ok(Self::Kill),
            other => Err(err!(
                "Config option 'seccomp = {other}' is not valid. Valid values are: off, log, kill."
            )),
        }
    }
}

fn parse_bool(s: &str) -> ah::Result<bool> {
    let s = s.to_lowercase();
    let s = s.trim();
    match s {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(err!("Invalid boolean string")),
    }
}

fn parse_u16(s: &str) -> ah::Result<u16> {
    let s = s.trim();
    if let Some(s) = s.strip_prefix("0x") {
        Ok(u16::from_str_radix(s, 16)?)
    } else {
        Ok(s.parse::<u16>()?)
    }
}

fn parse_u32(s: &str) -> ah::Result<u32> {
    let s = s.trim();
    if let Some(s) = s.strip_prefix("0x") {
        Ok(u32::from_str_radix(s, 16)?)
    } else {
        Ok(s.parse::<u32>()?)
    }
}

/// Parse an optional non-empty string option.
fn parse_name(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn get_bool(ini: &Ini, section: &str, option: &str) -> ah::Result<bool> {
    if let Some(value) = ini.get(section, option) {
        return parse_bool(value).with_context(|| format!("[{section}] {option}"));
    }
    Ok(false)
}

fn get_port(ini: &Ini) -> ah::Result<u16> {
    if let Some(port) = ini.get("GENERAL", "port") {
        return parse_u16(port).context("[GENERAL] port");
    }
    Ok(DEFAULT_PORT)
}

fn get_address(ini: &Ini) -> ah::Result<IpAddr> {
    if let Some(address) = ini.get("GENERAL", "address") {
        return address
            .trim()
            .parse()
            .with_context(|| format!("[GENERAL] address = {address} is invalid"));
    }
    Ok(Ipv6Addr::UNSPECIFIED.into())
}

fn get_seccomp(ini: &Ini) -> ah::Result<Seccomp> {
    if let Some(seccomp) = ini.get("GENERAL", "seccomp") {
        return seccomp.parse();
    }
    Ok(Default::default())
}

fn get_user(ini: &Ini) -> Option<String> {
    ini.get("SECURITY", "user").and_then(parse_name)
}

fn get_group(ini: &Ini) -> Option<String> {
    ini.get("SECURITY", "group").and_then(parse_name)
}

fn get_chroot(ini: &Ini) -> ah::Result<Option<PathBuf>> {
    let Some(chroot) = ini.get("SECURITY", "chroot").and_then(parse_name) else {
        return Ok(None);
    };
    let chroot = PathBuf::from(chroot);
    if !chroot.is_absolute() {
        return Err(err!("[SECURITY] chroot = {chroot:?} is not an absolute path"));
    }
    Ok(Some(chroot))
}

fn get_setup_timeout(ini: &Ini) -> ah::Result<u32> {
    if let Some(timeout) = ini.get("SECURITY", "setup-timeout") {
        let timeout = parse_u32(timeout).context("[SECURITY] setup-timeout")?;
        if timeout == 0 {
            return Err(err!("[SECURITY] setup-timeout must not be zero"));
        }
        return Ok(timeout);
    }
    Ok(DEFAULT_SETUP_TIMEOUT)
}

/// Parsed lockdownd.conf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    path: Option<PathBuf>,
    debug: bool,
    port: u16,
    address: IpAddr,
    seccomp: Seccomp,
    user: Option<String>,
    group: Option<String>,
    keep_net_admin: bool,
    chroot: Option<PathBuf>,
    no_files: bool,
    no_forks: bool,
    setup_timeout: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Create a new configuration instance with all-default values.
    pub fn new() -> Self {
        Self {
            path: None,
            debug: false,
            port: DEFAULT_PORT,
            address: Ipv6Addr::UNSPECIFIED.into(),
            seccomp: Seccomp::Off,
            user: None,
            group: None,
            keep_net_admin: false,
            chroot: None,
            no_files: false,
            no_forks: false,
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
        }
    }

    /// Get the default configuration file path.
    pub fn get_default_path() -> PathBuf {
        // The build-time environment variable LOCKDOWN_CONF_PREFIX can be
        // used to give an additional prefix.
        let prefix = option_env!("LOCKDOWN_CONF_PREFIX").unwrap_or("/");

        let mut path = PathBuf::new();
        path.push(prefix);
        path.push(CONF_PATH);
        path
    }

    /// Get the actual path the configuration was read from.
    pub fn get_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// (Re-)load a configuration from a file.
    pub fn load(&mut self, path: &Path) -> ah::Result<()> {
        let ini = Ini::new_from_file(path)
            .with_context(|| format!("Failed to load configuration {path:?}"))?;
        self.load_ini(&ini)?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// (Re-)load a configuration from a string.
    pub fn load_str(&mut self, content: &str) -> ah::Result<()> {
        let mut ini = Ini::new();
        ini.parse_str(content)?;
        self.load_ini(&ini)
    }

    /// (Re-)load a configuration from a parsed [Ini] instance.
    fn load_ini(&mut self, ini: &Ini) -> ah::Result<()> {
        let debug = get_bool(ini, "GENERAL", "debug")?;
        let port = get_port(ini)?;
        let address = get_address(ini)?;
        let seccomp = get_seccomp(ini)?;
        let user = get_user(ini);
        let group = get_group(ini);
        let keep_net_admin = get_bool(ini, "SECURITY", "keep-netadmin")?;
        let chroot = get_chroot(ini)?;
        let no_files = get_bool(ini, "SECURITY", "nofiles")?;
        let no_forks = get_bool(ini, "SECURITY", "noforks")?;
        let setup_timeout = get_setup_timeout(ini)?;

        if keep_net_admin && user.is_none() {
            return Err(err!(
                "[SECURITY] keep-netadmin requires [SECURITY] user to be set"
            ));
        }
        if group.is_some() && user.is_none() {
            return Err(err!("[SECURITY] group requires [SECURITY] user to be set"));
        }

        self.debug = debug;
        self.port = port;
        self.address = address;
        self.seccomp = seccomp;
        self.user = user;
        self.group = group;
        self.keep_net_admin = keep_net_admin;
        self.chroot = chroot;
        self.no_files = no_files;
        self.no_forks = no_forks;
        self.setup_timeout = setup_timeout;
        Ok(())
    }

    /// Get the `debug` option from `[GENERAL]` section.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Get the `port` option from `[GENERAL]` section.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the `address` option from `[GENERAL]` section.
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Get the `seccomp` option from `[GENERAL]` section.
    pub fn seccomp(&self) -> Seccomp {
        self.seccomp
    }

    /// Get the `user` option from `[SECURITY]` section.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Get the `group` option from `[SECURITY]` section.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Get the `keep-netadmin` option from `[SECURITY]` section.
    pub fn keep_net_admin(&self) -> bool {
        self.keep_net_admin
    }

    /// Get the `chroot` option from `[SECURITY]` section.
    pub fn chroot(&self) -> Option<&Path> {
        self.chroot.as_deref()
    }

    /// Get the `nofiles` option from `[SECURITY]` section.
    pub fn no_files(&self) -> bool {
        self.no_files
    }

    /// Get the `noforks` option from `[SECURITY]` section.
    pub fn no_forks(&self) -> bool {
        self.no_forks
    }

    /// Get the `setup-timeout` option from `[SECURITY]` section.
    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.setup_timeout.into())
    }
}


// vim: ts=4 sw=4 expandtab
