// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![forbid(unsafe_code)]

#[cfg(not(any(target_os = "linux", target_os = "android")))]
std::compile_error!("lockdownd does not support non-Linux platforms.");

mod logger;
mod seccomp;
mod server;

use crate::server::StatusServer;
use anyhow::{self as ah, format_err as err, Context as _};
use clap::Parser;
use lockdown::{
    check_permissions, lookup_group, lookup_user, ExitProcess, LogFacade, LogSink, NetAdminStash,
    Permissions, ReductionRequest, Security, SystemHost, TargetUser,
};
use lockdown_conf::{Config, Seccomp};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::{
    runtime,
    signal::unix::{signal, SignalKind},
    sync, task,
};

#[derive(Parser, Debug, Clone)]
struct Opts {
    /// Override the default path to the configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the reduction that would be applied and exit.
    #[arg(long, default_value = "false")]
    preview: bool,

    /// Serve without reducing privileges.
    ///
    /// For debugging only.
    #[arg(long, default_value = "false")]
    no_reduce: bool,
}

impl Opts {
    pub fn get_config(&self) -> PathBuf {
        if let Some(config) = &self.config {
            config.clone()
        } else {
            Config::get_default_path()
        }
    }
}

/// Translate the configuration into a reduction request.
fn build_request(conf: &Config) -> ah::Result<ReductionRequest> {
    let user = match conf.user() {
        Some(name) => {
            let record = lookup_user(Some(name));
            let Some((uid, gid)) = record.ids() else {
                return Err(err!("{}", record.status.message()));
            };
            let gid = match conf.group() {
                Some(group) => lookup_group(group)?,
                None => gid,
            };
            Some(TargetUser {
                uid,
                gid: Some(gid),
                keep_net_admin: conf.keep_net_admin(),
            })
        }
        None => None,
    };
    Ok(ReductionRequest {
        user,
        chroot: conf.chroot().map(|p| p.to_path_buf()),
        no_files: conf.no_files(),
        no_forks: conf.no_forks(),
        seccomp: conf.seccomp() != Seccomp::Off,
    })
}

/// Check the observed state against the request.
fn verify(request: &ReductionRequest, perm: &Permissions) -> ah::Result<()> {
    if request.no_files && !perm.no_open_files {
        return Err(err!("Files can still be opened"));
    }
    if request.seccomp && !perm.seccomp_enforcing {
        return Err(err!("Seccomp filter is not enforcing"));
    }
    if let Some(user) = &request.user {
        if perm.uid != user.uid {
            return Err(err!(
                "Running as uid {} instead of uid {}",
                perm.uid,
                user.uid
            ));
        }
    }
    Ok(())
}

fn preview(conf: &Config) -> ah::Result<()> {
    let request = build_request(conf)?;
    println!("{request}");
    Ok(())
}

async fn async_main(opts: Arc<Opts>, conf: Config) -> ah::Result<()> {
    let log: Arc<dyn LogSink> = Arc::new(LogFacade);
    let mut security = Security::with_timeout(
        Arc::clone(&log),
        Arc::new(ExitProcess),
        &runtime::Handle::current(),
        conf.setup_timeout(),
    );

    // Everything that needs privileges or new file descriptors
    // must be created before the reduction.
    let mut sigterm = signal(SignalKind::terminate()).context("Register SIGTERM")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Register SIGINT")?;

    let (exit_sock_tx, mut exit_sock_rx) = sync::mpsc::channel(1);

    let sandbox = seccomp::sandbox(conf.seccomp());
    let srv = StatusServer::bind(conf.address(), conf.port(), sandbox.clone())
        .await
        .context("Server init")?;
    log::info!("Listening on {}", srv.local_addr()?);

    if opts.no_reduce {
        log::warn!("Not reducing privileges (--no-reduce).");
    } else {
        let request = build_request(&conf)?;
        for line in request.to_string().lines() {
            log::debug!("Reduce {line}");
        }
        request
            .apply(&SystemHost, &mut NetAdminStash::new(), &sandbox, log.as_ref())
            .context("Reduce privileges")?;
        let perm = check_permissions(&SystemHost, &sandbox);
        log::info!("Permissions: {perm}");
        verify(&request, &perm).context("Verify privileges")?;
    }

    security.setup_complete();

    // Task: Status server.
    task::spawn(async move {
        loop {
            if let Err(e) = srv.serve_one().await {
                let _ = exit_sock_tx.send(Err(e)).await;
                break;
            }
        }
    });

    // Task: Main loop.
    let exitcode;
    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                log::info!("SIGTERM: Terminating.");
                exitcode = Ok(());
                break;
            }
            _ = sigint.recv() => {
                exitcode = Err(err!("Interrupted by SIGINT."));
                break;
            }
            code = exit_sock_rx.recv() => {
                exitcode = code.unwrap_or_else(|| Err(err!("Unknown error code.")));
                break;
            }
        }
    }

    exitcode
}

fn main() -> ah::Result<()> {
    let opts = Arc::new(Opts::parse());

    let mut conf = Config::new();
    conf.load(&opts.get_config())
        .context("Configuration file")?;

    logger::init(conf.debug())?;

    if opts.preview {
        return preview(&conf);
    }

    // A single thread and no blocking pool,
    // so a zero process limit does not stall the runtime.
    runtime::Builder::new_current_thread()
        .thread_keep_alive(Duration::from_millis(0))
        .max_blocking_threads(1)
        .enable_all()
        .build()
        .context("Tokio runtime builder")?
        .block_on(async_main(opts, conf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(no_open_files: bool, seccomp_enforcing: bool, uid: u32) -> Permissions {
        Permissions {
            no_open_files,
            seccomp_exists: true,
            seccomp_enforcing,
            uid,
        }
    }

    #[test]
    fn test_build_request_default() {
        let conf = Config::new();
        let request = build_request(&conf).unwrap();
        assert!(request.is_empty());
    }

    #[test]
    fn test_build_request() {
        let mut conf = Config::new();
        conf.load_str(
            "[GENERAL]\n\
             seccomp = kill\n\
             [SECURITY]\n\
             user = root\n\
             chroot = /var/empty\n\
             nofiles = true\n",
        )
        .unwrap();
        let request = build_request(&conf).unwrap();
        assert_eq!(
            request,
            ReductionRequest {
                user: Some(TargetUser {
                    uid: 0,
                    gid: Some(0),
                    keep_net_admin: false,
                }),
                chroot: Some(PathBuf::from("/var/empty")),
                no_files: true,
                no_forks: false,
                seccomp: true,
            }
        );
    }

    #[test]
    fn test_build_request_unknown_user() {
        let mut conf = Config::new();
        conf.load_str("[SECURITY]\nuser = lockdown-no-such-user\n")
            .unwrap();
        let e = build_request(&conf).unwrap_err();
        assert!(e.to_string().contains("lockdown-no-such-user"));
    }

    #[test]
    fn test_verify() {
        let request = ReductionRequest {
            user: Some(TargetUser {
                uid: 1000,
                gid: Some(1000),
                keep_net_admin: false,
            }),
            no_files: true,
            seccomp: true,
            ..Default::default()
        };
        assert!(verify(&request, &perm(true, true, 1000)).is_ok());
        assert!(verify(&request, &perm(false, true, 1000)).is_err());
        assert!(verify(&request, &perm(true, false, 1000)).is_err());
        assert!(verify(&request, &perm(true, true, 0)).is_err());

        let empty = ReductionRequest::default();
        assert!(verify(&empty, &perm(false, false, 0)).is_ok());
    }
}

// vim: ts=4 sw=4 expandtab
