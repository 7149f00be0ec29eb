// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{self as ah, Context as _};
use lockdown::{check_permissions, SeccompSandbox, SystemHost};
use std::net::{IpAddr, SocketAddr};
use tokio::net::UdpSocket;

/// Longest request datagram that is read. The content is ignored.
const MAX_REQUEST_LEN: usize = 64;

/// UDP status service.
///
/// Each datagram is answered with the current permissions report.
/// The socket is created before privileges are reduced,
/// serving requests needs no new file descriptors.
pub struct StatusServer {
    sock: UdpSocket,
    host: SystemHost,
    sandbox: SeccompSandbox,
}

impl StatusServer {
    pub async fn bind(addr: IpAddr, port: u16, sandbox: SeccompSandbox) -> ah::Result<Self> {
        let sock = UdpSocket::bind(SocketAddr::new(addr, port))
            .await
            .context("Bind UDP socket")?;
        Ok(Self {
            sock,
            host: SystemHost,
            sandbox,
        })
    }

    pub fn local_addr(&self) -> ah::Result<SocketAddr> {
        Ok(self.sock.local_addr()?)
    }

    /// Receive one request and answer it.
    ///
    /// Receive errors are fatal. A failed reply only affects that peer.
    pub async fn serve_one(&self) -> ah::Result<()> {
        let mut buf = [0_u8; MAX_REQUEST_LEN];
        let (_, peer) = self
            .sock
            .recv_from(&mut buf)
            .await
            .context("Receive status request")?;

        let report = format!("{}\n", check_permissions(&self.host, &self.sandbox));
        match self.sock.send_to(report.as_bytes(), peer).await {
            Ok(_) => log::debug!("{peer}: Sent status report"),
            Err(e) => log::warn!("{peer}: Failed to send status report: {e}"),
        }
        Ok(())
    }
}


// vim: ts=4 sw=4 expandtab
